//! # Cucumber Features Export
//!
//! Downloads the features of a set of issues or a saved filter and extracts
//! them into a workspace folder.

use tracing::instrument;
use xray_client::ClientFactory;
use xray_core::{ConfigurationError, OutputVariableSet, check_path_traversal};

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::resolve::resolve_target;

/// Folder the features land in when the job names none
pub const DEFAULT_EXPORT_FOLDER: &str = "features/";

/// Inputs of a feature export
#[derive(Debug, Clone, Default)]
pub struct ExportFeaturesJob {
  pub instance_id: String,
  pub credential_id: Option<String>,
  /// Issue keys separated by `;`
  pub issue_keys: Option<String>,
  /// Id of a saved filter
  pub filter_id: Option<String>,
  pub output_folder: Option<String>,
}

impl ExportFeaturesJob {
  pub fn new(instance_id: &str) -> Self {
    Self {
      instance_id: instance_id.to_string(),
      ..Self::default()
    }
  }
}

/// Export features into the workspace
#[instrument(skip_all, fields(instance = %job.instance_id))]
pub async fn export_features(ctx: &TaskContext<'_>, job: &ExportFeaturesJob) -> Result<OutputVariableSet, TaskError> {
  ctx.line("Starting XRAY: Cucumber Features Export Task...");
  ctx.line("##########################################################");
  ctx.line("####   Xray is exporting the feature files  ####");
  ctx.line("##########################################################");

  match run(ctx, job).await {
    Ok(()) => ctx.complete(OutputVariableSet::success(None)),
    Err(e) => Err(ctx.abort(e, None)),
  }
}

async fn run(ctx: &TaskContext<'_>, job: &ExportFeaturesJob) -> Result<(), TaskError> {
  if job.instance_id.trim().is_empty() {
    return Err(ConfigurationError::MissingInstanceId.into());
  }
  let target = resolve_target(ctx, &job.instance_id, job.credential_id.as_deref())?;
  let exporter = ClientFactory::from_settings(ctx.settings).feature_exporter(&target.instance, &target.auth.auth)?;

  let issue_keys = ctx.expand_non_blank(job.issue_keys.as_deref());
  let filter_id = ctx.expand_non_blank(job.filter_id.as_deref());
  let folder = ctx
    .expand_non_blank(job.output_folder.as_deref())
    .unwrap_or_else(|| DEFAULT_EXPORT_FOLDER.to_string());
  check_path_traversal(&folder)?;

  if let Some(keys) = &issue_keys {
    ctx.line(format!("Issues: {keys}"));
  }
  if let Some(filter) = &filter_id {
    ctx.line(format!("Filter: {filter}"));
  }
  ctx.line(format!("Will save the feature files in: {folder}"));

  let download = exporter.export(issue_keys.as_deref(), filter_id.as_deref());
  let archive = ctx.cancel.interruptible(download).await??;

  let written = ctx.workspace.unzip(&archive, &folder)?;
  for file in &written {
    ctx.line(format!("Extracted: {}", file.display()));
  }
  ctx.line("Successfully exported the Cucumber features");
  Ok(())
}
