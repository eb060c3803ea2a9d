//! # Cucumber Features Import
//!
//! Zips the `*.feature` files of a workspace folder and imports them into a
//! Jira project, creating or updating Tests and Preconditions.

use tracing::{info, instrument};
use xray_client::ClientFactory;
use xray_core::{ConfigurationError, OutputVariableSet, ResponseKind, check_path_traversal};

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::resolve::resolve_target;
use crate::retry::{RetryPolicy, TokioSleeper, retry_upload};

/// Inputs of a feature import
#[derive(Debug, Clone, Default)]
pub struct ImportFeaturesJob {
  pub instance_id: String,
  pub credential_id: Option<String>,
  pub project_key: String,
  /// Folder searched recursively for feature files
  pub folder_path: String,
  /// Workspace path of a JSON file with fields for created Tests
  pub test_info: Option<String>,
  /// Workspace path of a JSON file with fields for created Preconditions
  pub preconditions: Option<String>,
  /// Only import files modified within this many minutes
  pub last_modified: Option<u64>,
}

impl ImportFeaturesJob {
  pub fn new(instance_id: &str, project_key: &str, folder_path: &str) -> Self {
    Self {
      instance_id: instance_id.to_string(),
      project_key: project_key.to_string(),
      folder_path: folder_path.to_string(),
      ..Self::default()
    }
  }

  pub fn validate(&self) -> Result<(), ConfigurationError> {
    if self.instance_id.trim().is_empty() {
      return Err(ConfigurationError::MissingInstanceId);
    }
    if self.project_key.trim().is_empty() {
      return Err(ConfigurationError::MissingField("projectKey"));
    }
    if self.folder_path.trim().is_empty() {
      return Err(ConfigurationError::MissingField("folderPath"));
    }
    if self.last_modified == Some(0) {
      return Err(ConfigurationError::InvalidField {
        field: "lastModified",
        reason: "must be a positive number of minutes".to_string(),
      });
    }

    check_path_traversal(&self.folder_path)?;
    for path in [&self.test_info, &self.preconditions].into_iter().flatten() {
      check_path_traversal(path)?;
    }
    Ok(())
  }
}

/// Import the feature files of a folder
#[instrument(skip_all, fields(instance = %job.instance_id, project = %job.project_key))]
pub async fn import_features(ctx: &TaskContext<'_>, job: &ImportFeaturesJob) -> Result<OutputVariableSet, TaskError> {
  ctx.line("Starting XRAY: Cucumber Features Import Task...");
  ctx.line("##########################################################");
  ctx.line("####   Xray is importing the feature files  ####");
  ctx.line("##########################################################");

  match run(ctx, job).await {
    Ok(outputs) => ctx.complete(outputs),
    Err(e) => Err(ctx.abort(e, None)),
  }
}

async fn run(ctx: &TaskContext<'_>, job: &ImportFeaturesJob) -> Result<OutputVariableSet, TaskError> {
  job.validate()?;
  let target = resolve_target(ctx, &job.instance_id, job.credential_id.as_deref())?;
  let importer = ClientFactory::from_settings(ctx.settings).feature_importer(&target.instance, &target.auth.auth)?;

  let folder = ctx.expand(&job.folder_path);
  check_path_traversal(&folder)?;
  let files = ctx.workspace.feature_files(&folder, job.last_modified)?;
  for file in &files {
    ctx.line(format!("File found: {}", file.display()));
  }

  ctx.line("Creating zip to import feature files. This may take a while if you have a big number of files.");
  let archive = ctx.workspace.zip(&ctx.workspace.resolve(&folder), &files)?;
  info!("Packed {} feature files into {} bytes", files.len(), archive.len());

  let test_info = match ctx.expand_non_blank(job.test_info.as_deref()) {
    Some(path) => {
      ctx.line("Getting Test Info file...");
      Some(read_text(ctx, &path)?)
    }
    None => None,
  };
  let preconditions = match ctx.expand_non_blank(job.preconditions.as_deref()) {
    Some(path) => {
      ctx.line("Getting preconditions file...");
      Some(read_text(ctx, &path)?)
    }
    None => None,
  };

  let project_key = ctx.expand(&job.project_key);
  let policy = RetryPolicy::from_settings(ctx.settings);
  let (importer, archive, test_info, preconditions) = (&importer, &archive, &test_info, &preconditions);
  let project_key = project_key.as_str();

  let result = retry_upload(&policy, &TokioSleeper, &ctx.cancel, ctx.log, move || async move {
    let upload = importer.import(project_key, archive.clone(), test_info.clone(), preconditions.clone());
    let result = ctx.cancel.interruptible(upload).await??;
    Ok::<_, TaskError>(result)
  })
  .await?;

  ctx.line(format!("Response: ({}) {}", result.status_code, result.body));
  if result.is_successful() {
    ctx.line("Successfully imported Feature files");
  }

  Ok(OutputVariableSet::interpret(
    std::slice::from_ref(&result),
    importer.hosting(),
    ResponseKind::FeatureImport,
  ))
}

fn read_text(ctx: &TaskContext<'_>, path: &str) -> Result<String, TaskError> {
  check_path_traversal(path)?;
  let file = ctx.workspace.resolve_file(path)?;
  let content = ctx.workspace.read(&file)?;
  Ok(String::from_utf8_lossy(&content).into_owned())
}
