//! # Export Features Command
//!
//! Derive-based implementation of the Cucumber feature export build step.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use xray_tasks::{DEFAULT_EXPORT_FOLDER, ExportFeaturesJob, export_features};

use crate::host::{Host, HostArgs};

/// Arguments of the export-features command
#[derive(Args, Debug, Clone)]
pub struct ExportFeaturesArgs {
  /// Id of the Jira/Xray instance
  #[arg(long, short = 'i', value_name = "ID", env = "XRAY_INSTANCE")]
  pub instance: String,

  /// Credential to use when the instance has none configured
  #[arg(long, short = 'c', value_name = "ID")]
  pub credential: Option<String>,

  /// Issue keys separated by `;`
  #[arg(long, value_name = "KEYS", required_unless_present = "filter")]
  pub issues: Option<String>,

  /// Id of a saved filter
  #[arg(long, value_name = "ID")]
  pub filter: Option<String>,

  /// Workspace folder the features are extracted into
  #[arg(long, short = 'o', value_name = "DIR", default_value = DEFAULT_EXPORT_FOLDER)]
  pub output: String,
}

/// Handle the export-features command
pub(super) fn handle_export_features_command(host: &HostArgs, args: ExportFeaturesArgs) -> Result<ExitCode> {
  let host = Host::load(host)?;
  let job = ExportFeaturesJob {
    instance_id: args.instance,
    credential_id: args.credential,
    issue_keys: args.issues,
    filter_id: args.filter,
    output_folder: Some(args.output),
  };

  let outputs = host.run(async |ctx| export_features(ctx, &job).await)?;
  Ok(host.report(&outputs, "Feature export finished"))
}
