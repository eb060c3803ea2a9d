//! # Import Features Command
//!
//! Derive-based implementation of the Cucumber feature import build step.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use xray_tasks::{ImportFeaturesJob, import_features};

use crate::host::{Host, HostArgs};

/// Arguments of the import-features command
#[derive(Args, Debug, Clone)]
pub struct ImportFeaturesArgs {
  /// Id of the Jira/Xray instance
  #[arg(long, short = 'i', value_name = "ID", env = "XRAY_INSTANCE")]
  pub instance: String,

  /// Credential to use when the instance has none configured
  #[arg(long, short = 'c', value_name = "ID")]
  pub credential: Option<String>,

  /// Project the Tests and Preconditions are created in
  #[arg(long, short = 'p', value_name = "KEY")]
  pub project_key: String,

  /// Folder searched recursively for *.feature files
  #[arg(long, value_name = "DIR")]
  pub folder: String,

  /// JSON file with fields for created Tests
  #[arg(long, value_name = "FILE")]
  pub test_info: Option<String>,

  /// JSON file with fields for created Preconditions
  #[arg(long, value_name = "FILE")]
  pub preconditions: Option<String>,

  /// Only import files modified within this many minutes
  #[arg(long, value_name = "MINUTES", value_parser = clap::value_parser!(u64).range(1..))]
  pub last_modified: Option<u64>,
}

impl From<ImportFeaturesArgs> for ImportFeaturesJob {
  fn from(args: ImportFeaturesArgs) -> Self {
    Self {
      instance_id: args.instance,
      credential_id: args.credential,
      project_key: args.project_key,
      folder_path: args.folder,
      test_info: args.test_info,
      preconditions: args.preconditions,
      last_modified: args.last_modified,
    }
  }
}

/// Handle the import-features command
pub(super) fn handle_import_features_command(host: &HostArgs, args: ImportFeaturesArgs) -> Result<ExitCode> {
  let host = Host::load(host)?;
  let job = ImportFeaturesJob::from(args);

  let outputs = host.run(async |ctx| import_features(ctx, &job).await)?;
  Ok(host.report(&outputs, "Feature import finished"))
}
