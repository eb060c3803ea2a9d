//! # Import Results Command
//!
//! Derive-based implementation of the results import build step.

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use xray_client::QueryParameter;
use xray_tasks::{ImportResultsJob, InfoSource, import_results};

use crate::host::{Host, HostArgs};

/// Arguments of the import-results command
#[derive(Args, Debug, Clone)]
pub struct ImportResultsArgs {
  /// Id of the Jira/Xray instance
  #[arg(long, short = 'i', value_name = "ID", env = "XRAY_INSTANCE")]
  pub instance: String,

  /// Credential to use when the instance has none configured
  #[arg(long, short = 'c', value_name = "ID")]
  pub credential: Option<String>,

  /// Import endpoint, by name ("JUnit XML") or URL suffix ("/junit")
  #[arg(long, short = 'f', value_name = "FORMAT")]
  pub format: String,

  /// Results file or glob expression, relative to the workspace
  #[arg(long, short = 'r', value_name = "PATH")]
  pub results: String,

  /// Test Execution fields for multipart endpoints (JSON)
  #[arg(long, value_name = "JSON")]
  pub info: Option<String>,

  /// Test fields for multipart endpoints (JSON)
  #[arg(long, value_name = "JSON")]
  pub test_info: Option<String>,

  /// Treat --info and --test-info as workspace file paths
  #[arg(long)]
  pub info_from_file: bool,

  #[arg(long, value_name = "KEY")]
  pub project_key: Option<String>,

  /// Import into this Test Execution
  #[arg(long, value_name = "KEY")]
  pub test_exec_key: Option<String>,

  #[arg(long, value_name = "KEY")]
  pub test_plan_key: Option<String>,

  /// Test environments separated by `;`
  #[arg(long, value_name = "ENVS")]
  pub test_environments: Option<String>,

  #[arg(long, value_name = "REVISION")]
  pub revision: Option<String>,

  #[arg(long, value_name = "VERSION")]
  pub fix_version: Option<String>,

  /// Import every file into the Test Execution created by the first upload
  #[arg(long)]
  pub same_execution: bool,

  /// Upload several files at once
  #[arg(long)]
  pub parallel: bool,
}

impl ImportResultsArgs {
  /// Build the task inputs from the arguments
  pub fn into_job(self) -> ImportResultsJob {
    let parameters: BTreeMap<_, _> = [
      (QueryParameter::ProjectKey, self.project_key),
      (QueryParameter::TestExecKey, self.test_exec_key),
      (QueryParameter::TestPlanKey, self.test_plan_key),
      (QueryParameter::TestEnvironments, self.test_environments),
      (QueryParameter::Revision, self.revision),
      (QueryParameter::FixVersion, self.fix_version),
    ]
    .into_iter()
    .filter_map(|(parameter, value)| value.map(|v| (parameter, v)))
    .collect();

    ImportResultsJob {
      instance_id: self.instance,
      credential_id: self.credential,
      format: self.format,
      import_file_path: self.results,
      import_info: self.info,
      test_import_info: self.test_info,
      info_source: if self.info_from_file { InfoSource::File } else { InfoSource::Inline },
      parameters,
      import_to_same_execution: self.same_execution,
      import_in_parallel: self.parallel,
    }
  }
}

/// Handle the import-results command
pub(super) fn handle_import_results_command(host: &HostArgs, args: ImportResultsArgs) -> Result<ExitCode> {
  let host = Host::load(host)?;
  let job = args.into_job();

  let outputs = host.run(async |ctx| import_results(ctx, &job).await)?;
  Ok(host.report(&outputs, "Results import finished"))
}
