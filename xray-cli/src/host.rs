//! # Build Host
//!
//! Stands in for the CI runtime around a task: it supplies the workspace,
//! the build environment, the triggering user, a transcript and the sink
//! the output variables are written to.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use tokio::runtime::Runtime;
use tracing::{debug, warn};
use xray_core::output::{format_issue_key, format_variable, print_error, print_header, print_info, print_success};
use xray_core::{
  BuildEnvironment, DotenvFile, EnvironmentSink, FileCredentialStore, Identity, OutputVariable, OutputVariableSet,
  Settings, TaskLog, Workspace, get_config_dirs,
};
use xray_tasks::{TaskContext, TaskError};

/// Options describing the build a task runs in
#[derive(Args, Debug, Clone)]
pub struct HostArgs {
  /// Build workspace that task paths are relative to
  #[arg(long, global = true, value_name = "DIR", default_value = ".")]
  pub workspace: PathBuf,

  /// Settings file (defaults to xray.toml in the config directory)
  #[arg(long, global = true, value_name = "FILE", env = "XRAY_CONFIG")]
  pub config: Option<PathBuf>,

  /// Credentials file (defaults to credentials.toml in the config directory)
  #[arg(long, global = true, value_name = "FILE", env = "XRAY_CREDENTIALS")]
  pub credentials: Option<PathBuf>,

  /// User who triggered the build; unlocks that user's credentials
  #[arg(long, global = true, value_name = "USER", env = "BUILD_USER_ID")]
  pub triggered_by: Option<String>,

  /// Dotenv file receiving the output variables instead of stdout
  #[arg(long, global = true, value_name = "FILE", env = "XRAY_ENV_FILE")]
  pub env_file: Option<PathBuf>,
}

/// Writes the task transcript to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleLog;

impl TaskLog for ConsoleLog {
  fn line(&self, message: &str) {
    eprintln!("{message}");
  }
}

/// Everything a task needs from the build
pub struct Host {
  pub settings: Settings,
  pub credentials: FileCredentialStore,
  pub workspace: Workspace,
  pub identity: Identity,
  environment: BuildEnvironment,
  env_file: Option<DotenvFile>,
  log: ConsoleLog,
}

impl Host {
  /// Load the configuration and snapshot the process environment
  pub fn load(args: &HostArgs) -> Result<Self> {
    let settings_path = match &args.config {
      Some(path) => path.clone(),
      None => get_config_dirs()?.settings_path(),
    };
    let credentials_path = match &args.credentials {
      Some(path) => path.clone(),
      None => get_config_dirs()?.credentials_path(),
    };
    debug!(
      "Using settings {} and credentials {}",
      settings_path.display(),
      credentials_path.display()
    );

    let settings = Settings::load(&settings_path).context("Failed to load settings")?;
    let credentials = FileCredentialStore::load(&credentials_path).context("Failed to load credentials")?;

    let root = args
      .workspace
      .canonicalize()
      .with_context(|| format!("Workspace {} is not accessible", args.workspace.display()))?;

    Ok(Self {
      settings,
      credentials,
      workspace: Workspace::new(root),
      identity: Identity::triggered_by(args.triggered_by.as_deref()),
      environment: BuildEnvironment::from_process(),
      env_file: args.env_file.as_ref().map(DotenvFile::new),
      log: ConsoleLog,
    })
  }

  fn sink(&self) -> &dyn EnvironmentSink {
    match &self.env_file {
      Some(file) => file,
      None => &self.environment,
    }
  }

  /// A task context for this build
  pub fn context(&self) -> TaskContext<'_> {
    TaskContext::new(
      &self.settings,
      &self.credentials,
      self.workspace.clone(),
      self.sink(),
      &self.log,
    )
    .with_identity(self.identity.clone())
    .with_variables(self.environment.snapshot())
  }

  /// Run a task to completion. Ctrl-C interrupts it.
  pub fn run<T, F>(&self, task: F) -> Result<T>
  where
    F: AsyncFnOnce(&TaskContext<'_>) -> Result<T, TaskError>,
  {
    let runtime = Runtime::new().context("Failed to create async runtime")?;
    let ctx = self.context();
    let cancel = ctx.cancel.clone();

    let outcome = runtime.block_on(async {
      let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          warn!("Interrupt received, stopping the task");
          cancel.cancel();
        }
      });
      let outcome = task(&ctx).await;
      watcher.abort();
      outcome
    });

    Ok(outcome?)
  }

  /// Show the outputs of a finished task and map its outcome to an exit code
  pub fn report(&self, outputs: &OutputVariableSet, summary: &str) -> ExitCode {
    if self.env_file.is_none() {
      print_header("Output variables");
      for (name, value) in outputs.to_env() {
        println!("{}", format_variable(&name, &value));
      }
    }

    let modified = outputs.get(OutputVariable::IssuesModified);
    if !modified.is_empty() {
      let keys: Vec<_> = modified.split(';').map(format_issue_key).collect();
      print_info(&format!("Issues modified: {}", keys.join(", ")));
    }

    if outputs.is_successful() {
      print_success(summary);
      ExitCode::SUCCESS
    } else {
      print_error(&format!("{summary}: Xray rejected the request"));
      ExitCode::FAILURE
    }
  }
}
