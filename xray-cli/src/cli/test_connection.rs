//! # Test Connection Command
//!
//! Checks an instance and credential pair without importing anything.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use xray_core::output::{print_error, print_success};
use xray_tasks::test_connection;

use crate::host::{Host, HostArgs};

/// Arguments of the test-connection command
#[derive(Args, Debug, Clone)]
pub struct TestConnectionArgs {
  /// Id of the Jira/Xray instance
  #[arg(long, short = 'i', value_name = "ID", env = "XRAY_INSTANCE")]
  pub instance: String,

  /// Credential to use when the instance has none configured
  #[arg(long, short = 'c', value_name = "ID")]
  pub credential: Option<String>,
}

/// Handle the test-connection command
pub(super) fn handle_test_connection_command(host: &HostArgs, args: TestConnectionArgs) -> Result<ExitCode> {
  let host = Host::load(host)?;
  let credential = args.credential.as_deref();

  let connected = host.run(async |ctx| test_connection(ctx, &args.instance, credential).await)?;
  if connected {
    print_success("Connection: Success!");
    Ok(ExitCode::SUCCESS)
  } else {
    print_error("Could not establish connection");
    Ok(ExitCode::FAILURE)
  }
}
