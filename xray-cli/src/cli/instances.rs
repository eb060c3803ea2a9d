//! # Instances Command
//!
//! Lists the Jira/Xray instances of the settings file.

use std::process::ExitCode;

use anyhow::Result;
use owo_colors::OwoColorize;
use xray_core::output::{format_hosting, print_header, print_warning};

use crate::host::{Host, HostArgs};

/// Handle the instances command
pub(super) fn handle_instances_command(host: &HostArgs) -> Result<ExitCode> {
  let host = Host::load(host)?;
  let instances = host.settings.instances.list();

  if instances.is_empty() {
    print_warning("No Jira/Xray instances are configured");
    return Ok(ExitCode::SUCCESS);
  }

  print_header("Configured instances");
  for instance in instances {
    let address = match &instance.server_address {
      Some(address) => address.as_str(),
      None => host.settings.cloud_url.as_str(),
    };
    let credential = instance.default_credential_id().unwrap_or("-");
    let selector = format!("{}-{}", instance.hosting, instance.id);
    println!(
      "{}  {}  {}  {}  (credential: {})",
      format_hosting(instance.hosting),
      selector.bold(),
      instance.alias,
      address.dimmed(),
      credential
    );
  }
  Ok(ExitCode::SUCCESS)
}
