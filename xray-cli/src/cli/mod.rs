//! # Command Line Interface
//!
//! Defines the CLI structure and command handlers for the xray tool. Each
//! task subcommand maps to one build step of the Xray integration.

mod export_features;
mod import_features;
mod import_results;
mod instances;
mod test_connection;

use std::process::ExitCode;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{ArgAction, Parser, Subcommand};
use xray_core::ColorMode;

use crate::host::HostArgs;

/// Top-level CLI command for the xray tool
#[derive(Parser)]
#[command(name = "xray")]
#[command(author = env!("CARGO_PKG_AUTHORS"))]
#[command(about = "Exchange test results and Cucumber features with Jira/Xray")]
#[command(
  long_about = "Xray imports test execution results and Cucumber features into Jira/Xray\n\
        (Cloud or Server/Data Center) and exports features back into a build workspace.\n\n\
        Each command runs as one step of a CI build: paths are relative to the workspace,\n\
        inputs may reference build variables, and the outcome is reported through\n\
        XRAY_* output variables."
)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(propagate_version = true)]
#[command(subcommand_required(true))]
#[command(disable_help_subcommand = true)]
#[command(max_term_width = 120)]
#[command(styles = Styles::styled()
    .header(AnsiColor::BrightGreen.on_default().bold().underline())
    .usage(AnsiColor::Green.on_default().bold())
    .literal(AnsiColor::BrightGreen.on_default().bold())
    .placeholder(AnsiColor::BrightWhite.on_default().italic())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::BrightRed.on_default().bold())
)]
pub struct Cli {
  /// Sets the level of verbosity (can be used multiple times)
  #[arg(
    short = 'v',
    long = "verbose",
    action = ArgAction::Count,
    global = true,
    long_help = "Sets the level of verbosity for tracing and logging output.\n\n\
             -v: Show info level messages\n\
             -vv: Show debug level messages\n\
             -vvv: Show trace level messages"
  )]
  pub verbose: u8,

  /// Controls when colored output is used
  #[arg(
    long,
    value_enum,
    ignore_case = true,
    global = true,
    default_value_t = ColorMode::Auto,
  )]
  pub colors: ColorMode,

  #[command(flatten)]
  pub host: HostArgs,

  /// Subcommands
  #[command(subcommand)]
  pub command: Commands,
}

/// Subcommands for the xray tool
#[derive(Subcommand)]
pub enum Commands {
  /// Export Cucumber features into the workspace
  #[command(long_about = "Downloads the Cucumber features of a set of issues or a saved filter\n\
            and extracts them into a workspace folder (features/ by default).")]
  #[command(alias = "export")]
  ExportFeatures(export_features::ExportFeaturesArgs),

  /// Import Cucumber feature files into a project
  #[command(long_about = "Zips every *.feature file below a workspace folder and imports them\n\
            into a Jira project, creating or updating Tests and Preconditions.")]
  ImportFeatures(import_features::ImportFeaturesArgs),

  /// Import test execution results
  #[command(
    long_about = "Uploads one results file, or every file matched by a glob expression,\n\
            to an Xray import endpoint.\n\n\
            Use --same-execution to import every file into the Test Execution created by\n\
            the first upload, and --parallel to upload several files at once. Rate-limited\n\
            uploads are retried with the wait Xray asks for."
  )]
  #[command(alias = "import")]
  ImportResults(import_results::ImportResultsArgs),

  /// List the configured Jira/Xray instances
  #[command(alias = "ls")]
  Instances,

  /// Check that an instance accepts a credential
  #[command(long_about = "Resolves the credential of an instance and checks that the instance\n\
            accepts it. Writes no output variables.")]
  TestConnection(test_connection::TestConnectionArgs),
}

pub fn handle_cli(cli: Cli) -> Result<ExitCode> {
  cli.colors.apply();

  match cli.command {
    Commands::ExportFeatures(args) => export_features::handle_export_features_command(&cli.host, args),
    Commands::ImportFeatures(args) => import_features::handle_import_features_command(&cli.host, args),
    Commands::ImportResults(args) => import_results::handle_import_results_command(&cli.host, args),
    Commands::Instances => instances::handle_instances_command(&cli.host),
    Commands::TestConnection(args) => test_connection::handle_test_connection_command(&cli.host, args),
  }
}
