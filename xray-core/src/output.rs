//! # Output Formatting
//!
//! Formatted terminal output with colors and emojis for hosts that report
//! task outcomes to a person.

use owo_colors::{OwoColorize, Stream};
use {clap, emojis};

use crate::env::shell_quote;
use crate::instance::HostingType;

/// Enum representing different color modes for output
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
  /// Enable colored output
  Yes,
  /// Enable colored output (alias for Yes)
  Always,
  /// Automatically detect if colors should be used based on terminal
  /// capabilities
  Auto,
  /// Disable colored output
  No,
  /// Disable colored output (alias for No)
  Never,
}

impl ColorMode {
  /// Apply the mode to all colored output of this process
  pub fn apply(self) {
    match self {
      ColorMode::Always | ColorMode::Yes => owo_colors::set_override(true),
      ColorMode::Never | ColorMode::No => owo_colors::set_override(false),
      ColorMode::Auto => {}
    }
  }
}

/// Helper function to safely get an emoji or fallback to a default character
pub fn get_emoji_or_default(name: &str, default: &str) -> String {
  match emojis::get_by_shortcode(name) {
    Some(emoji) => emoji.to_string(),
    None => default.to_string(),
  }
}

/// Print a success message
pub fn print_success(message: &str) {
  let check = get_emoji_or_default("check_mark", "✓");
  println!("{} {}", check.green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
  let cross = get_emoji_or_default("cross_mark", "✗");
  eprintln!("{} {}", cross.red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
  let warning = get_emoji_or_default("warning", "⚠");
  println!("{} {}", warning.yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
  let info = get_emoji_or_default("information", "ℹ");
  println!("{} {}", info.blue().bold(), message);
}

/// Print a section header
pub fn print_header(header: &str) {
  println!("\n{}", header.blue().bold());
}

/// Format a Jira issue key
pub fn format_issue_key(key: &str) -> String {
  key.bright_cyan().bold().to_string()
}

/// Format an output variable assignment as `NAME='value'`. The name is only
/// colored when stdout is a terminal.
pub fn format_variable(name: &str, value: &str) -> String {
  format!(
    "{}={}",
    name.if_supports_color(Stream::Stdout, |n| n.purple()),
    shell_quote(value)
  )
}

/// Format a hosting type label
pub fn format_hosting(hosting: HostingType) -> String {
  match hosting {
    HostingType::Cloud => hosting.name().bright_blue().to_string(),
    HostingType::Server => hosting.name().bright_green().to_string(),
  }
}
