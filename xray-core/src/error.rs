//! # Configuration Errors
//!
//! Failures detected before any network call is attempted. Every variant
//! carries a message that is safe to show to the person who configured the
//! task.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while validating a task or resolving its configuration
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
  /// The task does not name a Jira/Xray instance
  #[error("configuration id is blank")]
  MissingInstanceId,

  /// The task names an instance that is not configured
  #[error("The Jira server configuration of this task was not found: '{0}'")]
  UnknownInstance(String),

  /// The endpoint/format selection does not match any known format
  #[error("passed endpoint is null or could not be found: '{0}'")]
  UnknownFormat(String),

  /// A field the chosen format requires was left blank
  #[error("You must configure the field {0}")]
  MissingField(&'static str),

  /// A path tries to reach outside the workspace
  #[error("You cannot provide file paths for upper directories: '{0}'")]
  PathTraversal(String),

  /// Neither the instance nor the task supplies a credential id
  #[error("This XrayInstance requires a user-scoped credential.")]
  MissingCredential,

  /// A credential id was supplied but nothing visible matched it
  #[error("Credential '{0}' could not be found for this build")]
  CredentialNotFound(String),

  /// A field was present but its value is not acceptable
  #[error("Invalid value for {field}: {reason}")]
  InvalidField { field: &'static str, reason: String },

  /// A SERVER instance without an address
  #[error("Instance '{0}' is hosted on a server but has no server address")]
  MissingServerAddress(String),
}

/// Errors raised while loading `xray.toml`
#[derive(Debug, Error)]
pub enum ConfigFileError {
  #[error("Failed to determine project directories")]
  NoProjectDirs,

  #[error("Failed to read configuration from {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse configuration from {}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error(transparent)]
  Invalid(#[from] ConfigurationError),
}
