//! # Task Errors
//!
//! Reasons a task aborts. The task has already written failed output
//! variables by the time one of these reaches the caller.

use std::io;

use thiserror::Error;
use xray_client::ClientError;
use xray_core::{ConfigurationError, WorkspaceError};

/// Errors that abort a task
#[derive(Debug, Error)]
pub enum TaskError {
  /// Inputs or configuration are unusable; no request was sent
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),

  /// The client could not be built or a request failed in transport
  #[error(transparent)]
  Client(#[from] ClientError),

  /// Workspace files could not be found, read or written
  #[error(transparent)]
  Workspace(#[from] WorkspaceError),

  /// Xray asked for a wait longer than the configured ceiling. Carries the
  /// rate-limited response body.
  #[error("{body}")]
  WaitExceedsCeiling { wait_secs: u64, ceiling_secs: u64, body: String },

  /// Still rate-limited after the last attempt. Carries the last response body.
  #[error("{body}")]
  RetriesExhausted { attempts: u32, body: String },

  /// Chaining was requested but the first response has no Test Execution
  #[error("No Test Execution Key returned")]
  MissingTestExecutionKey,

  /// The build was interrupted while waiting or uploading
  #[error("The task was interrupted")]
  Interrupted,

  /// The output variables could not be written
  #[error("Failed to write the build environment")]
  Output(#[source] io::Error),
}
