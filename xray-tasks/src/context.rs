//! # Task Context
//!
//! Everything the host hands to a task run: the settings snapshot, the
//! credential store, who triggered the build, the workspace, the build
//! environment and where outputs and transcript lines go.

use std::collections::HashMap;

use tracing::{error, warn};
use xray_core::{
  CredentialStore, EnvironmentSink, Identity, OutputVariableSet, Settings, TaskLog, Workspace, expand_variables,
};

use crate::cancel::CancelSignal;
use crate::error::TaskError;

/// The host environment of one task run
pub struct TaskContext<'a> {
  pub settings: &'a Settings,
  pub credentials: &'a dyn CredentialStore,
  pub identity: Identity,
  pub workspace: Workspace,
  pub variables: HashMap<String, String>,
  pub sink: &'a dyn EnvironmentSink,
  pub log: &'a dyn TaskLog,
  pub cancel: CancelSignal,
}

impl<'a> TaskContext<'a> {
  /// A context for an anonymous build with no environment variables
  pub fn new(
    settings: &'a Settings,
    credentials: &'a dyn CredentialStore,
    workspace: Workspace,
    sink: &'a dyn EnvironmentSink,
    log: &'a dyn TaskLog,
  ) -> Self {
    Self {
      settings,
      credentials,
      identity: Identity::Anonymous,
      workspace,
      variables: HashMap::new(),
      sink,
      log,
      cancel: CancelSignal::new(),
    }
  }

  pub fn with_identity(mut self, identity: Identity) -> Self {
    self.identity = identity;
    self
  }

  pub fn with_variables(mut self, variables: HashMap<String, String>) -> Self {
    self.variables = variables;
    self
  }

  pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
    self.cancel = cancel;
    self
  }

  /// Expand build variable references in an input value
  pub fn expand(&self, value: &str) -> String {
    expand_variables(value, &self.variables)
  }

  /// Expand an optional input, treating blank values as absent
  pub fn expand_non_blank(&self, value: Option<&str>) -> Option<String> {
    value
      .filter(|v| !v.trim().is_empty())
      .map(|v| self.expand(v))
      .filter(|v| !v.trim().is_empty())
  }

  /// Write a line to the task transcript
  pub fn line(&self, message: impl AsRef<str>) {
    self.log.line(message.as_ref());
  }

  /// Write the outputs of a finished task
  pub(crate) fn complete(&self, outputs: OutputVariableSet) -> Result<OutputVariableSet, TaskError> {
    outputs.clone().write(self.sink, self.log).map_err(TaskError::Output)?;
    Ok(outputs)
  }

  /// Write failed outputs for an aborted task and hand the error back.
  ///
  /// Partial outputs keep whatever the finished uploads reported; without
  /// them the error message becomes the raw response.
  pub(crate) fn abort(&self, error: TaskError, partial: Option<OutputVariableSet>) -> TaskError {
    error!("{}", error);
    self.line(error.to_string());

    let message = error.to_string();
    let outputs = match partial {
      Some(outputs) => outputs.into_failed(),
      None => OutputVariableSet::failed(Some(&message)),
    };

    if let Err(e) = outputs.write(self.sink, self.log) {
      warn!("Failed to write failed outputs: {}", e);
    }
    error
  }
}
