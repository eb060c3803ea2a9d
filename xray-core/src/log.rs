//! Per-task log sinks.
//!
//! A task writes its human-readable transcript through [`TaskLog`]. Writing
//! is best-effort and never fails the task.

use std::sync::{Mutex, PoisonError};

use tracing::info;

/// Append-only line writer for a task's transcript
pub trait TaskLog: Send + Sync {
  fn line(&self, message: &str);
}

/// Forwards every line to `tracing` under the `xray::task` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl TaskLog for TracingLog {
  fn line(&self, message: &str) {
    info!(target: "xray::task", "{message}");
  }
}

/// Collects lines in memory
#[derive(Debug, Default)]
pub struct MemoryLog {
  lines: Mutex<Vec<String>>,
}

impl MemoryLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// All lines written so far
  pub fn lines(&self) -> Vec<String> {
    self.lines.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Check if any line contains the given text
  pub fn contains(&self, needle: &str) -> bool {
    self.lines().iter().any(|line| line.contains(needle))
  }
}

impl TaskLog for MemoryLog {
  fn line(&self, message: &str) {
    self.lines.lock().unwrap_or_else(PoisonError::into_inner).push(message.to_string());
  }
}
