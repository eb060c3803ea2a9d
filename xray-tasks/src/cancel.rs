//! Cooperative cancellation of a running task.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::TaskError;

/// Shared flag raised when the build is aborted. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelSignal {
  sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelSignal {
  fn default() -> Self {
    Self::new()
  }
}

impl CancelSignal {
  pub fn new() -> Self {
    let (sender, _) = watch::channel(false);
    Self {
      sender: Arc::new(sender),
    }
  }

  /// Raise the flag
  pub fn cancel(&self) {
    debug!("Cancellation requested");
    self.sender.send_replace(true);
  }

  pub fn is_cancelled(&self) -> bool {
    *self.sender.borrow()
  }

  /// Resolves once the flag is raised
  pub async fn cancelled(&self) {
    let mut receiver = self.sender.subscribe();
    // The sender lives as long as `self`, so the channel cannot close here
    let _ = receiver.wait_for(|cancelled| *cancelled).await;
  }

  /// Run a future unless the flag is raised first
  pub async fn interruptible<F: Future>(&self, future: F) -> Result<F::Output, TaskError> {
    if self.is_cancelled() {
      return Err(TaskError::Interrupted);
    }

    tokio::select! {
      biased;
      _ = self.cancelled() => Err(TaskError::Interrupted),
      output = future => Ok(output),
    }
  }
}
