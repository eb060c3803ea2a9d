//! # Rate Limiting
//!
//! Xray answers HTTP 429 when a client sends too many requests, optionally
//! advising a wait in `Retry-After`. Each upload is attempted at most
//! [`RetryPolicy::max_attempts`] times, and a wait longer than the ceiling
//! aborts instead of sleeping.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};
use xray_core::{Settings, TaskLog, UploadResult};

use crate::cancel::CancelSignal;
use crate::error::TaskError;

/// Attempts per upload, the original request included
pub const MAX_ATTEMPTS: u32 = 3;

/// What to do after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
  /// Not rate-limited; keep the result
  Done,
  /// Sleep for the duration, then try again
  Retry(Duration),
  /// The advised wait exceeds the ceiling
  WaitTooLong(Duration),
  /// Rate-limited on the last allowed attempt
  Exhausted,
}

/// Retry settings for rate-limited uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  /// Longest acceptable wait, also used when Xray advises none
  pub ceiling: Duration,
}

impl RetryPolicy {
  pub const fn new(ceiling: Duration) -> Self {
    Self {
      max_attempts: MAX_ATTEMPTS,
      ceiling,
    }
  }

  /// A policy with the ceiling of the settings
  pub fn from_settings(settings: &Settings) -> Self {
    Self::new(settings.max_retry_wait)
  }

  /// The wait Xray advised, or the ceiling when it advised none
  pub fn advised_wait(&self, result: &UploadResult) -> Duration {
    result.retry_after.map(Duration::from_secs).unwrap_or(self.ceiling)
  }

  /// Decide what follows attempt number `attempt` (starting at 1)
  pub fn decide(&self, result: &UploadResult, attempt: u32) -> RetryDecision {
    if !result.is_too_many_requests() {
      return RetryDecision::Done;
    }
    if attempt >= self.max_attempts {
      return RetryDecision::Exhausted;
    }

    let wait = self.advised_wait(result);
    if wait > self.ceiling {
      RetryDecision::WaitTooLong(wait)
    } else {
      RetryDecision::Retry(wait)
    }
  }
}

/// Waits between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
  async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
  async fn sleep(&self, duration: Duration) {
    tokio::time::sleep(duration).await;
  }
}

/// Run an upload under the retry policy.
///
/// Sleeps are interruptible; an interruption abandons the remaining
/// attempts.
pub async fn retry_upload<F, Fut>(
  policy: &RetryPolicy,
  sleeper: &dyn Sleeper,
  cancel: &CancelSignal,
  log: &dyn TaskLog,
  mut attempt: F,
) -> Result<UploadResult, TaskError>
where
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<UploadResult, TaskError>>,
{
  let mut tries = 1;

  loop {
    let result = attempt().await?;

    match policy.decide(&result, tries) {
      RetryDecision::Done => return Ok(result),
      RetryDecision::Exhausted => {
        warn!("Still rate-limited after {} attempts", tries);
        return Err(TaskError::RetriesExhausted {
          attempts: tries,
          body: result.body,
        });
      }
      RetryDecision::WaitTooLong(wait) => {
        log.line(&format!("Too Many Requests: Waiting {} seconds - try #{}", wait.as_secs(), tries));
        log.line(&format!(
          "Too Many Requests: Wait time ({} seconds) exceeds the maximum allowed ({} seconds)",
          wait.as_secs(),
          policy.ceiling.as_secs()
        ));
        return Err(TaskError::WaitExceedsCeiling {
          wait_secs: wait.as_secs(),
          ceiling_secs: policy.ceiling.as_secs(),
          body: result.body,
        });
      }
      RetryDecision::Retry(wait) => {
        log.line(&format!("Too Many Requests: Waiting {} seconds - try #{}", wait.as_secs(), tries));
        if !wait.is_zero() {
          cancel.interruptible(sleeper.sleep(wait)).await?;
        }
        debug!("Retrying after rate limit, attempt {}", tries + 1);
        tries += 1;
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Mutex;

  use xray_core::MemoryLog;

  use super::*;
  use crate::testing::RecordingSleeper;

  fn policy() -> RetryPolicy {
    RetryPolicy::new(Duration::from_secs(60))
  }

  fn scripted(responses: Vec<UploadResult>) -> Mutex<std::vec::IntoIter<UploadResult>> {
    Mutex::new(responses.into_iter())
  }

  #[test]
  fn test_decisions() {
    let policy = policy();
    let ok = UploadResult::new(200, "{}");
    let limited = UploadResult::new(429, "slow").with_retry_after(5);
    let limited_long = UploadResult::new(429, "slow").with_retry_after(61);
    let limited_silent = UploadResult::new(429, "slow");

    assert_eq!(policy.decide(&ok, 1), RetryDecision::Done);
    assert_eq!(policy.decide(&limited, 1), RetryDecision::Retry(Duration::from_secs(5)));
    assert_eq!(policy.decide(&limited, 3), RetryDecision::Exhausted);
    assert_eq!(policy.decide(&limited_long, 1), RetryDecision::WaitTooLong(Duration::from_secs(61)));
    assert_eq!(policy.decide(&limited_silent, 2), RetryDecision::Retry(Duration::from_secs(60)));
  }

  #[tokio::test]
  async fn test_succeeds_on_third_attempt() {
    let responses = scripted(vec![
      UploadResult::new(429, "slow").with_retry_after(5),
      UploadResult::new(429, "slow").with_retry_after(5),
      UploadResult::new(200, "{}"),
    ]);
    let sleeper = RecordingSleeper::default();
    let log = MemoryLog::new();
    let mut attempts = 0;

    let result = retry_upload(&policy(), &sleeper, &CancelSignal::new(), &log, || {
      attempts += 1;
      let next = responses.lock().unwrap().next().unwrap();
      async move { Ok(next) }
    })
    .await
    .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(attempts, 3);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5), Duration::from_secs(5)]);
    assert!(log.contains("Too Many Requests: Waiting 5 seconds - try #1"));
    assert!(log.contains("Too Many Requests: Waiting 5 seconds - try #2"));
  }

  #[tokio::test]
  async fn test_exhausted_after_three_attempts() {
    let responses = scripted(vec![
      UploadResult::new(429, "first"),
      UploadResult::new(429, "second"),
      UploadResult::new(429, "last"),
      UploadResult::new(200, "never"),
    ]);
    let sleeper = RecordingSleeper::default();
    let mut attempts = 0;

    let err = retry_upload(&policy(), &sleeper, &CancelSignal::new(), &MemoryLog::new(), || {
      attempts += 1;
      let next = responses.lock().unwrap().next().unwrap();
      async move { Ok(next) }
    })
    .await
    .unwrap_err();

    assert_eq!(attempts, 3);
    assert_eq!(sleeper.sleeps().len(), 2);
    assert!(matches!(err, TaskError::RetriesExhausted { attempts: 3, ref body } if body == "last"));
  }

  #[tokio::test]
  async fn test_wait_above_ceiling_aborts_without_sleeping() {
    let sleeper = RecordingSleeper::default();
    let log = MemoryLog::new();
    let mut attempts = 0;

    let err = retry_upload(&policy(), &sleeper, &CancelSignal::new(), &log, || {
      attempts += 1;
      async { Ok(UploadResult::new(429, "too long").with_retry_after(120)) }
    })
    .await
    .unwrap_err();

    assert_eq!(attempts, 1);
    assert!(sleeper.sleeps().is_empty());
    assert_eq!(err.to_string(), "too long");
    assert!(log.contains("Wait time (120 seconds) exceeds the maximum allowed (60 seconds)"));
  }

  #[tokio::test]
  async fn test_interrupted_sleep_abandons_retries() {
    let cancel = CancelSignal::new();
    cancel.cancel();
    let mut attempts = 0;

    let err = retry_upload(&policy(), &RecordingSleeper::default(), &cancel, &MemoryLog::new(), || {
      attempts += 1;
      async { Ok(UploadResult::new(429, "slow").with_retry_after(1)) }
    })
    .await
    .unwrap_err();

    assert_eq!(attempts, 1);
    assert!(matches!(err, TaskError::Interrupted));
  }
}
