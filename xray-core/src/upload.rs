//! The outcome of a single upload to Xray.

/// Status and raw body returned by one upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
  pub status_code: u16,
  pub body: String,
  /// Server-advised wait in seconds, read from `Retry-After`
  pub retry_after: Option<u64>,
}

impl UploadResult {
  /// Create a result without a retry hint
  pub fn new(status_code: u16, body: impl Into<String>) -> Self {
    Self {
      status_code,
      body: body.into(),
      retry_after: None,
    }
  }

  /// Attach a server-advised wait
  pub const fn with_retry_after(mut self, seconds: u64) -> Self {
    self.retry_after = Some(seconds);
    self
  }

  /// True for any 2xx status
  pub const fn is_successful(&self) -> bool {
    self.status_code >= 200 && self.status_code <= 299
  }

  /// True for HTTP 429
  pub const fn is_too_many_requests(&self) -> bool {
    self.status_code == 429
  }
}
