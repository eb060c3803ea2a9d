//! # Client Errors
//!
//! Failures while building a client or talking to Xray. Unexpected HTTP
//! statuses on uploads are not errors: they come back as an
//! [`UploadResult`](xray_core::UploadResult) for the caller to interpret.

use thiserror::Error;
use xray_core::{ConfigurationError, CredentialKind, HostingType, UploadResult};

use crate::factory::Capability;

/// Errors raised by the Xray client
#[derive(Debug, Error)]
pub enum ClientError {
  /// The credential kind cannot be used with this hosting type
  #[error("Unable to create Xray {hosting} {capability} client! (Credential of type: {kind})")]
  UnsupportedCredentialType {
    hosting: HostingType,
    capability: Capability,
    kind: CredentialKind,
  },

  /// The instance configuration is not usable by a client
  #[error(transparent)]
  Configuration(#[from] ConfigurationError),

  /// Xray Cloud rejected the client id and secret
  #[error("Xray Cloud authentication failed: HTTP {status} - {body}")]
  Authentication { status: u16, body: String },

  /// Xray Cloud answered the token exchange with HTTP 429
  #[error("Xray Cloud authentication was rate limited: {}", .0.body)]
  RateLimited(UploadResult),

  /// A request that must succeed returned another status
  #[error("Unexpected error: HTTP {status} - {body}")]
  UnexpectedStatus { status: u16, body: String },

  /// Transport failure
  #[error("Request to Xray failed")]
  Http(#[from] reqwest::Error),
}
