//! # Credential Management
//!
//! Credential material for Jira/Xray instances and the two-tier store it is
//! looked up in. System credentials are visible to every task; user
//! credentials are only visible under the identity of the person who
//! triggered the build.

pub mod file;
pub mod resolver;

use std::collections::HashMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

pub use self::file::{CredentialFileError, FileCredentialStore};
pub use self::resolver::CredentialResolver;

/// A secret value that is redacted in debug output
#[derive(Clone)]
pub struct Secret(SecretString);

impl Secret {
  /// Borrow the plain-text value
  pub fn expose(&self) -> &str {
    self.0.expose_secret()
  }
}

impl From<String> for Secret {
  fn from(value: String) -> Self {
    Self(SecretString::from(value))
  }
}

impl From<&str> for Secret {
  fn from(value: &str) -> Self {
    Self::from(value.to_string())
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret([REDACTED])")
  }
}

/// The kind of a stored credential
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CredentialKind {
  UsernamePassword,
  BearerToken,
  /// Any kind this tool cannot authenticate with, e.g. SSH keys
  Other(String),
}

impl CredentialKind {
  /// Parse the `kind` field of a credentials file entry
  pub fn parse(kind: &str) -> Self {
    match kind.trim() {
      "username_password" => CredentialKind::UsernamePassword,
      "bearer_token" => CredentialKind::BearerToken,
      other => CredentialKind::Other(other.to_string()),
    }
  }

  /// Name used in logs and error messages
  pub fn name(&self) -> &str {
    match self {
      CredentialKind::UsernamePassword => "username_password",
      CredentialKind::BearerToken => "bearer_token",
      CredentialKind::Other(name) => name,
    }
  }

  /// Check if the resolver can hand out credentials of this kind
  pub const fn is_supported(&self) -> bool {
    matches!(self, CredentialKind::UsernamePassword | CredentialKind::BearerToken)
  }
}

impl fmt::Display for CredentialKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// One entry of a credential store
#[derive(Debug, Clone)]
pub struct StoredCredential {
  pub id: String,
  pub kind: CredentialKind,
  pub username: Option<String>,
  pub secret: Secret,
}

impl StoredCredential {
  /// A username/password credential
  pub fn username_password(id: &str, username: &str, password: &str) -> Self {
    Self {
      id: id.to_string(),
      kind: CredentialKind::UsernamePassword,
      username: Some(username.to_string()),
      secret: Secret::from(password),
    }
  }

  /// A bearer token credential
  pub fn bearer_token(id: &str, token: &str) -> Self {
    Self {
      id: id.to_string(),
      kind: CredentialKind::BearerToken,
      username: None,
      secret: Secret::from(token),
    }
  }

  /// Convert into authentication material, if the kind is supported
  pub fn to_auth(&self) -> Option<Auth> {
    match self.kind {
      CredentialKind::UsernamePassword => Some(Auth::UsernamePassword {
        username: self.username.clone().unwrap_or_default(),
        password: self.secret.clone(),
      }),
      CredentialKind::BearerToken => Some(Auth::BearerToken {
        token: self.secret.clone(),
      }),
      CredentialKind::Other(_) => None,
    }
  }
}

/// The identity credentials are looked up under
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
  /// The build was not triggered by a person
  #[default]
  Anonymous,
  /// The user id of the person who triggered the build
  User(String),
}

impl Identity {
  /// Identity for an optional triggering user id; blank ids are anonymous
  pub fn triggered_by(user_id: Option<&str>) -> Self {
    match user_id.map(str::trim) {
      Some(id) if !id.is_empty() => Identity::User(id.to_string()),
      _ => Identity::Anonymous,
    }
  }
}

/// Visibility tier a credential was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialScope {
  System,
  User,
}

/// Authentication material handed to the client factory
#[derive(Debug, Clone)]
pub enum Auth {
  UsernamePassword { username: String, password: Secret },
  BearerToken { token: Secret },
}

impl Auth {
  /// The credential kind this material came from
  pub fn kind(&self) -> CredentialKind {
    match self {
      Auth::UsernamePassword { .. } => CredentialKind::UsernamePassword,
      Auth::BearerToken { .. } => CredentialKind::BearerToken,
    }
  }
}

/// A credential resolved for one task run
#[derive(Debug, Clone)]
pub struct ResolvedAuth {
  pub credential_id: String,
  pub scope: CredentialScope,
  pub auth: Auth,
}

/// Source of credentials at both visibility tiers
pub trait CredentialStore: Send + Sync {
  /// Credentials visible to every task
  fn system_credentials(&self) -> Vec<StoredCredential>;

  /// Credentials visible under the given identity
  fn user_credentials(&self, identity: &Identity) -> Vec<StoredCredential>;
}

/// A credential store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
  system: Vec<StoredCredential>,
  user: HashMap<String, Vec<StoredCredential>>,
}

impl InMemoryCredentialStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add a system-scoped credential
  pub fn with_system(mut self, credential: StoredCredential) -> Self {
    self.system.push(credential);
    self
  }

  /// Add a credential owned by the given user
  pub fn with_user(mut self, owner: &str, credential: StoredCredential) -> Self {
    self.user.entry(owner.to_string()).or_default().push(credential);
    self
  }
}

impl CredentialStore for InMemoryCredentialStore {
  fn system_credentials(&self) -> Vec<StoredCredential> {
    self.system.clone()
  }

  fn user_credentials(&self, identity: &Identity) -> Vec<StoredCredential> {
    match identity {
      Identity::Anonymous => Vec::new(),
      Identity::User(owner) => self.user.get(owner).cloned().unwrap_or_default(),
    }
  }
}
