//! Credential store backed by a `credentials.toml` file.
//!
//! ```toml
//! [[system]]
//! id = "xray-cloud"
//! kind = "username_password"
//! username = "client-id"
//! secret = "client-secret"
//!
//! [[user]]
//! owner = "alice"
//! id = "alice-token"
//! kind = "bearer_token"
//! secret = "pat"
//! ```
//!
//! Entries of any other kind are kept but can never be resolved.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::{CredentialKind, CredentialStore, Identity, Secret, StoredCredential};

/// Errors raised while loading a credentials file
#[derive(Debug, Error)]
pub enum CredentialFileError {
  #[error("Failed to read credentials file {}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("Failed to parse credentials file {}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("Credential '{id}' of kind username_password has no username")]
  MissingUsername { id: String },
}

#[derive(Debug, Default, Deserialize)]
struct CredentialsFile {
  #[serde(default)]
  system: Vec<FileEntry>,
  #[serde(default)]
  user: Vec<UserFileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
  id: String,
  kind: String,
  #[serde(default)]
  username: Option<String>,
  #[serde(default)]
  secret: String,
}

#[derive(Debug, Deserialize)]
struct UserFileEntry {
  owner: String,
  #[serde(flatten)]
  entry: FileEntry,
}

impl FileEntry {
  fn into_stored(self) -> Result<StoredCredential, CredentialFileError> {
    let kind = CredentialKind::parse(&self.kind);
    if kind == CredentialKind::UsernamePassword && self.username.is_none() {
      return Err(CredentialFileError::MissingUsername { id: self.id });
    }

    Ok(StoredCredential {
      id: self.id,
      kind,
      username: self.username,
      secret: Secret::from(self.secret),
    })
  }
}

/// Credentials loaded from a TOML file
#[derive(Debug, Clone, Default)]
pub struct FileCredentialStore {
  system: Vec<StoredCredential>,
  user: Vec<(String, StoredCredential)>,
}

impl FileCredentialStore {
  /// Load a credentials file. A missing file yields an empty store.
  pub fn load(path: &Path) -> Result<Self, CredentialFileError> {
    if !path.exists() {
      debug!("No credentials file at {}", path.display());
      return Ok(Self::default());
    }

    let content = fs::read_to_string(path).map_err(|source| CredentialFileError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::from_toml(&content, path)
  }

  /// Parse credentials from TOML text
  pub fn parse(content: &str) -> Result<Self, CredentialFileError> {
    Self::from_toml(content, Path::new("<inline>"))
  }

  fn from_toml(content: &str, path: &Path) -> Result<Self, CredentialFileError> {
    let file: CredentialsFile = toml::from_str(content).map_err(|source| CredentialFileError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let system = file
      .system
      .into_iter()
      .map(FileEntry::into_stored)
      .collect::<Result<Vec<_>, _>>()?;

    let user = file
      .user
      .into_iter()
      .map(|e| Ok((e.owner, e.entry.into_stored()?)))
      .collect::<Result<Vec<_>, CredentialFileError>>()?;

    debug!(system = system.len(), user = user.len(), "Loaded credential store");

    Ok(Self { system, user })
  }
}

impl CredentialStore for FileCredentialStore {
  fn system_credentials(&self) -> Vec<StoredCredential> {
    self.system.clone()
  }

  fn user_credentials(&self, identity: &Identity) -> Vec<StoredCredential> {
    let Identity::User(user_id) = identity else {
      return Vec::new();
    };

    self
      .user
      .iter()
      .filter(|(owner, _)| owner == user_id)
      .map(|(_, credential)| credential.clone())
      .collect()
  }
}
