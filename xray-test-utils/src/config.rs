//! Settings and credential files for testing
//!
//! Writes `xray.toml` and `credentials.toml` into a temporary directory so
//! tests can load them exactly like the CLI does.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// RAII guard for a temporary configuration directory
pub struct ConfigFilesGuard {
  temp_dir: TempDir,
}

impl ConfigFilesGuard {
  /// Create a configuration directory with the given file contents
  pub fn new(settings: &str, credentials: &str) -> Result<Self> {
    let temp_dir = TempDir::new().context("Failed to create temp config directory")?;
    fs::write(temp_dir.path().join("xray.toml"), settings).context("Failed to write xray.toml")?;
    fs::write(temp_dir.path().join("credentials.toml"), credentials).context("Failed to write credentials.toml")?;
    Ok(Self { temp_dir })
  }

  /// A SERVER instance at `server_address` with a system credential
  /// `server-creds`, and a CLOUD instance pointing at the same address
  pub fn with_mock_server(server_address: &str) -> Result<Self> {
    let settings = format!(
      r#"cloud_url = "{server_address}"
max_retry_wait_secs = 5
max_parallel_uploads = 4

[[instances]]
id = "server-1"
alias = "Server"
hosting = "SERVER"
server_address = "{server_address}"
credential_id = "server-creds"

[[instances]]
id = "cloud-1"
alias = "Cloud"
hosting = "CLOUD"
"#
    );

    let credentials = r#"[[system]]
id = "server-creds"
kind = "username_password"
username = "test_user"
secret = "test_token"

[[system]]
id = "cloud-creds"
kind = "username_password"
username = "client-id"
secret = "client-secret"

[[user]]
owner = "alice"
id = "alice-pat"
kind = "bearer_token"
secret = "alice-token"
"#;

    Self::new(&settings, credentials)
  }

  /// Path to `xray.toml`
  pub fn settings_path(&self) -> PathBuf {
    self.temp_dir.path().join("xray.toml")
  }

  /// Path to `credentials.toml`
  pub fn credentials_path(&self) -> PathBuf {
    self.temp_dir.path().join("credentials.toml")
  }

  /// The configuration directory
  pub fn path(&self) -> &Path {
    self.temp_dir.path()
  }
}
