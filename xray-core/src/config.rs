//! # Configuration Management
//!
//! Locates the configuration directory and loads `xray.toml` into a
//! read-only [`Settings`] snapshot. The snapshot is built once before a task
//! starts; nothing here writes configuration back to disk.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigFileError;
use crate::instance::{InstanceRegistry, RawInstance};
use crate::proxy::{ProxyConfig, ProxySettings};

/// Base URL of Xray Cloud
pub const DEFAULT_CLOUD_URL: &str = "https://xray.cloud.getxray.app";

/// Longest server-advised wait honoured before giving up on a rate-limited upload
pub const DEFAULT_MAX_RETRY_WAIT_SECS: u64 = 60;

/// Represents the configuration directories for the xray tool
#[derive(Debug, Clone)]
pub struct ConfigDirs {
  pub config_dir: PathBuf,
}

impl ConfigDirs {
  /// Create a new ConfigDirs instance
  pub fn new() -> Result<Self, ConfigFileError> {
    let proj_dirs = ProjectDirs::from("", "", "xray").ok_or(ConfigFileError::NoProjectDirs)?;

    Ok(Self {
      config_dir: proj_dirs.config_dir().to_path_buf(),
    })
  }

  /// Get the config directory
  pub fn config_dir(&self) -> &PathBuf {
    &self.config_dir
  }

  /// Get the path to the settings file
  pub fn settings_path(&self) -> PathBuf {
    self.config_dir.join("xray.toml")
  }

  /// Get the path to the credentials file
  pub fn credentials_path(&self) -> PathBuf {
    self.config_dir.join("credentials.toml")
  }
}

/// Get the configuration directories
pub fn get_config_dirs() -> Result<ConfigDirs, ConfigFileError> {
  ConfigDirs::new()
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
  #[serde(default)]
  cloud_url: Option<String>,
  #[serde(default)]
  max_retry_wait_secs: Option<u64>,
  #[serde(default)]
  max_parallel_uploads: Option<usize>,
  #[serde(default)]
  proxy: Option<ProxyConfig>,
  #[serde(default)]
  instances: Vec<RawInstance>,
}

/// Read-only settings snapshot handed to every task
#[derive(Debug, Clone)]
pub struct Settings {
  pub cloud_url: String,
  pub max_retry_wait: Duration,
  pub max_parallel_uploads: usize,
  pub proxy: Option<ProxySettings>,
  pub instances: InstanceRegistry,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      cloud_url: DEFAULT_CLOUD_URL.to_string(),
      max_retry_wait: Duration::from_secs(DEFAULT_MAX_RETRY_WAIT_SECS),
      max_parallel_uploads: default_parallelism(),
      proxy: None,
      instances: InstanceRegistry::default(),
    }
  }
}

impl Settings {
  /// Load settings from a file. A missing file yields the defaults with no
  /// instances configured.
  pub fn load(path: &Path) -> Result<Self, ConfigFileError> {
    if !path.exists() {
      debug!("No settings file at {}, using defaults", path.display());
      return Ok(Self::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigFileError::Read {
      path: path.to_path_buf(),
      source,
    })?;

    Self::from_toml(&content, path)
  }

  /// Parse settings from TOML text
  pub fn parse(content: &str) -> Result<Self, ConfigFileError> {
    Self::from_toml(content, Path::new("<inline>"))
  }

  fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigFileError> {
    let file: SettingsFile = toml::from_str(content).map_err(|source| ConfigFileError::Parse {
      path: path.to_path_buf(),
      source,
    })?;

    let defaults = Self::default();
    let instances = InstanceRegistry::migrate(file.instances)?;
    let proxy = file.proxy.map(ProxySettings::from_config).transpose()?;

    let cloud_url = file
      .cloud_url
      .map(|url| url.trim().trim_end_matches('/').to_string())
      .filter(|url| !url.is_empty())
      .unwrap_or(defaults.cloud_url);

    let settings = Self {
      cloud_url,
      max_retry_wait: file
        .max_retry_wait_secs
        .map(Duration::from_secs)
        .unwrap_or(defaults.max_retry_wait),
      max_parallel_uploads: file
        .max_parallel_uploads
        .filter(|n| *n > 0)
        .unwrap_or(defaults.max_parallel_uploads),
      proxy,
      instances,
    };

    debug!(
      instances = settings.instances.list().len(),
      proxy = settings.proxy.is_some(),
      "Loaded settings from {}",
      path.display()
    );

    Ok(settings)
  }
}

fn default_parallelism() -> usize {
  thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1)
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;
  use xray_test_utils::EnvTestGuard;

  use super::*;
  use crate::error::ConfigurationError;
  use crate::instance::HostingType;

  #[test]
  fn test_config_paths() {
    let guard = EnvTestGuard::new();
    let config_dirs = ConfigDirs::new().unwrap();

    assert!(config_dirs.settings_path().ends_with("xray.toml"));
    assert!(config_dirs.credentials_path().starts_with(config_dirs.config_dir()));
    #[cfg(target_os = "linux")]
    assert!(config_dirs.config_dir().starts_with(guard.config_dir()));
  }

  #[test]
  fn test_full_settings() {
    let settings = Settings::parse(
      r#"
cloud_url = "https://eu.xray.cloud.getxray.app/"
max_retry_wait_secs = 30
max_parallel_uploads = 4

[proxy]
host = "proxy.corp"
port = 3128
no_proxy = "*.corp.example|localhost"

[[instances]]
id = "prod"
alias = "Prod Jira"
server_address = "https://jira.example.com"
credential_id = "jira-svc"

[[instances]]
alias = "Cloud"
hosting = "CLOUD"
"#,
    )
    .unwrap();

    assert_eq!(settings.cloud_url, "https://eu.xray.cloud.getxray.app");
    assert_eq!(settings.max_retry_wait, Duration::from_secs(30));
    assert_eq!(settings.max_parallel_uploads, 4);
    assert!(settings.proxy.unwrap().bypasses("https://jira.corp.example"));

    let instances = settings.instances.list();
    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].hosting, HostingType::Server);
    assert_eq!(instances[0].default_credential_id(), Some("jira-svc"));
    assert_eq!(instances[1].hosting, HostingType::Cloud);
    assert!(!instances[1].id.is_empty());
  }

  #[test]
  fn test_defaults_when_missing() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load(&dir.path().join("xray.toml")).unwrap();

    assert_eq!(settings.cloud_url, DEFAULT_CLOUD_URL);
    assert_eq!(settings.max_retry_wait, Duration::from_secs(DEFAULT_MAX_RETRY_WAIT_SECS));
    assert!(settings.max_parallel_uploads >= 1);
    assert!(settings.instances.is_empty());
  }

  #[test]
  fn test_zero_parallelism_falls_back_to_default() {
    let settings = Settings::parse("max_parallel_uploads = 0").unwrap();
    assert!(settings.max_parallel_uploads >= 1);
  }

  #[test]
  fn test_server_instance_needs_address() {
    let err = Settings::parse(
      r#"
[[instances]]
id = "broken"
alias = "Broken"
"#,
    )
    .unwrap_err();

    assert!(matches!(
      err,
      ConfigFileError::Invalid(ConfigurationError::MissingServerAddress(alias)) if alias == "Broken"
    ));
  }

  #[test]
  fn test_parse_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("xray.toml");
    fs::write(&path, "max_retry_wait_secs = \"soon\"").unwrap();

    let err = Settings::load(&path).unwrap_err();
    assert!(err.to_string().contains("xray.toml"));
  }
}
