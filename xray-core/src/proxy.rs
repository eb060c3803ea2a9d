//! # Proxy Rules
//!
//! Outbound proxy settings and the no-proxy rules that decide which request
//! URLs go around the proxy.
//!
//! No-proxy entries come in two shapes. Entries containing `://` are URL
//! patterns where `*` matches anything. All other entries are domain
//! patterns: `*.corp.com` becomes `https?://[^/:]*\.corp\.com(:[0-9]+)?(/.*)?`.

use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::creds::Secret;
use crate::error::ConfigurationError;

/// Proxy section of `xray.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
  pub host: String,
  pub port: u16,
  #[serde(default)]
  pub username: Option<String>,
  #[serde(default)]
  pub password: Option<String>,
  #[serde(default)]
  pub no_proxy: Option<String>,
}

/// A configured outbound proxy
#[derive(Debug, Clone)]
pub struct ProxySettings {
  pub host: String,
  pub port: u16,
  pub username: Option<String>,
  pub password: Option<Secret>,
  no_proxy: Vec<Regex>,
}

impl ProxySettings {
  /// Create proxy settings without authentication or exclusions
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self {
      host: host.into(),
      port,
      username: None,
      password: None,
      no_proxy: Vec::new(),
    }
  }

  /// Authenticate against the proxy with basic credentials
  pub fn with_credentials(mut self, username: impl Into<String>, password: Secret) -> Self {
    self.username = Some(username.into());
    self.password = Some(password);
    self
  }

  /// Add no-proxy entries separated by whitespace, `,` or `|`
  pub fn with_no_proxy(mut self, entries: &str) -> Result<Self, ConfigurationError> {
    self.no_proxy.extend(compile_no_proxy(entries)?);
    Ok(self)
  }

  /// Build settings from the `[proxy]` section of the configuration
  pub fn from_config(config: ProxyConfig) -> Result<Self, ConfigurationError> {
    if config.host.trim().is_empty() {
      return Err(ConfigurationError::InvalidField {
        field: "proxy.host",
        reason: "host is blank".to_string(),
      });
    }

    let mut settings = Self::new(config.host.trim(), config.port);

    let username = config.username.filter(|u| !u.trim().is_empty());
    if let Some(username) = username {
      settings = settings.with_credentials(username, Secret::from(config.password.unwrap_or_default()));
    }

    match config.no_proxy {
      Some(entries) => settings.with_no_proxy(&entries),
      None => Ok(settings),
    }
  }

  /// The proxy URL handed to the HTTP client
  pub fn url(&self) -> String {
    format!("http://{}:{}", self.host, self.port)
  }

  /// Check whether a request URL should skip the proxy
  pub fn bypasses(&self, url: &str) -> bool {
    let bypass = self.no_proxy.iter().any(|pattern| pattern.is_match(url));
    if bypass {
      debug!("Bypassing proxy for {url}");
    }
    bypass
  }
}

/// Compile no-proxy entries into anchored URL patterns
pub fn compile_no_proxy(entries: &str) -> Result<Vec<Regex>, ConfigurationError> {
  entries
    .split([' ', '\t', '\n', '\r', ',', '|'])
    .filter(|entry| !entry.is_empty())
    .map(|entry| {
      let pattern = url_pattern(entry);
      Regex::new(&format!("^(?:{pattern})$")).map_err(|e| ConfigurationError::InvalidField {
        field: "proxy.no_proxy",
        reason: format!("'{entry}': {e}"),
      })
    })
    .collect()
}

fn url_pattern(entry: &str) -> String {
  let escaped = entry.replace('.', "\\.");
  if entry.contains("://") {
    escaped.replace('*', ".*")
  } else {
    format!("https?://{}(:[0-9]+)?(/.*)?", escaped.replace('*', "[^/:]*"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn proxy(no_proxy: &str) -> ProxySettings {
    ProxySettings::new("whatever", 8080).with_no_proxy(no_proxy).unwrap()
  }

  #[test]
  fn test_domain_entry_matches_any_port_and_path() {
    let settings = proxy("localhost");

    assert!(settings.bypasses("http://localhost:8084"));
    assert!(settings.bypasses("https://localhost/rest/api/2/myself"));
    assert!(!settings.bypasses("http://localhost.evil.com"));
    assert!(!settings.bypasses("ftp://localhost"));
  }

  #[test]
  fn test_wildcard_domain_does_not_cross_host_boundaries() {
    let settings = proxy("*.corp.com");

    assert!(settings.bypasses("https://jira.corp.com/rest"));
    assert!(settings.bypasses("http://a.corp.com:8080"));
    assert!(!settings.bypasses("https://corp.com.attacker.net/x.corp.com"));
  }

  #[test]
  fn test_multiple_separators() {
    let settings = proxy("host1 \nhost2,host3|localhost");

    assert!(settings.bypasses("http://host2"));
    assert!(settings.bypasses("http://localhost:8084"));
    assert!(!settings.bypasses("http://host4"));
  }

  #[test]
  fn test_url_entry_is_matched_literally() {
    let settings = proxy("http://localhost:8085");

    assert!(settings.bypasses("http://localhost:8085"));
    assert!(!settings.bypasses("http://localhost:8084"));
  }

  #[test]
  fn test_url_entry_with_wildcard() {
    let settings = proxy("https://*.example.org/*");

    assert!(settings.bypasses("https://xray.example.org/api/v2"));
    assert!(!settings.bypasses("http://xray.example.org/api/v2"));
  }

  #[test]
  fn test_blank_entries_are_ignored() {
    assert!(compile_no_proxy("").unwrap().is_empty());
    assert!(compile_no_proxy(" ,|\n").unwrap().is_empty());
  }

  #[test]
  fn test_from_config() {
    let settings = ProxySettings::from_config(ProxyConfig {
      host: "proxy.corp".to_string(),
      port: 3128,
      username: Some("svc".to_string()),
      password: Some("secret".to_string()),
      no_proxy: Some("localhost".to_string()),
    })
    .unwrap();

    assert_eq!(settings.url(), "http://proxy.corp:3128");
    assert_eq!(settings.username.as_deref(), Some("svc"));
    assert_eq!(settings.password.as_ref().map(Secret::expose), Some("secret"));
    assert!(settings.bypasses("http://localhost"));
  }

  #[test]
  fn test_from_config_rejects_blank_host() {
    let err = ProxySettings::from_config(ProxyConfig::default()).unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidField { field: "proxy.host", .. }));
  }
}
