//! # Instance Registry
//!
//! The set of configured Jira/Xray instances. The registry is loaded once,
//! migrated, and then handed to tasks as a read-only snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ConfigurationError;

/// Where the Jira/Xray deployment is hosted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HostingType {
  /// Self-hosted Server or Data Center
  #[default]
  #[serde(alias = "server")]
  Server,
  /// Vendor-hosted Xray Cloud
  #[serde(alias = "cloud")]
  Cloud,
}

impl HostingType {
  /// The upper-case name used in configuration and select-box ids
  pub const fn name(self) -> &'static str {
    match self {
      HostingType::Server => "SERVER",
      HostingType::Cloud => "CLOUD",
    }
  }
}

impl fmt::Display for HostingType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// A configured Jira/Xray instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XrayInstance {
  pub id: String,
  pub alias: String,
  pub hosting: HostingType,
  pub server_address: Option<String>,
  pub credential_id: Option<String>,
}

impl XrayInstance {
  /// Create an instance, generating an id when the given one is blank
  pub fn new(id: &str, alias: &str, hosting: HostingType, server_address: Option<&str>, credential_id: Option<&str>) -> Self {
    let id = if id.trim().is_empty() {
      Uuid::new_v4().to_string()
    } else {
      id.to_string()
    };

    Self {
      id,
      alias: alias.to_string(),
      hosting,
      server_address: non_blank(server_address),
      credential_id: non_blank(credential_id),
    }
  }

  /// The instance's default credential id, if one is configured
  pub fn default_credential_id(&self) -> Option<&str> {
    self.credential_id.as_deref()
  }
}

/// An instance as it appears in a persisted configuration file. Older files
/// do not carry a hosting type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawInstance {
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub alias: Option<String>,
  #[serde(default)]
  pub hosting: Option<HostingType>,
  #[serde(default)]
  pub server_address: Option<String>,
  #[serde(default)]
  pub credential_id: Option<String>,
}

/// Read-only snapshot of the configured instances
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
  instances: Vec<XrayInstance>,
}

impl InstanceRegistry {
  /// Build a registry from already-migrated instances
  pub const fn new(instances: Vec<XrayInstance>) -> Self {
    Self { instances }
  }

  /// Migrate persisted instances into a registry.
  ///
  /// Instances without a hosting type become SERVER instances and blank ids
  /// are replaced with fresh UUIDs. A SERVER instance must carry an address.
  pub fn migrate(raw: Vec<RawInstance>) -> Result<Self, ConfigurationError> {
    let mut instances = Vec::with_capacity(raw.len());

    for entry in raw {
      let hosting = match entry.hosting {
        Some(hosting) => hosting,
        None => {
          debug!(alias = ?entry.alias, "Instance has no hosting type, defaulting to SERVER");
          HostingType::default()
        }
      };

      let instance = XrayInstance::new(
        entry.id.as_deref().unwrap_or_default(),
        entry.alias.as_deref().unwrap_or_default(),
        hosting,
        entry.server_address.as_deref(),
        entry.credential_id.as_deref(),
      );

      if instance.hosting == HostingType::Server && instance.server_address.is_none() {
        return Err(ConfigurationError::MissingServerAddress(instance.alias));
      }

      instances.push(instance);
    }

    Ok(Self { instances })
  }

  /// Look up an instance by id. Ids prefixed with `CLOUD-` or `SERVER-`
  /// are accepted as well.
  pub fn get(&self, id: &str) -> Option<&XrayInstance> {
    if id.trim().is_empty() {
      return None;
    }

    let id = strip_hosting_prefix(id);
    let found = self.instances.iter().find(|instance| instance.id == id);
    if found.is_none() {
      warn!("No XrayInstance could be found with configuration id '{id}'");
    }
    found
  }

  /// Look up an instance by id, falling back to the first configured one
  pub fn get_or_first(&self, id: &str) -> Option<&XrayInstance> {
    self.get(id).or_else(|| self.instances.first())
  }

  /// All configured instances
  pub fn list(&self) -> &[XrayInstance] {
    &self.instances
  }

  /// Check if no instance is configured
  pub fn is_empty(&self) -> bool {
    self.instances.is_empty()
  }
}

fn strip_hosting_prefix(id: &str) -> &str {
  for hosting in [HostingType::Cloud, HostingType::Server] {
    if let Some(rest) = id.strip_prefix(hosting.name()).and_then(|rest| rest.strip_prefix('-')) {
      return rest;
    }
  }
  id
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
