//! # Client Factory
//!
//! Builds a client for one capability from an instance and a resolved
//! credential. Xray Cloud only accepts a client id and secret (a
//! username/password credential); Server accepts username/password and
//! bearer tokens. Building a client never touches the network.

use std::fmt;

use tracing::{debug, error};
use xray_core::{Auth, ConfigurationError, HostingType, ProxySettings, Settings, UploadResult, XrayInstance};

use crate::client::{ApiFamily, XrayClient};
use crate::error::ClientError;
use crate::format::{QueryParameter, ResultFormat, ResultsPayload};

/// What a client is built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  ConnectionTest,
  ResultImport,
  FeatureImport,
  FeatureExport,
}

impl Capability {
  pub const fn name(self) -> &'static str {
    match self {
      Capability::ConnectionTest => "connection test",
      Capability::ResultImport => "result import",
      Capability::FeatureImport => "feature import",
      Capability::FeatureExport => "feature export",
    }
  }
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Creates capability-typed Xray clients
#[derive(Debug, Clone)]
pub struct ClientFactory {
  cloud_url: String,
  proxy: Option<ProxySettings>,
}

impl ClientFactory {
  pub fn new(cloud_url: impl Into<String>, proxy: Option<ProxySettings>) -> Self {
    Self {
      cloud_url: cloud_url.into(),
      proxy,
    }
  }

  /// A factory using the Cloud URL and proxy of the settings
  pub fn from_settings(settings: &Settings) -> Self {
    Self::new(settings.cloud_url.clone(), settings.proxy.clone())
  }

  /// Build an untyped client for a capability
  pub fn make_client(&self, capability: Capability, instance: &XrayInstance, auth: &Auth) -> Result<XrayClient, ClientError> {
    let api = match (instance.hosting, auth) {
      (HostingType::Cloud, Auth::UsernamePassword { .. }) => ApiFamily::Cloud {
        base_url: self.cloud_url.clone(),
      },
      (HostingType::Cloud, other) => {
        error!(
          "Unable to create Xray Cloud {} client! (Credential of type: {})",
          capability,
          other.kind()
        );
        return Err(ClientError::UnsupportedCredentialType {
          hosting: HostingType::Cloud,
          capability,
          kind: other.kind(),
        });
      }
      (HostingType::Server, _) => {
        let server_address = instance
          .server_address
          .clone()
          .ok_or_else(|| ConfigurationError::MissingServerAddress(instance.alias.clone()))?;
        ApiFamily::Server { server_address }
      }
    };

    debug!(
      "Creating Xray {} {} client for '{}' ({} credential)",
      instance.hosting,
      capability,
      instance.alias,
      auth.kind()
    );
    XrayClient::new(api, auth.clone(), self.proxy.as_ref())
  }

  pub fn result_importer(&self, instance: &XrayInstance, auth: &Auth) -> Result<ResultImporter, ClientError> {
    self
      .make_client(Capability::ResultImport, instance, auth)
      .map(|client| ResultImporter { client })
  }

  pub fn feature_importer(&self, instance: &XrayInstance, auth: &Auth) -> Result<FeatureImporter, ClientError> {
    self
      .make_client(Capability::FeatureImport, instance, auth)
      .map(|client| FeatureImporter { client })
  }

  pub fn feature_exporter(&self, instance: &XrayInstance, auth: &Auth) -> Result<FeatureExporter, ClientError> {
    self
      .make_client(Capability::FeatureExport, instance, auth)
      .map(|client| FeatureExporter { client })
  }

  pub fn connection_tester(&self, instance: &XrayInstance, auth: &Auth) -> Result<ConnectionTester, ClientError> {
    self
      .make_client(Capability::ConnectionTest, instance, auth)
      .map(|client| ConnectionTester { client })
  }
}

/// Uploads test execution results
pub struct ResultImporter {
  client: XrayClient,
}

impl ResultImporter {
  pub const fn hosting(&self) -> HostingType {
    self.client.hosting()
  }

  /// Upload one results file
  pub async fn upload(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError> {
    self.client.import_results(format, payload, query).await
  }
}

/// Uploads Cucumber feature files
pub struct FeatureImporter {
  client: XrayClient,
}

impl FeatureImporter {
  pub const fn hosting(&self) -> HostingType {
    self.client.hosting()
  }

  /// Upload a zip of feature files into a project
  pub async fn import(
    &self,
    project_key: &str,
    archive: Vec<u8>,
    test_info: Option<String>,
    precondition_info: Option<String>,
  ) -> Result<UploadResult, ClientError> {
    self
      .client
      .import_features(project_key, archive, test_info, precondition_info)
      .await
  }
}

/// Downloads Cucumber feature files
pub struct FeatureExporter {
  client: XrayClient,
}

impl FeatureExporter {
  pub const fn hosting(&self) -> HostingType {
    self.client.hosting()
  }

  /// Download a zip of the features for the given issues and/or filter
  pub async fn export(&self, issue_keys: Option<&str>, filter_id: Option<&str>) -> Result<Vec<u8>, ClientError> {
    self.client.export_features(issue_keys, filter_id).await
  }
}

/// Checks that an instance accepts a credential
pub struct ConnectionTester {
  client: XrayClient,
}

impl ConnectionTester {
  pub const fn hosting(&self) -> HostingType {
    self.client.hosting()
  }

  pub async fn test_connection(&self) -> Result<bool, ClientError> {
    self.client.test_connection().await
  }
}

#[cfg(test)]
mod tests {
  use xray_core::{CredentialKind, Secret};

  use super::*;

  fn factory() -> ClientFactory {
    ClientFactory::new("https://xray.cloud.getxray.app", None)
  }

  fn user_pass() -> Auth {
    Auth::UsernamePassword {
      username: "id".to_string(),
      password: Secret::from("secret"),
    }
  }

  fn bearer() -> Auth {
    Auth::BearerToken {
      token: Secret::from("pat"),
    }
  }

  fn cloud() -> XrayInstance {
    XrayInstance::new("c1", "Cloud", HostingType::Cloud, None, None)
  }

  fn server() -> XrayInstance {
    XrayInstance::new("s1", "Server", HostingType::Server, Some("https://jira.example.com"), None)
  }

  #[test]
  fn test_cloud_accepts_username_password() {
    let importer = factory().result_importer(&cloud(), &user_pass()).unwrap();
    assert_eq!(importer.hosting(), HostingType::Cloud);
  }

  #[test]
  fn test_cloud_rejects_bearer_token() {
    for capability in [
      Capability::ConnectionTest,
      Capability::ResultImport,
      Capability::FeatureImport,
      Capability::FeatureExport,
    ] {
      let err = factory().make_client(capability, &cloud(), &bearer()).err().unwrap();
      match err {
        ClientError::UnsupportedCredentialType {
          hosting,
          capability: failed,
          kind,
        } => {
          assert_eq!(hosting, HostingType::Cloud);
          assert_eq!(failed, capability);
          assert_eq!(kind, CredentialKind::BearerToken);
        }
        other => panic!("unexpected error: {other}"),
      }
    }
  }

  #[test]
  fn test_server_accepts_both_kinds() {
    assert!(factory().feature_importer(&server(), &user_pass()).is_ok());
    assert!(factory().feature_exporter(&server(), &bearer()).is_ok());
    assert_eq!(
      factory().connection_tester(&server(), &bearer()).unwrap().hosting(),
      HostingType::Server
    );
  }

  #[test]
  fn test_server_without_address() {
    let instance = XrayInstance::new("s2", "No address", HostingType::Server, None, None);

    let err = factory().result_importer(&instance, &user_pass()).err().unwrap();
    assert!(matches!(
      err,
      ClientError::Configuration(ConfigurationError::MissingServerAddress(_))
    ));
  }

  #[test]
  fn test_unsupported_credential_message() {
    let err = factory().make_client(Capability::ResultImport, &cloud(), &bearer()).err().unwrap();
    assert_eq!(
      err.to_string(),
      "Unable to create Xray CLOUD result import client! (Credential of type: bearer_token)"
    );
  }
}
