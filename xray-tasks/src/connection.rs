//! Connection check for a configured instance.

use tracing::{info, warn};
use xray_client::ClientFactory;

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::resolve::resolve_target;

/// Check that an instance accepts its credential.
///
/// Writes no output variables; the answer is the return value.
pub async fn test_connection(
  ctx: &TaskContext<'_>,
  instance_id: &str,
  credential_id: Option<&str>,
) -> Result<bool, TaskError> {
  let target = resolve_target(ctx, instance_id, credential_id)?;
  let tester = ClientFactory::from_settings(ctx.settings).connection_tester(&target.instance, &target.auth.auth)?;

  let connected = ctx.cancel.interruptible(tester.test_connection()).await??;
  if connected {
    info!("Connection to '{}' succeeded", target.instance.alias);
    ctx.line(format!("Connection to {} ({}) succeeded", target.instance.alias, target.instance.hosting));
  } else {
    warn!("Connection to '{}' was refused", target.instance.alias);
    ctx.line(format!(
      "Could not establish connection to {} ({}) with credential '{}'",
      target.instance.alias, target.instance.hosting, target.auth.credential_id
    ));
  }
  Ok(connected)
}

#[cfg(test)]
mod tests {
  use anyhow::Result;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};
  use xray_client::ClientError;
  use xray_core::{HostingType, InMemoryCredentialStore, InstanceRegistry, Settings, StoredCredential, XrayInstance};

  use super::*;
  use crate::testing::Harness;

  fn settings(address: &str) -> Settings {
    Settings {
      cloud_url: address.to_string(),
      instances: InstanceRegistry::new(vec![
        XrayInstance::new("srv", "Server", HostingType::Server, Some(address), None),
        XrayInstance::new("cld", "Cloud", HostingType::Cloud, None, None),
      ]),
      ..Settings::default()
    }
  }

  fn store() -> InMemoryCredentialStore {
    InMemoryCredentialStore::new()
      .with_system(StoredCredential::bearer_token("pat", "token"))
      .with_system(StoredCredential::username_password("cloud", "client-id", "client-secret"))
  }

  #[tokio::test]
  async fn test_server_connection() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/rest/api/2/myself"))
      .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"svc"}"#))
      .expect(1)
      .mount(&mock_server)
      .await;

    let settings = settings(&mock_server.uri());
    let store = store();
    let harness = Harness::new();
    let ctx = harness.context(&settings, &store);

    assert!(test_connection(&ctx, "srv", Some("pat")).await?);
    assert!(harness.log.contains("Connection to Server (SERVER) succeeded"));
    assert!(harness.output("XRAY_IS_REQUEST_SUCCESSFUL").is_none());
    Ok(())
  }

  #[tokio::test]
  async fn test_cloud_rejected_secret() -> Result<()> {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/v2/authenticate"))
      .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid"}"#))
      .mount(&mock_server)
      .await;

    let settings = settings(&mock_server.uri());
    let store = store();
    let harness = Harness::new();
    let ctx = harness.context(&settings, &store);

    assert!(!test_connection(&ctx, "cld", Some("cloud")).await?);
    assert!(harness.log.contains("Could not establish connection to Cloud (CLOUD)"));
    Ok(())
  }

  #[tokio::test]
  async fn test_cloud_bearer_token_is_unsupported() {
    let settings = settings("http://127.0.0.1:9");
    let store = store();
    let harness = Harness::new();
    let ctx = harness.context(&settings, &store);

    // System-scoped bearer tokens resolve, but a Cloud client cannot use them
    let err = test_connection(&ctx, "cld", Some("pat")).await.unwrap_err();
    assert!(matches!(
      err,
      TaskError::Client(ClientError::UnsupportedCredentialType {
        hosting: HostingType::Cloud,
        ..
      })
    ));
  }
}
