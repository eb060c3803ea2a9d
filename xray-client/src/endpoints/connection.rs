//! Connection check endpoint.

use tracing::{debug, info, instrument};

use crate::client::{ApiFamily, XrayClient};
use crate::consts::SERVER_MYSELF_PATH;
use crate::error::ClientError;

impl XrayClient {
  /// Check that the instance accepts the client's credentials.
  ///
  /// Server asks Jira for the current user; Cloud performs the token
  /// exchange. A rejected credential is `Ok(false)`.
  #[instrument(skip(self), level = "debug")]
  pub(crate) async fn test_connection(&self) -> Result<bool, ClientError> {
    match &self.api {
      ApiFamily::Server { server_address } => {
        let url = format!("{server_address}{SERVER_MYSELF_PATH}");
        let request = self.authorize(self.client.get(&url)).await?;
        let result = self.send(request).await?;
        debug!("Connection test response status: {}", result.status_code);
        Ok(result.is_successful())
      }
      ApiFamily::Cloud { .. } => match self.authenticate().await {
        Ok(_) => Ok(true),
        Err(ClientError::Authentication { status, .. }) => {
          info!("Xray Cloud rejected the credentials (HTTP {})", status);
          Ok(false)
        }
        Err(e) => Err(e),
      },
    }
  }
}

#[cfg(test)]
mod tests {
  use anyhow::Result;
  use wiremock::matchers::{basic_auth, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};
  use xray_core::{Auth, Secret};

  use super::*;

  fn auth() -> Auth {
    Auth::UsernamePassword {
      username: "test_user".to_string(),
      password: Secret::from("test_token"),
    }
  }

  #[tokio::test]
  async fn test_server_connection() -> Result<()> {
    let mock_server = MockServer::start().await;
    let client = XrayClient::new(
      ApiFamily::Server {
        server_address: mock_server.uri(),
      },
      auth(),
      None,
    )?;

    Mock::given(method("GET"))
      .and(path("/rest/api/2/myself"))
      .and(basic_auth("test_user", "test_token"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "name": "test_user" })))
      .mount(&mock_server)
      .await;

    assert!(client.test_connection().await?);
    Ok(())
  }

  #[tokio::test]
  async fn test_server_connection_rejected() -> Result<()> {
    let mock_server = MockServer::start().await;
    let client = XrayClient::new(
      ApiFamily::Server {
        server_address: mock_server.uri(),
      },
      auth(),
      None,
    )?;

    Mock::given(method("GET"))
      .and(path("/rest/api/2/myself"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&mock_server)
      .await;

    assert!(!client.test_connection().await?);
    Ok(())
  }

  #[tokio::test]
  async fn test_cloud_connection() -> Result<()> {
    let mock_server = MockServer::start().await;
    let client = XrayClient::new(
      ApiFamily::Cloud {
        base_url: mock_server.uri(),
      },
      auth(),
      None,
    )?;

    Mock::given(method("POST"))
      .and(path("/api/v2/authenticate"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&mock_server)
      .await;

    assert!(!client.test_connection().await?);
    Ok(())
  }
}
