//! Cucumber feature import endpoint.

use reqwest::multipart::{Form, Part};
use tracing::{info, instrument, trace};
use xray_core::UploadResult;

use crate::client::XrayClient;
use crate::consts::{FEATURES_ZIP_NAME, ZIP_MEDIA_TYPE};
use crate::endpoints::import::json_part;
use crate::error::ClientError;

impl XrayClient {
  /// Upload a zip of feature files to `/import/feature`
  #[instrument(skip(self, archive, test_info, precondition_info), level = "debug")]
  pub(crate) async fn import_features(
    &self,
    project_key: &str,
    archive: Vec<u8>,
    test_info: Option<String>,
    precondition_info: Option<String>,
  ) -> Result<UploadResult, ClientError> {
    info!("Importing {} bytes of feature files into {}", archive.len(), project_key);

    let url = self.api_url("/import/feature");
    trace!("Xray API URL: {}", url);

    let zip = Part::bytes(archive)
      .file_name(FEATURES_ZIP_NAME)
      .mime_str(ZIP_MEDIA_TYPE)?;
    let mut form = Form::new().part("file", zip);
    if let Some(test_info) = &test_info {
      form = form.part("testInfo", json_part(test_info, "testInfo.json")?);
    }
    if let Some(precondition_info) = &precondition_info {
      form = form.part("precondInfo", json_part(precondition_info, "precondInfo.json")?);
    }

    let request = self
      .client
      .post(&url)
      .query(&[("projectKey", project_key.trim())])
      .multipart(form);

    self.send_upload(request).await
  }
}

#[cfg(test)]
mod tests {
  use anyhow::Result;
  use wiremock::matchers::{basic_auth, body_string_contains, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};
  use xray_core::{Auth, Secret};

  use crate::client::{ApiFamily, XrayClient};

  #[tokio::test]
  async fn test_import_features() -> Result<()> {
    let mock_server = MockServer::start().await;
    let client = XrayClient::new(
      ApiFamily::Server {
        server_address: mock_server.uri(),
      },
      Auth::UsernamePassword {
        username: "test_user".to_string(),
        password: Secret::from("test_token"),
      },
      None,
    )?;

    Mock::given(method("POST"))
      .and(path("/rest/raven/1.0/import/feature"))
      .and(query_param("projectKey", "CALC"))
      .and(basic_auth("test_user", "test_token"))
      .and(body_string_contains("filename=\"xray_cucumber_features.zip\""))
      .and(body_string_contains("name=\"precondInfo\""))
      .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"key":"CALC-1"},{"key":"CALC-2"}]"#))
      .expect(1)
      .mount(&mock_server)
      .await;

    let result = client
      .import_features("CALC", b"PK".to_vec(), None, Some("{}".to_string()))
      .await?;

    assert!(result.is_successful());
    assert_eq!(result.body, r#"[{"key":"CALC-1"},{"key":"CALC-2"}]"#);
    Ok(())
  }
}
