//! Cucumber feature export endpoint.

use tracing::{info, instrument, trace, warn};

use crate::client::{ApiFamily, XrayClient};
use crate::error::ClientError;

impl XrayClient {
  /// Download the features of the given issues and/or saved filter as a zip.
  ///
  /// Server exposes this at `/export/test` (asking for a zip with
  /// `fz=true`); Cloud at `/export/cucumber`.
  #[instrument(skip(self), level = "debug")]
  pub(crate) async fn export_features(
    &self,
    issue_keys: Option<&str>,
    filter_id: Option<&str>,
  ) -> Result<Vec<u8>, ClientError> {
    let path = match self.api {
      ApiFamily::Server { .. } => "/export/test",
      ApiFamily::Cloud { .. } => "/export/cucumber",
    };
    let url = self.api_url(path);
    trace!("Xray API URL: {}", url);

    let mut params: Vec<(&str, &str)> = Vec::new();
    if let Some(keys) = issue_keys.map(str::trim).filter(|k| !k.is_empty()) {
      params.push(("keys", keys));
    }
    if let Some(filter) = filter_id.map(str::trim).filter(|f| !f.is_empty()) {
      params.push(("filter", filter));
    }
    if matches!(self.api, ApiFamily::Server { .. }) {
      params.push(("fz", "true"));
    }

    let request = self.authorize(self.client.get(&url).query(&params)).await?;
    let response = request.send().await?;
    let status = response.status();

    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!("Feature export failed: HTTP {} - {}", status, body);
      return Err(ClientError::UnexpectedStatus {
        status: status.as_u16(),
        body,
      });
    }

    let bytes = response.bytes().await?;
    info!("Downloaded {} bytes of feature files", bytes.len());
    Ok(bytes.to_vec())
  }
}
