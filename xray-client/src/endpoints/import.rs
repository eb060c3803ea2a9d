//! Result import endpoint implementations.

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use tracing::{info, instrument, trace};
use xray_core::{HostingType, UploadResult};

use crate::client::XrayClient;
use crate::consts::JSON_MEDIA_TYPE;
use crate::error::ClientError;
use crate::format::{QueryParameter, ResultFormat, ResultsPayload};

impl XrayClient {
  /// Upload one results file to `/import/execution<suffix>`.
  ///
  /// Blank query values and parameters the format does not accept are
  /// dropped. Any HTTP status is returned as an [`UploadResult`].
  #[instrument(skip(self, payload, query), fields(file = %payload.file_name), level = "debug")]
  pub(crate) async fn import_results(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError> {
    info!("Importing {} results from {}", format, payload.file_name);

    let url = self.api_url(&format!("/import/execution{}", format.suffix()));
    trace!("Xray API URL: {}", url);

    let params: Vec<(&str, &str)> = query
      .iter()
      .filter(|(parameter, value)| format.accepts(*parameter) && !value.trim().is_empty())
      .map(|(parameter, value)| (parameter.key(), value.trim()))
      .collect();

    let request = self.client.post(&url).query(&params);
    let request = if format.is_multipart() {
      request.multipart(self.results_form(format, payload)?)
    } else {
      request
        .header(CONTENT_TYPE, format.results_media_type())
        .body(payload.content.clone())
    };

    self.send_upload(request).await
  }

  fn results_form(&self, format: ResultFormat, payload: &ResultsPayload) -> Result<Form, ClientError> {
    let results_part = match self.hosting() {
      HostingType::Server => "file",
      HostingType::Cloud => "results",
    };

    let results = Part::bytes(payload.content.clone())
      .file_name(payload.file_name.clone())
      .mime_str(format.results_media_type())?;
    let mut form = Form::new().part(results_part, results);

    if let Some(info) = &payload.info {
      form = form.part("info", json_part(info, "info.json")?);
    }
    if let Some(test_info) = &payload.test_info {
      form = form.part("testInfo", json_part(test_info, "testInfo.json")?);
    }
    Ok(form)
  }
}

pub(crate) fn json_part(content: &str, file_name: &str) -> Result<Part, ClientError> {
  Ok(
    Part::text(content.to_string())
      .file_name(file_name.to_string())
      .mime_str(JSON_MEDIA_TYPE)?,
  )
}
