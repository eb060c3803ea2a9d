//! # Xray HTTP Client
//!
//! Request building shared by every endpoint: base URLs of both API
//! families, authentication, proxy routing and conversion of responses into
//! [`UploadResult`]s.

use reqwest::header::{self, HeaderMap};
use reqwest::{Client, Proxy, RequestBuilder, Response, StatusCode};
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, trace, warn};
use xray_core::{Auth, HostingType, ProxySettings, UploadResult};

use crate::consts::{CLOUD_API_PATH, SERVER_API_PATH, USER_AGENT};
use crate::error::ClientError;

/// The two Xray REST API families
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiFamily {
  /// Jira Server/Data Center, rooted at the server address
  Server { server_address: String },
  /// Xray Cloud, rooted at the Cloud base URL
  Cloud { base_url: String },
}

impl ApiFamily {
  pub const fn hosting(&self) -> HostingType {
    match self {
      ApiFamily::Server { .. } => HostingType::Server,
      ApiFamily::Cloud { .. } => HostingType::Cloud,
    }
  }

  /// Root of the Xray REST API
  pub fn api_base(&self) -> String {
    match self {
      ApiFamily::Server { server_address } => format!("{server_address}{SERVER_API_PATH}"),
      ApiFamily::Cloud { base_url } => format!("{base_url}{CLOUD_API_PATH}"),
    }
  }
}

/// Represents an Xray API client
pub struct XrayClient {
  pub(crate) client: Client,
  pub(crate) api: ApiFamily,
  auth: Auth,
  token: OnceCell<String>,
}

impl XrayClient {
  /// Create a new Xray client. No request is sent until an endpoint is called.
  pub fn new(api: ApiFamily, auth: Auth, proxy: Option<&ProxySettings>) -> Result<Self, ClientError> {
    let api = match api {
      ApiFamily::Server { server_address } => ApiFamily::Server {
        server_address: server_address.trim().trim_end_matches('/').to_string(),
      },
      ApiFamily::Cloud { base_url } => ApiFamily::Cloud {
        base_url: base_url.trim().trim_end_matches('/').to_string(),
      },
    };

    let mut builder = Client::builder().user_agent(USER_AGENT);
    if let Some(proxy) = proxy {
      builder = builder.proxy(routing_proxy(proxy));
    }

    Ok(Self {
      client: builder.build()?,
      api,
      auth,
      token: OnceCell::new(),
    })
  }

  pub const fn hosting(&self) -> HostingType {
    self.api.hosting()
  }

  /// URL of a path below the Xray REST API root
  pub(crate) fn api_url(&self, path: &str) -> String {
    format!("{}{}", self.api.api_base(), path)
  }

  /// Attach credentials to a request. Cloud clients exchange their client id
  /// and secret for a token on first use.
  pub(crate) async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
    match (&self.api, &self.auth) {
      (ApiFamily::Cloud { .. }, _) => {
        let token = self.cloud_token().await?;
        Ok(request.bearer_auth(token))
      }
      (ApiFamily::Server { .. }, Auth::UsernamePassword { username, password }) => {
        Ok(request.basic_auth(username, Some(password.expose())))
      }
      (ApiFamily::Server { .. }, Auth::BearerToken { token }) => Ok(request.bearer_auth(token.expose())),
    }
  }

  async fn cloud_token(&self) -> Result<&String, ClientError> {
    self.token.get_or_try_init(|| self.authenticate()).await
  }

  /// Exchange the Cloud client id and secret for a token
  #[instrument(skip(self), level = "debug")]
  pub(crate) async fn authenticate(&self) -> Result<String, ClientError> {
    let (client_id, client_secret) = match &self.auth {
      Auth::UsernamePassword { username, password } => (username.as_str(), password.expose()),
      Auth::BearerToken { .. } => {
        return Err(ClientError::Authentication {
          status: 0,
          body: "Xray Cloud requires a client id and secret".to_string(),
        });
      }
    };

    let url = self.api_url("/authenticate");
    trace!("Xray API URL: {}", url);

    let response = self
      .client
      .post(&url)
      .json(&json!({ "client_id": client_id, "client_secret": client_secret }))
      .send()
      .await?;

    let status = response.status();
    debug!("Xray authenticate response status: {}", status);

    if status == StatusCode::TOO_MANY_REQUESTS {
      warn!("Xray Cloud authentication was rate limited");
      return Err(ClientError::RateLimited(into_upload_result(response).await?));
    }

    let body = response.text().await?;
    if !status.is_success() {
      warn!("Xray Cloud authentication failed with HTTP {}", status);
      return Err(ClientError::Authentication {
        status: status.as_u16(),
        body,
      });
    }

    // The token comes back as a JSON string literal
    let token = serde_json::from_str::<String>(&body).unwrap_or_else(|_| body.trim().trim_matches('"').to_string());
    Ok(token)
  }

  /// Send a request and capture its status, body and advised retry delay
  pub(crate) async fn send(&self, request: RequestBuilder) -> Result<UploadResult, ClientError> {
    let response = request.send().await?;
    into_upload_result(response).await
  }

  /// Authorize and send an upload. A rate-limited token exchange is returned
  /// as its 429 result so the caller's retry policy covers it.
  pub(crate) async fn send_upload(&self, request: RequestBuilder) -> Result<UploadResult, ClientError> {
    let request = match self.authorize(request).await {
      Ok(request) => request,
      Err(ClientError::RateLimited(result)) => return Ok(result),
      Err(e) => return Err(e),
    };
    self.send(request).await
  }
}

/// A proxy that honours the no-proxy rules of the settings
fn routing_proxy(settings: &ProxySettings) -> Proxy {
  let proxy_url = settings.url();
  let rules = settings.clone();

  let proxy = Proxy::custom(move |url| {
    if rules.bypasses(url.as_str()) {
      None
    } else {
      Some(proxy_url.clone())
    }
  });

  match (&settings.username, &settings.password) {
    (Some(username), Some(password)) => proxy.basic_auth(username, password.expose()),
    _ => proxy,
  }
}

async fn into_upload_result(response: Response) -> Result<UploadResult, ClientError> {
  let status = response.status().as_u16();
  let retry_after = retry_after(response.headers());
  let body = response.text().await?;
  debug!("Xray API response status: {}", status);

  let result = UploadResult::new(status, body);
  Ok(match retry_after {
    Some(seconds) => result.with_retry_after(seconds),
    None => result,
  })
}

/// Parse a `Retry-After` header given in whole seconds
fn retry_after(headers: &HeaderMap) -> Option<u64> {
  headers
    .get(header::RETRY_AFTER)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.trim().parse::<u64>().ok())
}
