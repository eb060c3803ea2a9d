//! Constants for the xray-client.

/// User-Agent header value for the Xray API client
pub const USER_AGENT: &str = concat!("xray-bridge/", env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Path of the Xray REST API below a Jira Server address
pub const SERVER_API_PATH: &str = "/rest/raven/1.0";

/// Path of the Xray REST API below the Cloud base URL
pub const CLOUD_API_PATH: &str = "/api/v2";

/// Jira endpoint used to check Server credentials
pub const SERVER_MYSELF_PATH: &str = "/rest/api/2/myself";

/// File name of the zip sent by a feature import
pub const FEATURES_ZIP_NAME: &str = "xray_cucumber_features.zip";

/// Media type of JSON payloads and info parts
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Media type of XML result files
pub const XML_MEDIA_TYPE: &str = "application/xml";

/// Media type of zip archives
pub const ZIP_MEDIA_TYPE: &str = "application/zip";
