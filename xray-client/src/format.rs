//! # Result Formats
//!
//! The Xray import endpoints, each identified by a display name and a URL
//! suffix below `/import/execution`. Either form selects a format.

use std::fmt;

use crate::consts::{JSON_MEDIA_TYPE, XML_MEDIA_TYPE};

/// Field every format requires
pub const IMPORT_FILE_PATH: &str = "importFilePath";

/// Field every multipart format requires
pub const IMPORT_INFO: &str = "importInfo";

/// An Xray result import endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultFormat {
  XrayJson,
  XrayJsonMultipart,
  Junit,
  JunitMultipart,
  Testng,
  TestngMultipart,
  Nunit,
  NunitMultipart,
  Xunit,
  XunitMultipart,
  Robot,
  RobotMultipart,
  Cucumber,
  CucumberMultipart,
  Behave,
  BehaveMultipart,
}

impl ResultFormat {
  pub const ALL: [ResultFormat; 16] = [
    ResultFormat::XrayJson,
    ResultFormat::XrayJsonMultipart,
    ResultFormat::Junit,
    ResultFormat::JunitMultipart,
    ResultFormat::Testng,
    ResultFormat::TestngMultipart,
    ResultFormat::Nunit,
    ResultFormat::NunitMultipart,
    ResultFormat::Xunit,
    ResultFormat::XunitMultipart,
    ResultFormat::Robot,
    ResultFormat::RobotMultipart,
    ResultFormat::Cucumber,
    ResultFormat::CucumberMultipart,
    ResultFormat::Behave,
    ResultFormat::BehaveMultipart,
  ];

  /// Display name
  pub const fn name(self) -> &'static str {
    match self {
      ResultFormat::XrayJson => "Xray JSON",
      ResultFormat::XrayJsonMultipart => "Xray JSON multipart",
      ResultFormat::Junit => "JUnit XML",
      ResultFormat::JunitMultipart => "JUnit XML multipart",
      ResultFormat::Testng => "TestNG XML",
      ResultFormat::TestngMultipart => "TestNG XML multipart",
      ResultFormat::Nunit => "NUnit XML",
      ResultFormat::NunitMultipart => "NUnit XML multipart",
      ResultFormat::Xunit => "xUnit XML",
      ResultFormat::XunitMultipart => "xUnit XML multipart",
      ResultFormat::Robot => "Robot XML",
      ResultFormat::RobotMultipart => "Robot XML multipart",
      ResultFormat::Cucumber => "Cucumber JSON",
      ResultFormat::CucumberMultipart => "Cucumber JSON multipart",
      ResultFormat::Behave => "Behave JSON",
      ResultFormat::BehaveMultipart => "Behave JSON multipart",
    }
  }

  /// URL suffix below `/import/execution`
  pub const fn suffix(self) -> &'static str {
    match self {
      ResultFormat::XrayJson => "",
      ResultFormat::XrayJsonMultipart => "/multipart",
      ResultFormat::Junit => "/junit",
      ResultFormat::JunitMultipart => "/junit/multipart",
      ResultFormat::Testng => "/testng",
      ResultFormat::TestngMultipart => "/testng/multipart",
      ResultFormat::Nunit => "/nunit",
      ResultFormat::NunitMultipart => "/nunit/multipart",
      ResultFormat::Xunit => "/xunit",
      ResultFormat::XunitMultipart => "/xunit/multipart",
      ResultFormat::Robot => "/robot",
      ResultFormat::RobotMultipart => "/robot/multipart",
      ResultFormat::Cucumber => "/cucumber",
      ResultFormat::CucumberMultipart => "/cucumber/multipart",
      ResultFormat::Behave => "/behave",
      ResultFormat::BehaveMultipart => "/behave/multipart",
    }
  }

  /// Find a format by display name, falling back to the URL suffix
  pub fn lookup(value: &str) -> Option<Self> {
    let value = value.trim();
    Self::ALL
      .into_iter()
      .find(|f| f.name() == value)
      .or_else(|| Self::ALL.into_iter().find(|f| f.suffix() == value))
  }

  pub const fn is_multipart(self) -> bool {
    matches!(
      self,
      ResultFormat::XrayJsonMultipart
        | ResultFormat::JunitMultipart
        | ResultFormat::TestngMultipart
        | ResultFormat::NunitMultipart
        | ResultFormat::XunitMultipart
        | ResultFormat::RobotMultipart
        | ResultFormat::CucumberMultipart
        | ResultFormat::BehaveMultipart
    )
  }

  const fn is_xml(self) -> bool {
    matches!(
      self,
      ResultFormat::Junit
        | ResultFormat::JunitMultipart
        | ResultFormat::Testng
        | ResultFormat::TestngMultipart
        | ResultFormat::Nunit
        | ResultFormat::NunitMultipart
        | ResultFormat::Xunit
        | ResultFormat::XunitMultipart
        | ResultFormat::Robot
        | ResultFormat::RobotMultipart
    )
  }

  /// Whether the import file path may be a glob expression
  pub const fn supports_glob(self) -> bool {
    !matches!(self, ResultFormat::XrayJson | ResultFormat::XrayJsonMultipart)
  }

  /// The non-multipart endpoint of the same family
  pub const fn generic(self) -> Self {
    match self {
      ResultFormat::XrayJsonMultipart => ResultFormat::XrayJson,
      ResultFormat::JunitMultipart => ResultFormat::Junit,
      ResultFormat::TestngMultipart => ResultFormat::Testng,
      ResultFormat::NunitMultipart => ResultFormat::Nunit,
      ResultFormat::XunitMultipart => ResultFormat::Xunit,
      ResultFormat::RobotMultipart => ResultFormat::Robot,
      ResultFormat::CucumberMultipart => ResultFormat::Cucumber,
      ResultFormat::BehaveMultipart => ResultFormat::Behave,
      other => other,
    }
  }

  /// Fields that must be non-blank for this format
  pub const fn required_fields(self) -> &'static [&'static str] {
    if self.is_multipart() {
      &[IMPORT_FILE_PATH, IMPORT_INFO]
    } else {
      &[IMPORT_FILE_PATH]
    }
  }

  /// Whether a query parameter is sent to this endpoint.
  ///
  /// Non-multipart XML endpoints take every parameter; the other
  /// non-multipart endpoints only take a Test Execution key.
  pub const fn accepts(self, parameter: QueryParameter) -> bool {
    if self.is_multipart() {
      return false;
    }
    self.is_xml() || matches!(parameter, QueryParameter::TestExecKey)
  }

  /// Media type of the results file
  pub const fn results_media_type(self) -> &'static str {
    if self.is_xml() { XML_MEDIA_TYPE } else { JSON_MEDIA_TYPE }
  }
}

impl fmt::Display for ResultFormat {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Query parameters of the import endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryParameter {
  ProjectKey,
  TestExecKey,
  TestPlanKey,
  TestEnvironments,
  Revision,
  FixVersion,
}

impl QueryParameter {
  pub const ALL: [QueryParameter; 6] = [
    QueryParameter::ProjectKey,
    QueryParameter::TestExecKey,
    QueryParameter::TestPlanKey,
    QueryParameter::TestEnvironments,
    QueryParameter::Revision,
    QueryParameter::FixVersion,
  ];

  /// Name on the wire
  pub const fn key(self) -> &'static str {
    match self {
      QueryParameter::ProjectKey => "projectKey",
      QueryParameter::TestExecKey => "testExecKey",
      QueryParameter::TestPlanKey => "testPlanKey",
      QueryParameter::TestEnvironments => "testEnvironments",
      QueryParameter::Revision => "revision",
      QueryParameter::FixVersion => "fixVersion",
    }
  }
}

/// One results file and its optional info parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsPayload {
  pub file_name: String,
  pub content: Vec<u8>,
  pub info: Option<String>,
  pub test_info: Option<String>,
}

impl ResultsPayload {
  pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
    Self {
      file_name: file_name.into(),
      content,
      info: None,
      test_info: None,
    }
  }

  pub fn with_info(mut self, info: Option<String>, test_info: Option<String>) -> Self {
    self.info = info;
    self.test_info = test_info;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_lookup_by_name_or_suffix() {
    assert_eq!(ResultFormat::lookup("JUnit XML"), Some(ResultFormat::Junit));
    assert_eq!(ResultFormat::lookup("/junit/multipart"), Some(ResultFormat::JunitMultipart));
    assert_eq!(ResultFormat::lookup(" Cucumber JSON multipart "), Some(ResultFormat::CucumberMultipart));
    assert_eq!(ResultFormat::lookup("/multipart"), Some(ResultFormat::XrayJsonMultipart));
    assert_eq!(ResultFormat::lookup("/gherkin"), None);
  }

  #[test]
  fn test_generic_counterpart() {
    for format in ResultFormat::ALL {
      assert!(!format.generic().is_multipart());
      assert_eq!(format.generic().generic(), format.generic());
    }
    assert_eq!(ResultFormat::RobotMultipart.generic(), ResultFormat::Robot);
    assert_eq!(ResultFormat::XrayJson.generic(), ResultFormat::XrayJson);
  }

  #[test]
  fn test_required_fields() {
    assert_eq!(ResultFormat::Junit.required_fields(), &[IMPORT_FILE_PATH]);
    assert_eq!(ResultFormat::BehaveMultipart.required_fields(), &[IMPORT_FILE_PATH, IMPORT_INFO]);
  }

  #[test]
  fn test_accepted_query_parameters() {
    assert!(ResultFormat::Junit.accepts(QueryParameter::ProjectKey));
    assert!(ResultFormat::Nunit.accepts(QueryParameter::FixVersion));
    assert!(!ResultFormat::Cucumber.accepts(QueryParameter::ProjectKey));
    assert!(ResultFormat::Cucumber.accepts(QueryParameter::TestExecKey));
    assert!(!ResultFormat::JunitMultipart.accepts(QueryParameter::TestExecKey));
  }

  #[test]
  fn test_glob_support() {
    assert!(!ResultFormat::XrayJson.supports_glob());
    assert!(!ResultFormat::XrayJsonMultipart.supports_glob());
    assert!(ResultFormat::Junit.supports_glob());
    assert!(ResultFormat::BehaveMultipart.supports_glob());
  }
}
