//! # Output Variables
//!
//! Interprets Xray responses into the fixed set of variables a task exposes
//! to later build steps. Every variable is always present; facts that are
//! not known are empty strings.
//!
//! Response shapes differ by hosting type:
//!
//! | Response        | SERVER                                              | CLOUD                                   |
//! |-----------------|-----------------------------------------------------|-----------------------------------------|
//! | Result import   | `{"testExecIssue":{"key"},"testIssues":{"success":[{"key"}]}}` | `{"key"}`                  |
//! | Feature import  | `[{"key"}, ...]`                                    | `{"updatedOrCreatedTests":[{"key"}],"updatedOrCreatedPreconditions":[{"key"}]}` |

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io;

use serde_json::Value;
use tracing::debug;

use crate::env::{EnvironmentInjection, EnvironmentSink};
use crate::instance::HostingType;
use crate::log::TaskLog;
use crate::upload::UploadResult;

const SEPARATOR: &str = ";";

/// Variables written by every task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputVariable {
  /// "true" if the latest Xray request was successful, "false" otherwise
  IsRequestSuccessful,
  /// All issues created or modified
  IssuesModified,
  /// Raw response bodies of the latest Xray request
  RawResponse,
  /// Test Execution issues created or modified
  TestExecs,
  /// Test issues created or modified
  Tests,
}

impl OutputVariable {
  pub const ALL: [OutputVariable; 5] = [
    OutputVariable::IsRequestSuccessful,
    OutputVariable::IssuesModified,
    OutputVariable::RawResponse,
    OutputVariable::TestExecs,
    OutputVariable::Tests,
  ];

  /// Name of the variable in the build environment
  pub const fn name(self) -> &'static str {
    match self {
      OutputVariable::IsRequestSuccessful => "XRAY_IS_REQUEST_SUCCESSFUL",
      OutputVariable::IssuesModified => "XRAY_ISSUES_MODIFIED",
      OutputVariable::RawResponse => "XRAY_RAW_RESPONSE",
      OutputVariable::TestExecs => "XRAY_TEST_EXECS",
      OutputVariable::Tests => "XRAY_TESTS",
    }
  }
}

impl fmt::Display for OutputVariable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Which kind of upload produced the responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
  ResultImport,
  FeatureImport,
}

/// A fully populated set of output variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputVariableSet {
  values: BTreeMap<OutputVariable, String>,
}

impl Default for OutputVariableSet {
  fn default() -> Self {
    Self {
      values: OutputVariable::ALL.iter().map(|v| (*v, String::new())).collect(),
    }
  }
}

impl OutputVariableSet {
  /// A successful outcome with an optional message as the raw response
  pub fn success(message: Option<&str>) -> Self {
    Self::outcome(true, message)
  }

  /// A failed outcome with an optional message as the raw response
  pub fn failed(message: Option<&str>) -> Self {
    Self::outcome(false, message)
  }

  fn outcome(successful: bool, message: Option<&str>) -> Self {
    let mut set = Self::default();
    set.set(OutputVariable::IsRequestSuccessful, successful.to_string());
    if let Some(message) = message {
      set.set(OutputVariable::RawResponse, message);
    }
    set
  }

  /// Interpret upload results.
  ///
  /// An empty result list counts as successful. Bodies that are not the
  /// expected JSON shape contribute no keys.
  pub fn interpret(results: &[UploadResult], hosting: HostingType, kind: ResponseKind) -> Self {
    let mut set = Self::default();

    set.set(OutputVariable::IsRequestSuccessful, is_upload_successful(results).to_string());
    set.set(OutputVariable::RawResponse, raw_responses(results));

    match kind {
      ResponseKind::ResultImport => {
        let test_execs: BTreeSet<String> =
          results.iter().filter_map(|r| test_execution_key(&r.body, hosting)).collect();
        let tests: BTreeSet<String> = results.iter().flat_map(|r| test_keys(&r.body, hosting)).collect();
        let modified: BTreeSet<&String> = test_execs.iter().chain(tests.iter()).collect();

        set.set(OutputVariable::IssuesModified, join(modified));
        set.set(OutputVariable::TestExecs, join(&test_execs));
        set.set(OutputVariable::Tests, join(&tests));
      }
      ResponseKind::FeatureImport => {
        let modified: BTreeSet<String> = results.iter().flat_map(|r| feature_issue_keys(&r.body, hosting)).collect();
        set.set(OutputVariable::IssuesModified, join(&modified));
      }
    }

    set
  }

  /// Value of one variable
  pub fn get(&self, variable: OutputVariable) -> &str {
    self.values.get(&variable).map(String::as_str).unwrap_or_default()
  }

  fn set(&mut self, variable: OutputVariable, value: impl Into<String>) {
    self.values.insert(variable, value.into());
  }

  /// True when the outcome variable is "true"
  pub fn is_successful(&self) -> bool {
    self.get(OutputVariable::IsRequestSuccessful) == "true"
  }

  /// Keep every extracted fact but report the outcome as failed. Used when
  /// a task aborts after some uploads already returned.
  pub fn into_failed(mut self) -> Self {
    self.set(OutputVariable::IsRequestSuccessful, false.to_string());
    self
  }

  /// Variables keyed by their environment names
  pub fn to_env(&self) -> BTreeMap<String, String> {
    self.values.iter().map(|(k, v)| (k.name().to_string(), v.clone())).collect()
  }

  /// Convert into an injection that replaces every variable of a previous task
  pub fn into_injection(self) -> EnvironmentInjection {
    EnvironmentInjection::new(self.to_env(), BTreeSet::new())
  }

  /// Log every variable and write the whole set to the sink in one step
  pub fn write(self, sink: &dyn EnvironmentSink, log: &dyn TaskLog) -> io::Result<()> {
    for (variable, value) in &self.values {
      log.line(&format!("{variable}: {value}"));
    }
    sink.apply(self.into_injection())
  }
}

/// True when every status is 2xx. An empty list is successful.
pub fn is_upload_successful(results: &[UploadResult]) -> bool {
  results.iter().all(UploadResult::is_successful)
}

fn raw_responses(results: &[UploadResult]) -> String {
  results.iter().map(|r| r.body.as_str()).collect::<Vec<_>>().join(SEPARATOR)
}

/// Extract the Test Execution key from a result-import response body
pub fn test_execution_key(body: &str, hosting: HostingType) -> Option<String> {
  let root = parse_object(body)?;
  let key = match hosting {
    HostingType::Cloud => root.get("key"),
    HostingType::Server => root.get("testExecIssue").and_then(|issue| issue.get("key")),
  };
  key.and_then(Value::as_str).filter(|k| !k.trim().is_empty()).map(str::to_string)
}

/// Test keys of a result-import response body. Xray Cloud does not report
/// them.
fn test_keys(body: &str, hosting: HostingType) -> Vec<String> {
  match hosting {
    HostingType::Cloud => Vec::new(),
    HostingType::Server => parse_object(body)
      .and_then(|root| root.get("testIssues")?.get("success").cloned())
      .map(|success| keys_of(&success))
      .unwrap_or_default(),
  }
}

fn feature_issue_keys(body: &str, hosting: HostingType) -> Vec<String> {
  let Ok(root) = serde_json::from_str::<Value>(body) else {
    debug!("Skipping feature import response that is not JSON");
    return Vec::new();
  };

  match hosting {
    HostingType::Server => keys_of(&root),
    HostingType::Cloud => ["updatedOrCreatedTests", "updatedOrCreatedPreconditions"]
      .iter()
      .filter_map(|field| root.get(field))
      .flat_map(keys_of)
      .collect(),
  }
}

fn parse_object(body: &str) -> Option<Value> {
  match serde_json::from_str::<Value>(body) {
    Ok(value) if value.is_object() => Some(value),
    _ => {
      debug!("Skipping response that is not a JSON object");
      None
    }
  }
}

/// `key` fields of the objects in a JSON array
fn keys_of(array: &Value) -> Vec<String> {
  array
    .as_array()
    .map(|items| {
      items
        .iter()
        .filter_map(|item| item.get("key").and_then(Value::as_str))
        .filter(|key| !key.trim().is_empty())
        .map(str::to_string)
        .collect()
    })
    .unwrap_or_default()
}

fn join<I, S>(values: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  values.into_iter().map(|v| v.as_ref().to_string()).collect::<Vec<_>>().join(SEPARATOR)
}
