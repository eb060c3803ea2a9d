use std::collections::HashMap;

use anyhow::Result;
use wiremock::matchers::{basic_auth, body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xray_bridge::xray_client::QueryParameter;
use xray_bridge::xray_core::{BuildEnvironment, FileCredentialStore, Identity, MemoryLog, Settings, Workspace};
use xray_bridge::{ImportResultsJob, TaskContext, import_results, test_connection};
use xray_test_utils::{ConfigFilesGuard, WorkspaceGuard};

struct Build {
  files: ConfigFilesGuard,
  workspace: WorkspaceGuard,
  settings: Settings,
  credentials: FileCredentialStore,
  sink: BuildEnvironment,
  log: MemoryLog,
}

impl Build {
  fn new(server: &MockServer) -> Result<Self> {
    let files = ConfigFilesGuard::with_mock_server(&server.uri())?;
    let settings = Settings::load(&files.settings_path())?;
    let credentials = FileCredentialStore::load(&files.credentials_path())?;
    Ok(Self {
      files,
      workspace: WorkspaceGuard::new(),
      settings,
      credentials,
      sink: BuildEnvironment::new(HashMap::new()),
      log: MemoryLog::new(),
    })
  }

  fn context(&self) -> TaskContext<'_> {
    TaskContext::new(
      &self.settings,
      &self.credentials,
      Workspace::new(self.workspace.path()),
      &self.sink,
      &self.log,
    )
  }
}

#[tokio::test]
async fn test_server_import_into_same_execution() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/rest/raven/1.0/import/execution/junit"))
    .and(basic_auth("test_user", "test_token"))
    .and(query_param("testExecKey", "CALC-50"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(r#"{"testExecIssue":{"key":"CALC-50"},"testIssues":{"success":[{"key":"CALC-2"}]}}"#),
    )
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/rest/raven/1.0/import/execution/junit"))
    .and(basic_auth("test_user", "test_token"))
    .and(query_param_is_missing("testExecKey"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_string(r#"{"testExecIssue":{"key":"CALC-50"},"testIssues":{"success":[{"key":"CALC-1"}]}}"#),
    )
    .expect(1)
    .mount(&server)
    .await;

  let build = Build::new(&server)?;
  build.workspace.write("reports/TEST-a.xml", "<testsuite name=\"a\"/>");
  build.workspace.write("reports/TEST-b.xml", "<testsuite name=\"b\"/>");

  let mut job = ImportResultsJob::new("server-1", "JUnit XML", "reports/TEST-*.xml")
    .with_parameter(QueryParameter::ProjectKey, "CALC");
  job.import_to_same_execution = true;

  let ctx = build.context();
  let outputs = import_results(&ctx, &job).await?;

  assert!(outputs.is_successful());
  assert_eq!(build.sink.get("XRAY_TEST_EXECS").as_deref(), Some("CALC-50"));
  assert_eq!(build.sink.get("XRAY_TESTS").as_deref(), Some("CALC-1;CALC-2"));
  assert_eq!(build.sink.get("XRAY_IS_REQUEST_SUCCESSFUL").as_deref(), Some("true"));
  assert!(build.log.contains("Successfully imported JUnit XML results from TEST-b.xml"));
  Ok(())
}

#[tokio::test]
async fn test_cloud_import_with_system_credential() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/v2/authenticate"))
    .and(body_json(serde_json::json!({"client_id": "client-id", "client_secret": "client-secret"})))
    .respond_with(ResponseTemplate::new(200).set_body_string("\"cloud-token\""))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/api/v2/import/execution/junit"))
    .and(header("Authorization", "Bearer cloud-token"))
    .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id":"10001","key":"CLOUD-7"}"#))
    .expect(1)
    .mount(&server)
    .await;

  let build = Build::new(&server)?;
  build.workspace.write("junit.xml", "<testsuite/>");

  let mut job =
    ImportResultsJob::new("cloud-1", "/junit", "junit.xml").with_parameter(QueryParameter::ProjectKey, "CLOUD");
  job.credential_id = Some("cloud-creds".to_string());

  let ctx = build.context();
  let outputs = import_results(&ctx, &job).await?;

  assert!(outputs.is_successful());
  assert_eq!(build.sink.get("XRAY_TEST_EXECS").as_deref(), Some("CLOUD-7"));
  assert_eq!(build.sink.get("XRAY_ISSUES_MODIFIED").as_deref(), Some("CLOUD-7"));
  Ok(())
}

#[tokio::test]
async fn test_user_credential_needs_triggering_user() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/rest/api/2/myself"))
    .and(header("Authorization", "Bearer alice-token"))
    .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"alice"}"#))
    .mount(&server)
    .await;

  let build = Build::new(&server)?;
  let settings = Settings::parse(&format!(
    r#"[[instances]]
id = "dc-1"
alias = "Data Center"
hosting = "SERVER"
server_address = "{}"
"#,
    server.uri()
  ))?;
  let log = MemoryLog::new();

  let anonymous = TaskContext::new(
    &settings,
    &build.credentials,
    Workspace::new(build.workspace.path()),
    &build.sink,
    &log,
  );
  assert!(test_connection(&anonymous, "dc-1", Some("alice-pat")).await.is_err());

  let alice = TaskContext::new(
    &settings,
    &build.credentials,
    Workspace::new(build.workspace.path()),
    &build.sink,
    &log,
  )
  .with_identity(Identity::User("alice".to_string()));
  assert!(test_connection(&alice, "dc-1", Some("alice-pat")).await?);

  // The connection test leaves the build environment untouched
  assert!(build.sink.get("XRAY_IS_REQUEST_SUCCESSFUL").is_none());
  assert!(build.files.path().exists());
  Ok(())
}

#[tokio::test]
async fn test_cloud_import_retries_rate_limited_authentication() -> Result<()> {
  let server = MockServer::start().await;
  Mock::given(method("POST"))
    .and(path("/api/v2/authenticate"))
    .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
    .up_to_n_times(1)
    .with_priority(1)
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/api/v2/authenticate"))
    .respond_with(ResponseTemplate::new(200).set_body_string("\"cloud-token\""))
    .expect(1)
    .mount(&server)
    .await;
  Mock::given(method("POST"))
    .and(path("/api/v2/import/execution/junit"))
    .and(header("Authorization", "Bearer cloud-token"))
    .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"key":"CLOUD-8"}"#))
    .expect(1)
    .mount(&server)
    .await;

  let build = Build::new(&server)?;
  build.workspace.write("junit.xml", "<testsuite/>");

  let mut job = ImportResultsJob::new("cloud-1", "/junit", "junit.xml");
  job.credential_id = Some("cloud-creds".to_string());

  let ctx = build.context();
  let outputs = import_results(&ctx, &job).await?;

  assert!(outputs.is_successful());
  assert_eq!(build.sink.get("XRAY_TEST_EXECS").as_deref(), Some("CLOUD-8"));
  assert!(build.log.contains("Too Many Requests: Waiting 0 seconds - try #1"));
  Ok(())
}
