//! Fakes shared by the task tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use xray_client::{ClientError, QueryParameter, ResultFormat, ResultsPayload};
use xray_core::{BuildEnvironment, CredentialStore, HostingType, MemoryLog, Settings, UploadResult, Workspace};
use xray_test_utils::WorkspaceGuard;

use crate::context::TaskContext;
use crate::import::ResultUploader;
use crate::retry::Sleeper;

/// Host side of a task run: environment, transcript and workspace
pub struct Harness {
  pub sink: BuildEnvironment,
  pub log: MemoryLog,
  pub workspace: WorkspaceGuard,
}

impl Harness {
  pub fn new() -> Self {
    Self {
      sink: BuildEnvironment::default(),
      log: MemoryLog::new(),
      workspace: WorkspaceGuard::new(),
    }
  }

  pub fn context<'a>(&'a self, settings: &'a Settings, store: &'a dyn CredentialStore) -> TaskContext<'a> {
    TaskContext::new(
      settings,
      store,
      Workspace::new(self.workspace.path()),
      &self.sink,
      &self.log,
    )
  }

  /// An output variable written by the task
  pub fn output(&self, name: &str) -> Option<String> {
    self.sink.get(name)
  }
}

/// One call received by [`ScriptedUploader`]
#[derive(Debug, Clone)]
pub struct UploadCall {
  pub file_name: String,
  pub format: ResultFormat,
  pub query: Vec<(QueryParameter, String)>,
  pub info: Option<String>,
  pub content: Vec<u8>,
}

impl UploadCall {
  pub fn query_value(&self, parameter: QueryParameter) -> Option<&str> {
    self
      .query
      .iter()
      .find(|(p, _)| *p == parameter)
      .map(|(_, v)| v.as_str())
  }
}

/// Answers uploads from per-file scripts, `200 {}` once a script runs dry
pub struct ScriptedUploader {
  hosting: HostingType,
  scripts: Mutex<HashMap<String, VecDeque<UploadResult>>>,
  calls: Mutex<Vec<UploadCall>>,
  delay: Duration,
  in_flight: AtomicUsize,
  max_in_flight: AtomicUsize,
}

impl ScriptedUploader {
  pub fn new(hosting: HostingType) -> Self {
    Self {
      hosting,
      scripts: Mutex::new(HashMap::new()),
      calls: Mutex::new(Vec::new()),
      delay: Duration::ZERO,
      in_flight: AtomicUsize::new(0),
      max_in_flight: AtomicUsize::new(0),
    }
  }

  /// Queue a response for the next upload of a file
  pub fn respond(self, file_name: &str, result: UploadResult) -> Self {
    self
      .scripts
      .lock()
      .unwrap()
      .entry(file_name.to_string())
      .or_default()
      .push_back(result);
    self
  }

  /// Hold every upload for a while so concurrent uploads overlap
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  pub fn calls(&self) -> Vec<UploadCall> {
    self.calls.lock().unwrap().clone()
  }

  pub fn max_in_flight(&self) -> usize {
    self.max_in_flight.load(Ordering::SeqCst)
  }
}

#[async_trait]
impl ResultUploader for ScriptedUploader {
  fn hosting(&self) -> HostingType {
    self.hosting
  }

  async fn upload(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError> {
    self.calls.lock().unwrap().push(UploadCall {
      file_name: payload.file_name.clone(),
      format,
      query: query.to_vec(),
      info: payload.info.clone(),
      content: payload.content.clone(),
    });

    let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    self.in_flight.fetch_sub(1, Ordering::SeqCst);

    let scripted = self
      .scripts
      .lock()
      .unwrap()
      .get_mut(&payload.file_name)
      .and_then(VecDeque::pop_front);
    Ok(scripted.unwrap_or_else(|| UploadResult::new(200, "{}")))
  }
}

/// Records requested sleeps without waiting
#[derive(Default)]
pub struct RecordingSleeper {
  sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
  pub fn sleeps(&self) -> Vec<Duration> {
    self.sleeps.lock().unwrap().clone()
  }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
  async fn sleep(&self, duration: Duration) {
    self.sleeps.lock().unwrap().push(duration);
  }
}
