//! # Results Import
//!
//! Uploads one results file, or every file matched by a glob expression,
//! to an Xray import endpoint. Uploads run in file order or concurrently,
//! and can be chained so every file lands in the Test Execution created by
//! the first upload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};
use xray_client::format::{IMPORT_FILE_PATH, IMPORT_INFO};
use xray_client::{ClientError, ClientFactory, QueryParameter, ResultFormat, ResultImporter, ResultsPayload};
use xray_core::{
  Auth, ConfigurationError, HostingType, OutputVariableSet, ResponseKind, UploadResult, WorkspaceError, XrayInstance,
  check_path_traversal, is_unresolved, test_execution_key,
};

use crate::context::TaskContext;
use crate::error::TaskError;
use crate::resolve::resolve_target;
use crate::retry::{RetryPolicy, Sleeper, TokioSleeper, retry_upload};

/// Whether the info fields hold JSON text or workspace file paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoSource {
  #[default]
  Inline,
  File,
}

/// Inputs of a results import
#[derive(Debug, Clone, Default)]
pub struct ImportResultsJob {
  pub instance_id: String,
  pub credential_id: Option<String>,
  /// Endpoint display name or URL suffix
  pub format: String,
  /// File path or glob expression, relative to the workspace
  pub import_file_path: String,
  pub import_info: Option<String>,
  pub test_import_info: Option<String>,
  pub info_source: InfoSource,
  pub parameters: BTreeMap<QueryParameter, String>,
  pub import_to_same_execution: bool,
  pub import_in_parallel: bool,
}

impl ImportResultsJob {
  pub fn new(instance_id: &str, format: &str, import_file_path: &str) -> Self {
    Self {
      instance_id: instance_id.to_string(),
      format: format.to_string(),
      import_file_path: import_file_path.to_string(),
      ..Self::default()
    }
  }

  pub fn with_parameter(mut self, parameter: QueryParameter, value: &str) -> Self {
    self.parameters.insert(parameter, value.to_string());
    self
  }

  fn field(&self, name: &str) -> Option<&str> {
    match name {
      IMPORT_FILE_PATH => Some(&self.import_file_path),
      IMPORT_INFO => self.import_info.as_deref(),
      _ => None,
    }
  }

  /// Check the inputs before anything is resolved or sent
  pub fn validate(&self) -> Result<ResultFormat, ConfigurationError> {
    if self.instance_id.trim().is_empty() {
      return Err(ConfigurationError::MissingInstanceId);
    }

    let format = ResultFormat::lookup(&self.format).ok_or_else(|| ConfigurationError::UnknownFormat(self.format.clone()))?;

    for &field in format.required_fields() {
      if self.field(field).is_none_or(|value| value.trim().is_empty()) {
        return Err(ConfigurationError::MissingField(field));
      }
    }

    check_path_traversal(&self.import_file_path)?;
    if self.info_source == InfoSource::File {
      for path in [&self.import_info, &self.test_import_info].into_iter().flatten() {
        check_path_traversal(path)?;
      }
    }

    Ok(format)
  }
}

/// Sends one results file to Xray
#[async_trait]
pub trait ResultUploader: Send + Sync {
  fn hosting(&self) -> HostingType;

  async fn upload(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError>;
}

#[async_trait]
impl ResultUploader for ResultImporter {
  fn hosting(&self) -> HostingType {
    ResultImporter::hosting(self)
  }

  async fn upload(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError> {
    ResultImporter::upload(self, format, payload, query).await
  }
}

#[async_trait]
impl<T: ResultUploader + ?Sized> ResultUploader for &T {
  fn hosting(&self) -> HostingType {
    (**self).hosting()
  }

  async fn upload(
    &self,
    format: ResultFormat,
    payload: &ResultsPayload,
    query: &[(QueryParameter, String)],
  ) -> Result<UploadResult, ClientError> {
    (**self).upload(format, payload, query).await
  }
}

/// Import results through an HTTP client built from the settings
pub async fn import_results(ctx: &TaskContext<'_>, job: &ImportResultsJob) -> Result<OutputVariableSet, TaskError> {
  let factory = ClientFactory::from_settings(ctx.settings);
  import_results_with(
    ctx,
    job,
    |instance, auth| factory.result_importer(instance, auth),
    &TokioSleeper,
  )
  .await
}

/// Import results through the uploader returned by `connect`.
///
/// Outputs are written exactly once. When an upload fails hard, the results
/// of the uploads that finished before it still make up the outputs.
#[instrument(skip_all, fields(instance = %job.instance_id, format = %job.format))]
pub async fn import_results_with<U, C>(
  ctx: &TaskContext<'_>,
  job: &ImportResultsJob,
  connect: C,
  sleeper: &dyn Sleeper,
) -> Result<OutputVariableSet, TaskError>
where
  U: ResultUploader,
  C: FnOnce(&XrayInstance, &Auth) -> Result<U, ClientError>,
{
  ctx.line("Starting XRAY: Results Import Task...");
  ctx.line("##########################################################");
  ctx.line("####     Xray is importing the execution results      ####");
  ctx.line("##########################################################");

  let run = match prepare(ctx, job, connect, sleeper) {
    Ok(run) => run,
    Err(e) => return Err(ctx.abort(e, None)),
  };

  let mut results = Vec::with_capacity(run.files.len());
  let outcome = run.upload_all(&mut results).await;
  let outputs = OutputVariableSet::interpret(&results, run.uploader.hosting(), ResponseKind::ResultImport);

  match outcome {
    Ok(()) => {
      if !outputs.is_successful() {
        warn!("Xray rejected at least one of {} uploads", results.len());
      }
      ctx.complete(outputs)
    }
    Err(e) => {
      let partial = (!results.is_empty()).then_some(outputs);
      Err(ctx.abort(e, partial))
    }
  }
}

/// Everything resolved before the first upload
struct ImportRun<'c, 'a, U> {
  ctx: &'c TaskContext<'a>,
  uploader: U,
  sleeper: &'c dyn Sleeper,
  policy: RetryPolicy,
  format: ResultFormat,
  files: Vec<PathBuf>,
  info: Option<String>,
  test_info: Option<String>,
  query: Vec<(QueryParameter, String)>,
  chaining: bool,
  parallel: bool,
}

fn prepare<'c, 'a, U, C>(
  ctx: &'c TaskContext<'a>,
  job: &ImportResultsJob,
  connect: C,
  sleeper: &'c dyn Sleeper,
) -> Result<ImportRun<'c, 'a, U>, TaskError>
where
  U: ResultUploader,
  C: FnOnce(&XrayInstance, &Auth) -> Result<U, ClientError>,
{
  let format = job.validate()?;
  let target = resolve_target(ctx, &job.instance_id, job.credential_id.as_deref())?;
  let uploader = connect(&target.instance, &target.auth.auth)?;

  let resolved = ctx.expand(&job.import_file_path);
  check_path_traversal(&resolved)?;
  let files = if format.supports_glob() {
    ctx.workspace.glob(&resolved)?
  } else {
    vec![ctx.workspace.resolve_file(&resolved)?]
  };
  for file in &files {
    ctx.line(format!("File found: {}", file.display()));
  }

  let info = read_info(ctx, job.info_source, job.import_info.as_deref())?;
  let test_info = read_info(ctx, job.info_source, job.test_import_info.as_deref())?;

  let query: Vec<_> = job
    .parameters
    .iter()
    .map(|(parameter, value)| (*parameter, ctx.expand(value)))
    .collect();

  let test_exec_key = job
    .parameters
    .get(&QueryParameter::TestExecKey)
    .map(|key| ctx.expand(key))
    .unwrap_or_default();
  let chaining = job.import_to_same_execution && is_unresolved(&test_exec_key);

  debug!(
    "Importing {} file(s) as {} (chaining: {}, parallel: {})",
    files.len(),
    format,
    chaining,
    job.import_in_parallel
  );

  Ok(ImportRun {
    ctx,
    uploader,
    sleeper,
    policy: RetryPolicy::from_settings(ctx.settings),
    format,
    files,
    info,
    test_info,
    query,
    chaining,
    parallel: job.import_in_parallel,
  })
}

/// Expand an info field and, for file sources, read the file it names
fn read_info(ctx: &TaskContext<'_>, source: InfoSource, value: Option<&str>) -> Result<Option<String>, TaskError> {
  let Some(value) = ctx.expand_non_blank(value) else {
    return Ok(None);
  };

  match source {
    InfoSource::Inline => Ok(Some(value)),
    InfoSource::File => {
      check_path_traversal(&value)?;
      let path = ctx.workspace.resolve_file(&value)?;
      let content = ctx.workspace.read(&path)?;
      Ok(Some(String::from_utf8_lossy(&content).into_owned()))
    }
  }
}

impl<U: ResultUploader> ImportRun<'_, '_, U> {
  async fn upload_all(&self, results: &mut Vec<UploadResult>) -> Result<(), TaskError> {
    if self.parallel && self.files.len() > 1 {
      self.upload_parallel(results).await
    } else {
      self.upload_sequential(results).await
    }
  }

  async fn upload_sequential(&self, results: &mut Vec<UploadResult>) -> Result<(), TaskError> {
    let mut key: Option<String> = None;

    for file in &self.files {
      let result = self.upload_file(file, key.as_deref()).await?;
      let chain_from = (self.chaining && key.is_none()).then(|| result.body.clone());
      results.push(result);

      if let Some(body) = chain_from {
        key = Some(self.chain_key(&body)?);
      }
    }
    Ok(())
  }

  async fn upload_parallel(&self, results: &mut Vec<UploadResult>) -> Result<(), TaskError> {
    let mut remaining = self.files.as_slice();
    let mut key: Option<String> = None;

    if self.chaining
      && let Some((first, rest)) = remaining.split_first()
    {
      let result = self.upload_file(first, None).await?;
      let body = result.body.clone();
      results.push(result);
      key = Some(self.chain_key(&body)?);
      remaining = rest;
    }

    let workers = self.ctx.settings.max_parallel_uploads.max(1);
    info!("Uploading {} files with up to {} concurrent uploads", remaining.len(), workers);

    let outcomes: Vec<_> = stream::iter(remaining.iter().map(|file| self.upload_file(file, key.as_deref())))
      .buffered(workers)
      .collect()
      .await;

    let mut first_error = None;
    for outcome in outcomes {
      match outcome {
        Ok(result) => results.push(result),
        Err(e) => {
          first_error.get_or_insert(e);
        }
      }
    }
    first_error.map_or(Ok(()), Err)
  }

  /// The Test Execution key later uploads are chained to
  fn chain_key(&self, body: &str) -> Result<String, TaskError> {
    let key = test_execution_key(body, self.uploader.hosting()).ok_or(TaskError::MissingTestExecutionKey)?;
    info!("Importing remaining results into Test Execution {}", key);
    Ok(key)
  }

  async fn upload_file(&self, file: &Path, chain_key: Option<&str>) -> Result<UploadResult, TaskError> {
    let mut format = self.format;
    let mut query = self.query.clone();
    if let Some(key) = chain_key {
      format = format.generic();
      query.retain(|(parameter, _)| *parameter != QueryParameter::TestExecKey);
      query.push((QueryParameter::TestExecKey, key.to_string()));
    }

    let file_name = file
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_default();
    // Read off the executor so concurrent uploads keep moving
    let content = tokio::fs::read(file).await.map_err(|source| WorkspaceError::Io {
      path: file.to_path_buf(),
      source,
    })?;
    let payload =
      ResultsPayload::new(file_name.as_str(), content).with_info(self.info.clone(), self.test_info.clone());

    let (ctx, uploader) = (self.ctx, &self.uploader);
    let (payload, query, file_name) = (&payload, query.as_slice(), file_name.as_str());

    retry_upload(&self.policy, self.sleeper, &ctx.cancel, ctx.log, move || async move {
      ctx.line(format!("Starting to import results from {}", file_name));
      let result = ctx.cancel.interruptible(uploader.upload(format, payload, query)).await??;

      ctx.line(format!("Response: ({}) {}", result.status_code, result.body));
      if result.is_successful() {
        ctx.line(format!("Successfully imported {} results from {}", format, file_name));
      }
      Ok::<_, TaskError>(result)
    })
    .await
  }
}
