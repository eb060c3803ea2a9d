//! # Xray Tasks
//!
//! The build steps that exchange test artifacts with Xray. Every task runs
//! the same way: validate its inputs, resolve the instance and credential,
//! build a client for one capability, do its work, then write the output
//! variables to the build environment exactly once, whether it succeeded or
//! not.

pub mod cancel;
pub mod connection;
pub mod context;
pub mod error;
pub mod export;
pub mod features;
pub mod import;
pub mod resolve;
pub mod retry;

#[cfg(test)]
mod testing;

pub use cancel::CancelSignal;
pub use connection::test_connection;
pub use context::TaskContext;
pub use error::TaskError;
pub use export::{DEFAULT_EXPORT_FOLDER, ExportFeaturesJob, export_features};
pub use features::{ImportFeaturesJob, import_features};
pub use import::{ImportResultsJob, InfoSource, ResultUploader, import_results, import_results_with};
pub use resolve::{Target, resolve_target};
pub use retry::{RetryDecision, RetryPolicy, Sleeper, TokioSleeper};
