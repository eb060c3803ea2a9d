//! # Xray Bridge
//!
//! Umbrella crate for embedding the Xray build steps in another host.
//! The `xray` binary lives in the `xray-cli` crate.

pub use {xray_client, xray_core, xray_tasks};
pub use xray_tasks::{
  ExportFeaturesJob, ImportFeaturesJob, ImportResultsJob, TaskContext, TaskError, export_features, import_features,
  import_results, test_connection,
};
