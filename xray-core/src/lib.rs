//! # Xray Core Library
//!
//! Host-independent building blocks for exchanging test artifacts with a
//! Jira/Xray instance: the instance registry, credential resolution, proxy
//! rules, workspace file discovery, response interpretation and the build
//! environment sink. Nothing in this crate performs network I/O.

pub mod config;
pub mod creds;
pub mod env;
pub mod error;
pub mod instance;
pub mod log;
pub mod output;
pub mod outputs;
pub mod proxy;
pub mod upload;
pub mod workspace;

// Re-export the types most callers need
pub use config::{ConfigDirs, DEFAULT_CLOUD_URL, DEFAULT_MAX_RETRY_WAIT_SECS, Settings, get_config_dirs};
pub use creds::{
  Auth, CredentialFileError, CredentialKind, CredentialResolver, CredentialScope, CredentialStore, FileCredentialStore,
  Identity, InMemoryCredentialStore, ResolvedAuth, Secret, StoredCredential,
};
pub use env::{
  BuildEnvironment, DotenvFile, EnvironmentInjection, EnvironmentSink, expand_variables, is_unresolved, shell_quote,
};
pub use error::{ConfigFileError, ConfigurationError};
pub use instance::{HostingType, InstanceRegistry, RawInstance, XrayInstance};
pub use log::{MemoryLog, TaskLog, TracingLog};
pub use output::ColorMode;
pub use outputs::{OutputVariable, OutputVariableSet, ResponseKind, is_upload_successful, test_execution_key};
pub use proxy::ProxySettings;
pub use upload::UploadResult;
pub use workspace::{Workspace, WorkspaceError, check_path_traversal};
