//! Instance and credential resolution shared by every task.

use tracing::{debug, info};
use xray_core::{ConfigurationError, CredentialResolver, ResolvedAuth, XrayInstance};

use crate::context::TaskContext;

/// The instance a task talks to and the credential it uses
#[derive(Debug, Clone)]
pub struct Target {
  pub instance: XrayInstance,
  pub auth: ResolvedAuth,
}

/// Find the instance and resolve its credential.
///
/// The instance's own credential id wins; the task's credential id is used
/// when the instance has none. Nothing is resolved when both are blank.
pub fn resolve_target(
  ctx: &TaskContext<'_>,
  instance_id: &str,
  credential_id: Option<&str>,
) -> Result<Target, ConfigurationError> {
  if instance_id.trim().is_empty() {
    return Err(ConfigurationError::MissingInstanceId);
  }

  let instance = ctx
    .settings
    .instances
    .get(instance_id)
    .cloned()
    .ok_or_else(|| ConfigurationError::UnknownInstance(instance_id.to_string()))?;

  let credential_id = instance
    .default_credential_id()
    .or(credential_id)
    .map(str::trim)
    .filter(|id| !id.is_empty())
    .ok_or(ConfigurationError::MissingCredential)?
    .to_string();

  debug!(
    "Resolving credential '{}' for {} instance '{}'",
    credential_id, instance.hosting, instance.alias
  );

  let auth = CredentialResolver::new(ctx.credentials)
    .resolve(&credential_id, instance.hosting, &ctx.identity)
    .ok_or(ConfigurationError::CredentialNotFound(credential_id))?;

  info!("Using {:?}-scoped credential '{}'", auth.scope, auth.credential_id);
  Ok(Target { instance, auth })
}
