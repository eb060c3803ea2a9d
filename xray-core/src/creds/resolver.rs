//! Two-tier credential lookup.
//!
//! System credentials are searched first. When nothing matches, the user
//! tier is searched under the identity of the person who triggered the build.
//! A CLOUD instance only ever resolves to username/password material from the
//! user tier: any other kind found there is treated as not found.

use tracing::{debug, warn};

use super::{CredentialKind, CredentialScope, CredentialStore, Identity, ResolvedAuth, StoredCredential};
use crate::instance::HostingType;

/// Resolves a credential id against a [`CredentialStore`]
pub struct CredentialResolver<'a> {
  store: &'a dyn CredentialStore,
}

impl<'a> CredentialResolver<'a> {
  pub fn new(store: &'a dyn CredentialStore) -> Self {
    Self { store }
  }

  /// Resolve a credential id for a task targeting the given hosting type.
  ///
  /// Returns `None` for a blank id, when nothing visible matches, or when a
  /// CLOUD instance matches a user credential that is not username/password.
  pub fn resolve(&self, credential_id: &str, hosting: HostingType, identity: &Identity) -> Option<ResolvedAuth> {
    if credential_id.trim().is_empty() {
      return None;
    }

    if let Some(resolved) = self.resolve_system(credential_id) {
      return Some(resolved);
    }

    self.resolve_user(credential_id, hosting, identity)
  }

  fn resolve_system(&self, credential_id: &str) -> Option<ResolvedAuth> {
    let system = supported(self.store.system_credentials());

    // Username/password wins over a bearer token with the same id
    let found = [CredentialKind::UsernamePassword, CredentialKind::BearerToken]
      .iter()
      .find_map(|kind| system.iter().find(|c| c.id == credential_id && &c.kind == kind))?;

    debug!(credential_id, kind = %found.kind, "Resolved system credential");
    into_resolved(found, CredentialScope::System)
  }

  fn resolve_user(&self, credential_id: &str, hosting: HostingType, identity: &Identity) -> Option<ResolvedAuth> {
    let user = supported(self.store.user_credentials(identity));
    let mut matching = user.iter().filter(|c| c.id == credential_id).peekable();
    let found = *matching.peek()?;

    if hosting == HostingType::Cloud && matching.any(|c| c.kind != CredentialKind::UsernamePassword) {
      warn!(
        credential_id,
        kind = %found.kind,
        "Rejecting user credential: CLOUD instances only accept username/password credentials"
      );
      return None;
    }

    debug!(credential_id, kind = %found.kind, "Resolved user credential");
    into_resolved(found, CredentialScope::User)
  }
}

fn supported(credentials: Vec<StoredCredential>) -> Vec<StoredCredential> {
  credentials.into_iter().filter(|c| c.kind.is_supported()).collect()
}

fn into_resolved(credential: &StoredCredential, scope: CredentialScope) -> Option<ResolvedAuth> {
  Some(ResolvedAuth {
    credential_id: credential.id.clone(),
    scope,
    auth: credential.to_auth()?,
  })
}
