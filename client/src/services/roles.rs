//! Role and moderation surface
//!
//! Thin typed pass-throughs over the remote role calls. Only the caller's
//! own role is cached; admin checks and other users' profiles always go to
//! the service so a revoked role is seen immediately.

use std::sync::Arc;

use backend_api::{BackendApi, Principal, UserProfile, UserRole};
use query_cache::{QueryClient, RetryPolicy};

use crate::error::{ClientError, ClientResult};
use crate::keys;
use crate::session::IdentitySnapshot;

#[derive(Clone)]
pub struct RoleService {
    backend: Arc<dyn BackendApi>,
    queries: QueryClient,
    retry: RetryPolicy,
}

impl RoleService {
    pub fn new(backend: Arc<dyn BackendApi>, queries: QueryClient) -> Self {
        Self {
            backend,
            queries,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The caller's role, served from cache after the first read.
    pub async fn caller_role(&self, identity: &IdentitySnapshot) -> ClientResult<UserRole> {
        let key = Self::role_key(identity);
        let backend = self.backend.clone();
        self.queries
            .get_or_fetch(&key, &self.retry, move || {
                let backend = backend.clone();
                async move {
                    backend
                        .get_caller_user_role()
                        .await
                        .map_err(ClientError::from)
                }
            })
            .await
    }

    /// Fresh admin check, never cached.
    pub async fn is_admin(&self) -> ClientResult<bool> {
        self.backend
            .is_caller_admin()
            .await
            .map_err(ClientError::from)
    }

    /// Assign a role to a user. Admin only; the service enforces the gate.
    /// The caller's cached role is invalidated on success.
    pub async fn assign_role(
        &self,
        identity: &IdentitySnapshot,
        user: &Principal,
        role: UserRole,
    ) -> ClientResult<()> {
        let key = Self::role_key(identity);
        let backend = self.backend.clone();
        self.queries
            .run_mutation("assign_caller_user_role", &[key.as_str()], || async move {
                backend
                    .assign_caller_user_role(user, role)
                    .await
                    .map_err(ClientError::from)
            })
            .await
    }

    /// Another user's profile, fetched fresh on every call.
    pub async fn user_profile(&self, user: &Principal) -> ClientResult<Option<UserProfile>> {
        self.backend
            .get_user_profile(user)
            .await
            .map_err(ClientError::from)
    }

    fn role_key(identity: &IdentitySnapshot) -> String {
        match &identity.identity {
            Some(principal) => keys::caller_role(principal),
            None => keys::caller_role(&Principal::new("anonymous")),
        }
    }
}
