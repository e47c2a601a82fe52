//! Caller profile lifecycle and the first-run setup prompt
//!
//! A signed-in caller without a saved profile gets prompted exactly once
//! per read cycle: the prompt shows only after the profile read completes
//! with no profile, never while it is loading and never on a failed read.

use std::sync::Arc;

use backend_api::{BackendApi, Principal, UserProfile};
use query_cache::{MountedQuery, QueryClient, QuerySpec, QueryState, RetryPolicy};

use crate::error::{ClientError, ClientResult};
use crate::keys;
use crate::session::IdentitySnapshot;
use crate::validation;

/// Caller profile surface over one query client.
#[derive(Clone)]
pub struct ProfileService {
    backend: Arc<dyn BackendApi>,
    queries: QueryClient,
    retry: RetryPolicy,
}

impl ProfileService {
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

    /// Mount the caller's profile read.
    ///
    /// No refresh interval; the profile only changes through [`save_profile`]
    /// and re-fetches on invalidation. Anonymous or still-initializing
    /// sessions mount disabled and stay idle.
    ///
    /// [`save_profile`]: ProfileService::save_profile
    pub fn mount(&self, identity: &IdentitySnapshot) -> MountedQuery {
        let spec = QuerySpec::new(Self::profile_key(identity))
            .with_retry_policy(self.retry.clone())
            .with_enabled(identity.is_ready() && identity.is_authenticated());

        let backend = self.backend.clone();
        self.queries.mount(spec, move || {
            let backend = backend.clone();
            async move {
                backend
                    .get_caller_user_profile()
                    .await
                    .map_err(ClientError::from)
            }
        })
    }

    /// Current profile read state for this identity.
    pub fn profile(&self, identity: &IdentitySnapshot) -> QueryState<Option<UserProfile>> {
        self.queries.get(&Self::profile_key(identity))
    }

    /// Whether the first-run username prompt is due: a signed-in identity
    /// whose profile read completed with no profile on record.
    pub fn should_prompt_setup(&self, identity: &IdentitySnapshot) -> bool {
        if identity.is_initializing || !identity.is_authenticated() {
            return false;
        }
        matches!(self.profile(identity), QueryState::Ready(None))
    }

    /// Validate and save the caller's username.
    ///
    /// The trimmed form is what gets stored. On success the profile read is
    /// invalidated; the prompt disappears once the re-fetch lands.
    pub async fn save_profile(
        &self,
        identity: &IdentitySnapshot,
        raw_username: &str,
    ) -> ClientResult<UserProfile> {
        if !identity.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let username = validation::validate_username(raw_username)?;
        let profile = UserProfile::new(username);

        let key = Self::profile_key(identity);
        let backend = self.backend.clone();
        let saved = profile.clone();
        self.queries
            .run_mutation("save_caller_user_profile", &[key.as_str()], || async move {
                backend
                    .save_caller_user_profile(&saved)
                    .await
                    .map_err(ClientError::from)
            })
            .await?;

        Ok(profile)
    }

    // Anonymous sessions never fetch; their placeholder key stays idle.
    fn profile_key(identity: &IdentitySnapshot) -> String {
        match &identity.identity {
            Some(principal) => keys::caller_profile(principal),
            None => keys::caller_profile(&Principal::new("anonymous")),
        }
    }
}
