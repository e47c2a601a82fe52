//! Application state wiring
//!
//! One [`AppState`] owns the session, the query client, and every service,
//! all sharing a single remote transport. A presentation shell constructs
//! it once, drives identity transitions into it, and binds to the states
//! the services expose.

use std::sync::Arc;

use tracing::info;

use backend_api::{BackendApi, HttpBackendClient, Principal};
use query_cache::{CacheEvent, MountedQuery, QueryClient};
use tokio::sync::broadcast;

use crate::config::ClientConfig;
use crate::error::ClientResult;
use crate::services::{FeedService, ProfileService, RoleService};
use crate::session::Session;

pub struct AppState {
    pub session: Arc<Session>,
    pub queries: QueryClient,
    pub feed: FeedService,
    pub profile: ProfileService,
    pub roles: RoleService,
    // Kept typed so login/logout can manage the transport credential.
    // Absent when the app was wired over a test double.
    transport: Option<Arc<HttpBackendClient>>,
}

impl AppState {
    /// Wire the full client tier over an existing backend.
    pub fn new(backend: Arc<dyn BackendApi>) -> Self {
        let queries = QueryClient::new();
        Self {
            session: Arc::new(Session::new()),
            feed: FeedService::new(backend.clone(), queries.clone()),
            profile: ProfileService::new(backend.clone(), queries.clone()),
            roles: RoleService::new(backend, queries.clone()),
            queries,
            transport: None,
        }
    }

    /// Build the HTTP transport from config and wire the client tier
    /// around it.
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let transport = Arc::new(HttpBackendClient::with_timeouts(
            &config.backend.base_url,
            config.backend.connect_timeout(),
            config.backend.request_timeout(),
        )?);

        let mut app = Self::new(transport.clone());
        app.feed = app
            .feed
            .clone()
            .with_refresh_interval(config.feed.refresh_interval());
        app.transport = Some(transport);
        Ok(app)
    }

    /// Install a signed-in identity and its transport credential.
    ///
    /// Live mounts belong to the previous identity; drop them and call
    /// [`mount_queries`] again.
    ///
    /// [`mount_queries`]: AppState::mount_queries
    pub fn login(&self, principal: Principal, credential: &str) {
        if let Some(transport) = &self.transport {
            transport.set_credential(credential);
        }
        self.session.set_identity(principal);
        info!("Signed in");
    }

    /// Sign out: clear the identity, drop the transport credential, and
    /// tear down every cached entry.
    pub fn logout(&self) {
        self.session.clear_identity();
        if let Some(transport) = &self.transport {
            transport.clear_credential();
        }
        self.queries.clear();
        info!("Signed out, cache cleared");
    }

    /// Mount the always-on queries for the current identity snapshot.
    ///
    /// Mounts are per identity epoch: re-mount after every sign-in or
    /// sign-out, dropping the previous guards.
    pub fn mount_queries(&self) -> AppMounts {
        let identity = self.session.snapshot();
        AppMounts {
            feed: self.feed.mount(&identity),
            profile: self.profile.mount(&identity),
        }
    }

    /// Whether the first-run username prompt should be visible.
    pub fn show_profile_setup(&self) -> bool {
        self.profile.should_prompt_setup(&self.session.snapshot())
    }

    /// Cache event stream, for shells that re-render on updates.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.queries.subscribe()
    }
}

/// Guards for the always-on queries of one identity epoch. Dropping them
/// stops the background refresh loops.
pub struct AppMounts {
    pub feed: MountedQuery,
    pub profile: MountedQuery,
}
