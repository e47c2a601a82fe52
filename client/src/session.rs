//! Identity provider boundary
//!
//! The embedding shell drives the provider lifecycle (restore, sign-in,
//! sign-out) and pushes each transition here. Everything else in the client
//! only ever reads immutable snapshots, so a transition mid-operation can
//! never tear an observer's view of the identity.

use parking_lot::RwLock;
use tracing::debug;

use backend_api::Principal;

/// Point-in-time view of the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentitySnapshot {
    /// The signed-in principal, or `None` for anonymous visitors.
    pub identity: Option<Principal>,
    /// True until the provider has finished restoring any prior session.
    pub is_initializing: bool,
}

impl IdentitySnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Remote reads may start once initialization has settled, whether or
    /// not anyone is signed in.
    pub fn is_ready(&self) -> bool {
        !self.is_initializing
    }
}

/// Shared identity state for one app session.
pub struct Session {
    state: RwLock<IdentitySnapshot>,
}

impl Session {
    /// A fresh session, still waiting for the provider to initialize.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IdentitySnapshot {
                identity: None,
                is_initializing: true,
            }),
        }
    }

    pub fn snapshot(&self) -> IdentitySnapshot {
        self.state.read().clone()
    }

    pub fn identity(&self) -> Option<Principal> {
        self.state.read().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().identity.is_some()
    }

    pub fn is_initializing(&self) -> bool {
        self.state.read().is_initializing
    }

    /// The provider finished restoring and found no prior session.
    pub fn finish_initializing(&self) {
        self.state.write().is_initializing = false;
        debug!("Identity provider settled with no prior session");
    }

    /// The provider produced a signed-in identity.
    pub fn set_identity(&self, principal: Principal) {
        let mut state = self.state.write();
        debug!(principal = %principal, "Identity signed in");
        state.identity = Some(principal);
        state.is_initializing = false;
    }

    /// Sign out. Cache teardown is the caller's job.
    pub fn clear_identity(&self) {
        let mut state = self.state.write();
        state.identity = None;
        state.is_initializing = false;
        debug!("Identity cleared");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
