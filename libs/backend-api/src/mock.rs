//! In-memory test double for the remote service
//!
//! A controllable [`BackendApi`] implementation for driving the client tier
//! without a network:
//!
//! - **Seeded state**: posts, profiles, and roles preloaded per test
//! - **Caller identity**: the mock impersonates whichever principal is set
//! - **Failure injection**: scripted per-method errors and per-principal
//!   username lookup failures
//! - **Request counting**: per-method call counters for verification
//! - **Delay injection**: artificial latency for cancellation tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::BackendApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Post, Principal, Topic, UserProfile, UserRole};

/// Starting point for assigned timestamps, nanoseconds since the epoch.
const TIMESTAMP_BASE: u64 = 1_720_000_000_000_000_000;

#[derive(Default)]
struct MockState {
    posts: Vec<Post>,
    profiles: HashMap<Principal, UserProfile>,
    roles: HashMap<Principal, UserRole>,
    caller: Option<Principal>,
    next_timestamp: u64,
    fail_queue: HashMap<&'static str, VecDeque<ApiError>>,
    fail_usernames: HashSet<Principal>,
    calls: HashMap<&'static str, u32>,
    delay: Option<Duration>,
}

impl MockState {
    fn bump_timestamp(&mut self) -> u64 {
        self.next_timestamp += 1_000_000_000;
        self.next_timestamp
    }

    fn take_failure(&mut self, method: &str) -> Option<ApiError> {
        self.fail_queue.get_mut(method).and_then(|q| q.pop_front())
    }
}

/// Controllable in-memory remote service.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        let state = MockState {
            next_timestamp: TIMESTAMP_BASE,
            ..MockState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    /// Impersonate `user` on subsequent calls.
    pub fn set_caller(&self, user: Principal) {
        self.state.lock().caller = Some(user);
    }

    /// Make subsequent calls anonymous.
    pub fn clear_caller(&self) {
        self.state.lock().caller = None;
    }

    /// Preload a saved profile for `user`.
    pub fn seed_profile(&self, user: Principal, username: &str) {
        self.state
            .lock()
            .profiles
            .insert(user, UserProfile::new(username));
    }

    /// Preload a role for `user`. Unseeded users default to [`UserRole::User`].
    pub fn seed_role(&self, user: Principal, role: UserRole) {
        self.state.lock().roles.insert(user, role);
    }

    /// Append a post with a service-assigned timestamp; returns the stored
    /// post for assertions.
    pub fn seed_post(&self, author: Principal, content: &str, topic: Topic) -> Post {
        let mut state = self.state.lock();
        let timestamp = state.bump_timestamp();
        let post = Post {
            topic,
            content: content.to_string(),
            author,
            timestamp,
        };
        state.posts.push(post.clone());
        post
    }

    /// Script `error` as the outcome of the next call to `method`. Queued
    /// failures pop in order, one per call.
    pub fn queue_failure(&self, method: &'static str, error: ApiError) {
        self.state
            .lock()
            .fail_queue
            .entry(method)
            .or_default()
            .push_back(error);
    }

    /// Make every `get_username` lookup for `user` fail until further
    /// notice.
    pub fn fail_username_for(&self, user: Principal) {
        self.state.lock().fail_usernames.insert(user);
    }

    /// Inject `delay` before every call completes.
    pub fn set_delay(&self, delay: Duration) {
        self.state.lock().delay = Some(delay);
    }

    /// Number of calls made to `method` so far.
    pub fn calls_to(&self, method: &str) -> u32 {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Snapshot of stored posts in creation order.
    pub fn posts(&self) -> Vec<Post> {
        self.state.lock().posts.clone()
    }

    /// The saved profile of `user`, if any.
    pub fn profile_of(&self, user: &Principal) -> Option<UserProfile> {
        self.state.lock().profiles.get(user).cloned()
    }

    /// Count the call, pop any scripted failure, and apply the delay knob.
    async fn begin(&self, method: &'static str) -> ApiResult<()> {
        let (failure, delay) = {
            let mut state = self.state.lock();
            *state.calls.entry(method).or_insert(0) += 1;
            (state.take_failure(method), state.delay)
        };
        if let Some(error) = failure {
            return Err(error);
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendApi for MockBackend {
    async fn create_post(&self, content: &str, topic: Topic) -> ApiResult<()> {
        self.begin("create_post").await?;
        let mut state = self.state.lock();
        let author = state.caller.clone().ok_or(ApiError::Unauthenticated)?;
        let timestamp = state.bump_timestamp();
        state.posts.push(Post {
            topic,
            content: content.to_string(),
            author,
            timestamp,
        });
        Ok(())
    }

    async fn get_public_feed(&self) -> ApiResult<Vec<Post>> {
        self.begin("get_public_feed").await?;
        // Service display order: newest first.
        let state = self.state.lock();
        Ok(state.posts.iter().rev().cloned().collect())
    }

    async fn get_username(&self, user: &Principal) -> ApiResult<Option<String>> {
        self.begin("get_username").await?;
        let state = self.state.lock();
        if state.fail_usernames.contains(user) {
            return Err(ApiError::Transport(format!(
                "username lookup failed for {}",
                user
            )));
        }
        Ok(state.profiles.get(user).map(|p| p.username.clone()))
    }

    async fn get_caller_user_profile(&self) -> ApiResult<Option<UserProfile>> {
        self.begin("get_caller_user_profile").await?;
        let state = self.state.lock();
        Ok(state
            .caller
            .as_ref()
            .and_then(|caller| state.profiles.get(caller).cloned()))
    }

    async fn save_caller_user_profile(&self, profile: &UserProfile) -> ApiResult<()> {
        self.begin("save_caller_user_profile").await?;
        let mut state = self.state.lock();
        let caller = state.caller.clone().ok_or(ApiError::Unauthenticated)?;
        state.profiles.insert(caller, profile.clone());
        Ok(())
    }

    async fn get_user_profile(&self, user: &Principal) -> ApiResult<Option<UserProfile>> {
        self.begin("get_user_profile").await?;
        Ok(self.state.lock().profiles.get(user).cloned())
    }

    async fn get_caller_user_role(&self) -> ApiResult<UserRole> {
        self.begin("get_caller_user_role").await?;
        let state = self.state.lock();
        Ok(match &state.caller {
            Some(caller) => state.roles.get(caller).copied().unwrap_or(UserRole::User),
            None => UserRole::Guest,
        })
    }

    async fn is_caller_admin(&self) -> ApiResult<bool> {
        self.begin("is_caller_admin").await?;
        let state = self.state.lock();
        let role = match &state.caller {
            Some(caller) => state.roles.get(caller).copied().unwrap_or(UserRole::User),
            None => UserRole::Guest,
        };
        Ok(role == UserRole::Admin)
    }

    async fn assign_caller_user_role(&self, user: &Principal, role: UserRole) -> ApiResult<()> {
        self.begin("assign_caller_user_role").await?;
        let mut state = self.state.lock();
        let caller_role = match &state.caller {
            Some(caller) => state.roles.get(caller).copied().unwrap_or(UserRole::User),
            None => UserRole::Guest,
        };
        if caller_role != UserRole::Admin {
            return Err(ApiError::Status {
                code: 403,
                message: "admin role required".to_string(),
            });
        }
        state.roles.insert(user.clone(), role);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn feed_returns_newest_first() {
        let backend = MockBackend::new();
        let alice = Principal::new("alice");
        backend.seed_post(alice.clone(), "first", Topic::Tech);
        backend.seed_post(alice, "second", Topic::Random);

        let feed = backend.get_public_feed().await.expect("Should fetch");
        assert_eq!(feed[0].content, "second");
        assert_eq!(feed[1].content, "first");
        assert!(feed[0].timestamp > feed[1].timestamp);
    }

    #[tokio::test]
    async fn queued_failure_pops_once() {
        let backend = MockBackend::new();
        backend.queue_failure(
            "get_public_feed",
            ApiError::Transport("connection reset".into()),
        );

        assert!(backend.get_public_feed().await.is_err());
        assert!(backend.get_public_feed().await.is_ok());
        assert_eq!(backend.calls_to("get_public_feed"), 2);
    }

    #[tokio::test]
    async fn anonymous_caller_cannot_post() {
        let backend = MockBackend::new();
        let err = backend
            .create_post("hello", Topic::Tech)
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Unauthenticated);
        assert!(backend.posts().is_empty());
    }

    #[tokio::test]
    async fn role_assignment_requires_admin() {
        let backend = MockBackend::new();
        let admin = Principal::new("admin");
        let user = Principal::new("user");

        backend.set_caller(user.clone());
        let err = backend
            .assign_caller_user_role(&user, UserRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { code: 403, .. }));

        backend.seed_role(admin.clone(), UserRole::Admin);
        backend.set_caller(admin);
        backend
            .assign_caller_user_role(&user, UserRole::Admin)
            .await
            .expect("Should assign");
        backend.set_caller(user);
        assert!(backend.is_caller_admin().await.expect("Should answer"));
    }

    #[tokio::test]
    async fn username_failure_is_scoped_to_principal() {
        let backend = MockBackend::new();
        let alice = Principal::new("alice");
        let bob = Principal::new("bob");
        backend.seed_profile(alice.clone(), "alice_a");
        backend.seed_profile(bob.clone(), "bob_b");
        backend.fail_username_for(bob.clone());

        assert_eq!(
            backend.get_username(&alice).await.expect("Should resolve"),
            Some("alice_a".to_string())
        );
        assert!(backend.get_username(&bob).await.is_err());
    }
}
