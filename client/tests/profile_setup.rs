//! First-run profile prompt lifecycle over the scripted mock service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use backend_api::{
    ApiError, ApiResult, BackendApi, MockBackend, Post, Principal, Topic, UserProfile, UserRole,
};
use murmur_client::app::AppState;
use murmur_client::composer::ProfileSetupForm;
use murmur_client::error::ClientError;
use murmur_client::validation::ValidationError;
use query_cache::{QueryState, RetryPolicy};

fn authed_app(mock: &Arc<MockBackend>, principal: &str) -> AppState {
    let app = AppState::new(mock.clone());
    let principal = Principal::new(principal);
    mock.set_caller(principal.clone());
    app.session.set_identity(principal);
    app
}

#[tokio::test]
async fn prompt_never_shows_for_anonymous_visitors() {
    let mock = Arc::new(MockBackend::new());
    let app = AppState::new(mock.clone());
    app.session.finish_initializing();

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(40)).await;

    assert!(!app.show_profile_setup());
    // The profile query is not even enabled without an identity.
    assert_eq!(mock.calls_to("get_caller_user_profile"), 0);
    drop(mounts);
}

#[tokio::test]
async fn prompt_shows_only_after_read_completes_with_no_profile() {
    let mock = Arc::new(MockBackend::new());
    let app = authed_app(&mock, "alice");

    // Nothing mounted yet: the read has not completed, no prompt.
    assert!(!app.show_profile_setup());

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(mock.calls_to("get_caller_user_profile"), 1);
    assert!(app.show_profile_setup());
    drop(mounts);
}

#[tokio::test]
async fn returning_user_sees_no_prompt() {
    let mock = Arc::new(MockBackend::new());
    let alice = Principal::new("alice");
    mock.seed_profile(alice.clone(), "alice_a");
    let app = authed_app(&mock, "alice");

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!app.show_profile_setup());
    match app.profile.profile(&app.session.snapshot()) {
        QueryState::Ready(Some(profile)) => assert_eq!(profile.username, "alice_a"),
        other => panic!("unexpected profile state: {:?}", other),
    }
    drop(mounts);
}

#[tokio::test]
async fn saving_a_username_hides_the_prompt() {
    let mock = Arc::new(MockBackend::new());
    let app = authed_app(&mock, "alice");

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(app.show_profile_setup());

    // Whitespace-padded input is stored trimmed.
    let saved = app
        .profile
        .save_profile(&app.session.snapshot(), "  alice_a  ")
        .await
        .expect("Save should succeed");
    assert_eq!(saved.username, "alice_a");
    assert_eq!(
        mock.profile_of(&Principal::new("alice"))
            .map(|p| p.username),
        Some("alice_a".to_string())
    );

    // The invalidation wakes the mounted read; once it lands the prompt
    // goes away.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(mock.calls_to("get_caller_user_profile"), 2);
    assert!(!app.show_profile_setup());
    drop(mounts);
}

#[tokio::test]
async fn prompt_stays_hidden_when_the_read_fails() {
    let mock = Arc::new(MockBackend::new());
    let mut app = authed_app(&mock, "alice");
    app.profile = app.profile.clone().with_retry_policy(RetryPolicy::none());

    mock.queue_failure(
        "get_caller_user_profile",
        ApiError::Transport("connection refused".to_string()),
    );

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A failed read is not "no profile": never prompt over it.
    assert!(!app.show_profile_setup());
    assert!(matches!(
        app.profile.profile(&app.session.snapshot()),
        QueryState::Failed { .. }
    ));
    drop(mounts);
}

mock! {
    pub Remote {}

    #[async_trait]
    impl BackendApi for Remote {
        async fn create_post(&self, content: &str, topic: Topic) -> ApiResult<()>;
        async fn get_public_feed(&self) -> ApiResult<Vec<Post>>;
        async fn get_username(&self, user: &Principal) -> ApiResult<Option<String>>;
        async fn get_caller_user_profile(&self) -> ApiResult<Option<UserProfile>>;
        async fn save_caller_user_profile(&self, profile: &UserProfile) -> ApiResult<()>;
        async fn get_user_profile(&self, user: &Principal) -> ApiResult<Option<UserProfile>>;
        async fn get_caller_user_role(&self) -> ApiResult<UserRole>;
        async fn is_caller_admin(&self) -> ApiResult<bool>;
        async fn assign_caller_user_role(&self, user: &Principal, role: UserRole) -> ApiResult<()>;
    }
}

#[tokio::test]
async fn invalid_username_makes_no_remote_call() {
    let mut remote = MockRemote::new();
    remote.expect_save_caller_user_profile().times(0);

    let app = AppState::new(Arc::new(remote));
    app.session.set_identity(Principal::new("alice"));

    let err = app
        .profile
        .save_profile(&app.session.snapshot(), "ab")
        .await
        .expect_err("Two characters are under the minimum");

    assert_eq!(
        err,
        ClientError::Validation(ValidationError::TooShort { min: 3 })
    );
}

#[tokio::test]
async fn setup_form_rejects_short_input_and_keeps_the_draft() {
    let mut remote = MockRemote::new();
    remote.expect_save_caller_user_profile().times(0);

    let app = AppState::new(Arc::new(remote));
    app.session.set_identity(Principal::new("alice"));

    let mut form = ProfileSetupForm::new();
    form.set_username(" ab ");
    let err = form
        .submit(&app.session, &app.profile)
        .await
        .expect_err("Trimmed length 2 is under the minimum");

    assert_eq!(
        err,
        ClientError::Validation(ValidationError::TooShort { min: 3 })
    );
    assert!(!form.is_pending());
    assert_eq!(form.username(), " ab ");
}
