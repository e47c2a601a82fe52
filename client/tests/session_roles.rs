//! Session teardown and the role surface over the scripted mock service

use std::sync::Arc;
use std::time::Duration;

use backend_api::{ApiError, MockBackend, Principal, Topic, UserRole};
use murmur_client::app::AppState;
use murmur_client::error::ClientError;
use query_cache::QueryState;

fn authed_app(mock: &Arc<MockBackend>, principal: &str) -> AppState {
    let app = AppState::new(mock.clone());
    let principal = Principal::new(principal);
    mock.set_caller(principal.clone());
    app.session.set_identity(principal);
    app
}

#[tokio::test]
async fn logout_tears_the_cache_down() {
    let mock = Arc::new(MockBackend::new());
    let alice = Principal::new("alice");
    mock.seed_post(alice.clone(), "hello", Topic::Tech);

    let app = AppState::new(mock.clone());
    mock.set_caller(alice.clone());
    app.login(alice, "delegation-token");
    assert!(app.session.is_authenticated());

    let mounts = app.mount_queries();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(app.feed.feed(), QueryState::Ready(_)));
    assert!(app.queries.stats().entries > 0);

    drop(mounts);
    app.logout();

    assert!(!app.session.is_authenticated());
    assert!(app.session.snapshot().is_ready());
    assert_eq!(app.queries.stats().entries, 0);
    assert!(matches!(app.feed.feed(), QueryState::Idle));
}

#[tokio::test]
async fn caller_role_is_cached_between_reads() {
    let mock = Arc::new(MockBackend::new());
    let app = authed_app(&mock, "alice");
    let identity = app.session.snapshot();

    let first = app.roles.caller_role(&identity).await.expect("Role read");
    let second = app.roles.caller_role(&identity).await.expect("Role read");

    // Unassigned signed-in callers default to plain users.
    assert_eq!(first, UserRole::User);
    assert_eq!(second, UserRole::User);
    assert_eq!(mock.calls_to("get_caller_user_role"), 1);
}

#[tokio::test]
async fn anonymous_visitors_read_as_guests() {
    let mock = Arc::new(MockBackend::new());
    let app = AppState::new(mock.clone());
    app.session.finish_initializing();

    let role = app
        .roles
        .caller_role(&app.session.snapshot())
        .await
        .expect("Role read");
    assert_eq!(role, UserRole::Guest);
}

#[tokio::test]
async fn role_assignment_invalidates_the_cached_role() {
    let mock = Arc::new(MockBackend::new());
    let alice = Principal::new("alice");
    mock.seed_role(alice.clone(), UserRole::Admin);
    let app = authed_app(&mock, "alice");
    let identity = app.session.snapshot();

    let role = app.roles.caller_role(&identity).await.expect("Role read");
    assert_eq!(role, UserRole::Admin);
    assert_eq!(mock.calls_to("get_caller_user_role"), 1);

    let bob = Principal::new("bob");
    app.roles
        .assign_role(&identity, &bob, UserRole::Admin)
        .await
        .expect("Admins may assign roles");
    assert_eq!(mock.calls_to("assign_caller_user_role"), 1);

    // The cached caller role was invalidated by the write.
    let role = app.roles.caller_role(&identity).await.expect("Role read");
    assert_eq!(role, UserRole::Admin);
    assert_eq!(mock.calls_to("get_caller_user_role"), 2);
}

#[tokio::test]
async fn admin_gate_is_enforced_remotely() {
    let mock = Arc::new(MockBackend::new());
    let app = authed_app(&mock, "alice");
    let identity = app.session.snapshot();

    assert!(!app.roles.is_admin().await.expect("Admin check"));

    let bob = Principal::new("bob");
    let err = app
        .roles
        .assign_role(&identity, &bob, UserRole::Admin)
        .await
        .expect_err("Plain users cannot assign roles");

    match err {
        ClientError::Remote(ApiError::Status { code, .. }) => assert_eq!(code, 403),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn other_profiles_are_fetched_uncached() {
    let mock = Arc::new(MockBackend::new());
    let bob = Principal::new("bob");
    mock.seed_profile(bob.clone(), "bob_b");
    let app = authed_app(&mock, "alice");

    let profile = app.roles.user_profile(&bob).await.expect("Profile read");
    assert_eq!(profile.map(|p| p.username), Some("bob_b".to_string()));

    app.roles.user_profile(&bob).await.expect("Profile read");
    assert_eq!(mock.calls_to("get_user_profile"), 2);
}
