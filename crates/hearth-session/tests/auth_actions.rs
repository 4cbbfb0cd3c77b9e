//! Integration tests for sign-in, sign-up, sign-out, and profile edits.

use std::sync::Arc;
use std::time::Duration;

use hearth_provider::{
    AuthError, InMemoryProfileStore, InMemorySessionProvider, ProviderOp,
    StoreError,
};
use hearth_session::{AuthActions, AuthState, SessionConfig, SessionError, SessionStore};
use hearth_types::{Profile, ProfileFields, UserId};
use tokio::sync::watch;

// =========================================================================
// Helpers
// =========================================================================

type Actions = AuthActions<InMemorySessionProvider, InMemoryProfileStore>;

async fn setup() -> (Arc<InMemorySessionProvider>, Arc<InMemoryProfileStore>, Actions) {
    let provider = Arc::new(InMemorySessionProvider::new());
    let profiles = Arc::new(InMemoryProfileStore::new());

    let admin = provider.register_with_id(UserId::new("admin-1"), "admin@example.com", "admin-pw");
    profiles.insert(Profile::new(admin.id).with_role("admin"));

    let store = SessionStore::start(
        Arc::clone(&provider),
        Arc::clone(&profiles),
        SessionConfig::default(),
    )
    .await;
    (provider, profiles, AuthActions::new(store))
}

async fn settle_on(rx: &mut watch::Receiver<AuthState>, user_id: &UserId) -> AuthState {
    tokio::time::timeout(
        Duration::from_secs(1),
        rx.wait_for(|s| s.user_id() == Some(user_id) && !s.loading() && !s.profile_loading()),
    )
    .await
    .expect("state should settle")
    .expect("store should be alive")
    .clone()
}

fn fields(name: &str, phone: &str) -> ProfileFields {
    ProfileFields {
        full_name: Some(name.to_string()),
        phone: Some(phone.to_string()),
    }
}

// =========================================================================
// sign_in()
// =========================================================================

#[tokio::test]
async fn test_sign_in_sets_session_and_loads_admin_profile() {
    let (_, _, actions) = setup().await;
    let admin = UserId::new("admin-1");

    let session = actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    assert_eq!(session.user_id(), &admin);

    // The session is in place as soon as sign_in returns.
    let state = actions.store().state();
    assert_eq!(state.user_id(), Some(&admin));
    assert!(!state.loading());

    let state = settle_on(&mut actions.store().subscribe(), &admin).await;
    assert!(state.is_admin());
}

#[tokio::test]
async fn test_sign_in_does_not_wait_for_profile() {
    let (_, profiles, actions) = setup().await;
    let admin = UserId::new("admin-1");
    let gate = profiles.hold_get(&admin);

    tokio::time::timeout(
        Duration::from_millis(500),
        actions.sign_in("admin@example.com", "admin-pw"),
    )
    .await
    .expect("sign-in must not block on the profile")
    .unwrap();

    let state = actions.store().state();
    assert!(state.profile_loading());
    assert!(!state.is_admin());

    gate.open();
    assert!(settle_on(&mut actions.store().subscribe(), &admin).await.is_admin());
}

#[tokio::test]
async fn test_sign_in_wrong_password_returns_error_and_clears_loading() {
    let (_, _, actions) = setup().await;

    let err = actions.sign_in("admin@example.com", "wrong").await.unwrap_err();

    assert_eq!(err, AuthError::InvalidCredentials);
    let state = actions.store().state();
    assert!(!state.loading());
    assert!(!state.is_authenticated());
}

#[tokio::test]
async fn test_loading_is_true_while_sign_in_outstanding() {
    let (provider, _, actions) = setup().await;
    let gate = provider.hold(ProviderOp::SignIn);
    let mut rx = actions.store().subscribe();

    let pending = {
        let actions = actions.clone();
        tokio::spawn(async move { actions.sign_in("admin@example.com", "admin-pw").await })
    };
    rx.wait_for(AuthState::loading).await.unwrap();

    gate.open();
    pending.await.unwrap().unwrap();
    assert!(!actions.store().state().loading());
}

#[tokio::test]
async fn test_cancelled_sign_in_releases_loading() {
    let (provider, _, actions) = setup().await;
    let _gate = provider.hold(ProviderOp::SignIn);

    let pending = {
        let actions = actions.clone();
        tokio::spawn(async move { actions.sign_in("admin@example.com", "admin-pw").await })
    };
    actions.store().subscribe().wait_for(AuthState::loading).await.unwrap();

    pending.abort();
    let _ = pending.await;
    assert!(!actions.store().state().loading());
}

// =========================================================================
// sign_up()
// =========================================================================

#[tokio::test]
async fn test_sign_up_with_metadata_upserts_profile_row() {
    let (_, profiles, actions) = setup().await;

    let outcome = actions
        .sign_up("new@example.com", "new-password", Some(fields("Nora", "555-0101")))
        .await
        .unwrap();

    let row = profiles.row(&outcome.user.id).expect("row should exist");
    assert_eq!(row.full_name.as_deref(), Some("Nora"));
    assert_eq!(row.phone.as_deref(), Some("555-0101"));
    assert!(row.role.is_none());

    let state = settle_on(&mut actions.store().subscribe(), &outcome.user.id).await;
    assert!(!state.is_admin());
}

#[tokio::test]
async fn test_sign_up_without_metadata_skips_upsert() {
    let (_, profiles, actions) = setup().await;

    actions.sign_up("new@example.com", "new-password", None).await.unwrap();
    actions
        .sign_up("other@example.com", "new-password", Some(ProfileFields::default()))
        .await
        .unwrap();

    assert_eq!(profiles.upsert_calls(), 0);
}

#[tokio::test]
async fn test_sign_up_upsert_failure_does_not_fail_sign_up() {
    let (_, profiles, actions) = setup().await;
    profiles.fail_upserts(StoreError::Rejected("row level security".into()));

    let outcome = actions
        .sign_up("new@example.com", "new-password", Some(fields("Nora", "555-0101")))
        .await
        .expect("sign-up should still succeed");

    assert_eq!(profiles.upsert_calls(), 1);
    assert!(outcome.session.is_some());
    assert_eq!(actions.store().state().user_id(), Some(&outcome.user.id));
}

#[tokio::test]
async fn test_sign_up_duplicate_email_is_typed_error() {
    let (_, profiles, actions) = setup().await;

    let err = actions
        .sign_up("admin@example.com", "whatever1", Some(fields("X", "1")))
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::EmailTaken(_)));
    assert_eq!(profiles.upsert_calls(), 0);
    assert!(!actions.store().state().loading());
}

#[tokio::test]
async fn test_sign_up_requiring_confirmation_stays_signed_out() {
    let (provider, profiles, actions) = setup().await;
    provider.require_confirmation(true);

    let outcome = actions
        .sign_up("new@example.com", "new-password", Some(fields("Nora", "1")))
        .await
        .unwrap();

    assert!(outcome.session.is_none());
    assert!(profiles.row(&outcome.user.id).is_some());
    let state = actions.store().state();
    assert!(!state.is_authenticated());
    assert!(!state.loading());
}

// =========================================================================
// sign_out()
// =========================================================================

#[tokio::test]
async fn test_sign_out_clears_everything() {
    let (_, _, actions) = setup().await;
    let admin = UserId::new("admin-1");
    actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    settle_on(&mut actions.store().subscribe(), &admin).await;

    actions.sign_out().await.unwrap();

    let state = actions.store().state();
    assert!(state.user().is_none());
    assert!(state.session().is_none());
    assert!(state.profile().is_none());
    assert!(!state.is_admin());
    assert!(!state.profile_loading());
    assert_eq!(actions.store().loader().in_flight(), 0);
}

#[tokio::test]
async fn test_sign_out_with_fetch_in_flight_never_repopulates_profile() {
    let (_, profiles, actions) = setup().await;
    let admin = UserId::new("admin-1");
    let gate = profiles.hold_get(&admin);

    actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(actions.store().loader().in_flight(), 1);

    actions.sign_out().await.unwrap();
    assert_eq!(actions.store().loader().in_flight(), 0);

    gate.open();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let state = actions.store().state();
    assert!(!state.is_authenticated());
    assert!(state.profile().is_none());
    assert!(!state.is_admin());
    assert!(!state.profile_loading());
}

#[tokio::test]
async fn test_sign_out_provider_failure_still_clears_local_state() {
    let (provider, _, actions) = setup().await;
    actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    provider.fail(ProviderOp::SignOut, AuthError::Provider("timeout".into()));

    let err = actions.sign_out().await.unwrap_err();

    assert!(matches!(err, AuthError::Provider(_)));
    let state = actions.store().state();
    assert!(!state.is_authenticated());
    assert!(!state.is_admin());
}

// =========================================================================
// update_profile()
// =========================================================================

#[tokio::test]
async fn test_update_profile_requires_sign_in() {
    let (_, _, actions) = setup().await;
    let err = actions.update_profile(fields("A", "1")).await.unwrap_err();
    assert!(matches!(err, SessionError::NotSignedIn));
}

#[tokio::test]
async fn test_update_profile_merges_into_cached_profile() {
    let (_, profiles, actions) = setup().await;
    let admin = UserId::new("admin-1");
    actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    settle_on(&mut actions.store().subscribe(), &admin).await;

    let updated = actions
        .update_profile(ProfileFields {
            full_name: Some("Ada Admin".into()),
            phone: None,
        })
        .await
        .unwrap()
        .expect("profile should be cached");

    assert_eq!(updated.full_name.as_deref(), Some("Ada Admin"));
    assert_eq!(updated.role.as_deref(), Some("admin"));
    assert_eq!(profiles.row(&admin).and_then(|p| p.full_name), Some("Ada Admin".into()));
    assert!(actions.store().state().is_admin());
}

#[tokio::test]
async fn test_update_profile_store_failure_is_returned() {
    let (_, profiles, actions) = setup().await;
    actions.sign_in("admin@example.com", "admin-pw").await.unwrap();
    profiles.fail_upserts(StoreError::Unavailable("down".into()));

    let err = actions.update_profile(fields("A", "1")).await.unwrap_err();
    assert!(matches!(err, SessionError::Store(StoreError::Unavailable(_))));
}
