//! In-memory collaborators for tests, demos, and local development.
//!
//! Both types behave like the hosted services they stand in for (sign-in
//! emits a `SignedIn` change, sign-out emits `SignedOut`, upserts merge)
//! and add the knobs a test needs to reproduce races:
//!
//! - **Gates** ([`Gate`]) hold a call pending until the test opens them.
//! - **Failures** make a call return a scripted error.
//! - **Counters** record how many times each call was made.
//!
//! Locks here are `std::sync::Mutex` held only for short synchronous
//! sections, never across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hearth_types::{Profile, ProfileFields, Session, SessionChange, User, UserId};
use rand::Rng;
use tokio::sync::{mpsc, watch};

use crate::{
    AuthError, ProfileStore, SessionProvider, SessionSubscription, SignUpOutcome, StoreError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Generates a random 32-character hex access token.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// A one-way latch that holds calls pending until opened.
///
/// Cheap to clone; every clone observes the same open/closed state.
#[derive(Debug, Clone)]
pub struct Gate {
    open: Arc<watch::Sender<bool>>,
}

impl Gate {
    fn closed() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { open: Arc::new(tx) }
    }

    /// Opens the gate, releasing every waiting and future call.
    pub fn open(&self) {
        self.open.send_replace(true);
    }

    pub fn is_open(&self) -> bool {
        *self.open.borrow()
    }

    async fn wait(&self) {
        let mut rx = self.open.subscribe();
        // The sender lives in `self`, so this only returns once opened.
        let _ = rx.wait_for(|open| *open).await;
    }
}

// ---------------------------------------------------------------------------
// InMemorySessionProvider
// ---------------------------------------------------------------------------

/// Identifies a [`SessionProvider`] call for gating, failures, and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderOp {
    CurrentSession,
    SignIn,
    SignUp,
    SignOut,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

/// A [`SessionProvider`] backed by a hash map of accounts.
#[derive(Debug, Default)]
pub struct InMemorySessionProvider {
    /// Accounts keyed by lowercase email.
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<SessionChange>>>,
    gates: Mutex<HashMap<ProviderOp, Gate>>,
    failures: Mutex<HashMap<ProviderOp, AuthError>>,
    calls: Mutex<HashMap<ProviderOp, usize>>,
    require_confirmation: AtomicBool,
    next_user: AtomicU64,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account with a generated id (`user-1`, `user-2`, ...).
    pub fn register(&self, email: &str, password: &str) -> User {
        let n = self.next_user.fetch_add(1, Ordering::Relaxed) + 1;
        self.register_with_id(UserId::new(format!("user-{n}")), email, password)
    }

    /// Registers an account under a caller-chosen id.
    pub fn register_with_id(&self, id: UserId, email: &str, password: &str) -> User {
        let user = User {
            id,
            email: Some(email.to_string()),
        };
        lock(&self.accounts).insert(
            email.to_lowercase(),
            Account {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    /// Issues a fresh session for `user` without touching provider state.
    pub fn issue_session(&self, user: &User) -> Session {
        Session::new(generate_token(), user.clone())
    }

    /// Sets the active session silently, as if restored from storage
    /// before anyone subscribed.
    pub fn restore(&self, session: Option<Session>) {
        *lock(&self.current) = session;
    }

    /// Makes the provider's active session follow `change` and notifies
    /// every live subscriber, pruning the ones that went away.
    pub fn emit(&self, change: SessionChange) {
        *lock(&self.current) = change.session.clone();
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        tracing::debug!(
            kind = %change.kind,
            subscribers = subscribers.len(),
            "session change emitted"
        );
    }

    /// Number of subscriptions that are still open.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }

    /// When set, `sign_up` creates the account but returns no session.
    pub fn require_confirmation(&self, required: bool) {
        self.require_confirmation.store(required, Ordering::Relaxed);
    }

    /// Installs a closed gate on `op` and returns it. Calls to `op` wait
    /// (after being counted) until the gate is opened.
    pub fn hold(&self, op: ProviderOp) -> Gate {
        let gate = Gate::closed();
        lock(&self.gates).insert(op, gate.clone());
        gate
    }

    /// Makes every subsequent `op` call fail with `error`.
    pub fn fail(&self, op: ProviderOp, error: AuthError) {
        lock(&self.failures).insert(op, error);
    }

    /// Clears a failure installed with [`fail`](Self::fail).
    pub fn recover(&self, op: ProviderOp) {
        lock(&self.failures).remove(&op);
    }

    /// How many times `op` has been called.
    pub fn calls(&self, op: ProviderOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    /// Counts the call, waits on its gate, then applies any scripted failure.
    async fn enter(&self, op: ProviderOp) -> Result<(), AuthError> {
        *lock(&self.calls).entry(op).or_insert(0) += 1;
        let gate = lock(&self.gates).get(&op).cloned();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        match lock(&self.failures).get(&op).cloned() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl SessionProvider for InMemorySessionProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        self.enter(ProviderOp::CurrentSession).await?;
        Ok(lock(&self.current).clone())
    }

    fn on_session_change(&self) -> SessionSubscription {
        let (tx, subscription) = SessionSubscription::channel();
        lock(&self.subscribers).push(tx);
        subscription
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        self.enter(ProviderOp::SignIn).await?;

        let account = lock(&self.accounts).get(&email.to_lowercase()).cloned();
        let account = match account {
            Some(account) if account.password == password => account,
            _ => return Err(AuthError::InvalidCredentials),
        };

        let session = self.issue_session(&account.user);
        self.emit(SessionChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _metadata: Option<&ProfileFields>,
    ) -> Result<SignUpOutcome, AuthError> {
        self.enter(ProviderOp::SignUp).await?;

        if lock(&self.accounts).contains_key(&email.to_lowercase()) {
            return Err(AuthError::EmailTaken(email.to_string()));
        }
        if password.len() < 6 {
            return Err(AuthError::Rejected(
                "password must be at least 6 characters".into(),
            ));
        }

        let user = self.register(email, password);
        if self.require_confirmation.load(Ordering::Relaxed) {
            return Ok(SignUpOutcome {
                user,
                session: None,
            });
        }

        let session = self.issue_session(&user);
        self.emit(SessionChange::signed_in(session.clone()));
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.enter(ProviderOp::SignOut).await?;
        self.emit(SessionChange::signed_out());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryProfileStore
// ---------------------------------------------------------------------------

/// A [`ProfileStore`] backed by a hash map of rows.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    rows: Mutex<HashMap<UserId, Profile>>,
    get_gates: Mutex<HashMap<UserId, Gate>>,
    get_calls: Mutex<HashMap<UserId, usize>>,
    upsert_calls: AtomicUsize,
    get_failure: Mutex<Option<StoreError>>,
    upsert_failure: Mutex<Option<StoreError>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a row.
    pub fn insert(&self, profile: Profile) {
        lock(&self.rows).insert(profile.id.clone(), profile);
    }

    /// Reads a row directly, bypassing counters and gates.
    pub fn row(&self, user_id: &UserId) -> Option<Profile> {
        lock(&self.rows).get(user_id).cloned()
    }

    /// Holds `get` calls for `user_id` pending until the gate opens.
    pub fn hold_get(&self, user_id: &UserId) -> Gate {
        let gate = Gate::closed();
        lock(&self.get_gates).insert(user_id.clone(), gate.clone());
        gate
    }

    /// Makes every subsequent `get` fail with `error`.
    pub fn fail_gets(&self, error: StoreError) {
        *lock(&self.get_failure) = Some(error);
    }

    pub fn recover_gets(&self) {
        *lock(&self.get_failure) = None;
    }

    /// Makes every subsequent `upsert` fail with `error`.
    pub fn fail_upserts(&self, error: StoreError) {
        *lock(&self.upsert_failure) = Some(error);
    }

    /// Number of `get` calls made for `user_id`.
    pub fn get_calls(&self, user_id: &UserId) -> usize {
        lock(&self.get_calls).get(user_id).copied().unwrap_or(0)
    }

    /// Number of `get` calls across all ids.
    pub fn total_get_calls(&self) -> usize {
        lock(&self.get_calls).values().sum()
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::Relaxed)
    }
}

impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &UserId) -> Result<Option<Profile>, StoreError> {
        *lock(&self.get_calls).entry(user_id.clone()).or_insert(0) += 1;
        let gate = lock(&self.get_gates).get(user_id).cloned();
        if let Some(gate) = gate {
            gate.wait().await;
        }
        if let Some(err) = lock(&self.get_failure).clone() {
            return Err(err);
        }
        Ok(lock(&self.rows).get(user_id).cloned())
    }

    async fn upsert(&self, user_id: &UserId, fields: &ProfileFields) -> Result<(), StoreError> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = lock(&self.upsert_failure).clone() {
            return Err(err);
        }
        lock(&self.rows)
            .entry(user_id.clone())
            .or_insert_with(|| Profile::new(user_id.clone()))
            .merge(fields);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hearth_types::SessionChangeKind;

    use super::*;

    #[test]
    fn test_generate_token_is_32_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_sign_in_with_valid_credentials_emits_signed_in() {
        let provider = InMemorySessionProvider::new();
        let user = provider.register("ada@example.com", "hunter22");
        let mut sub = provider.on_session_change();

        let session = provider
            .sign_in_with_password("ADA@example.com", "hunter22")
            .await
            .unwrap();

        assert_eq!(session.user, user);
        let change = sub.recv().await.unwrap();
        assert_eq!(change.kind, SessionChangeKind::SignedIn);
        assert_eq!(provider.current_session().await.unwrap(), Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_with_wrong_password_is_invalid_credentials() {
        let provider = InMemorySessionProvider::new();
        provider.register("ada@example.com", "hunter22");

        let err = provider
            .sign_in_with_password("ada@example.com", "nope")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(provider.calls(ProviderOp::SignIn), 1);
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email_is_rejected() {
        let provider = InMemorySessionProvider::new();
        provider.register("ada@example.com", "hunter22");

        let err = provider
            .sign_up("ada@example.com", "another1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn test_sign_up_with_confirmation_returns_no_session() {
        let provider = InMemorySessionProvider::new();
        provider.require_confirmation(true);

        let outcome = provider
            .sign_up("new@example.com", "longenough", None)
            .await
            .unwrap();
        assert!(outcome.session.is_none());
        assert_eq!(provider.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_gate_holds_call_until_opened() {
        let provider = Arc::new(InMemorySessionProvider::new());
        let gate = provider.hold(ProviderOp::SignOut);

        let task = {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.sign_out().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!task.is_finished());
        assert_eq!(provider.calls(ProviderOp::SignOut), 1);

        gate.open();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let provider = InMemorySessionProvider::new();
        let keep = provider.on_session_change();
        let gone = provider.on_session_change();
        drop(gone);

        assert_eq!(provider.subscriber_count(), 1);
        drop(keep);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_profile_store_failure_and_counters() {
        let store = InMemoryProfileStore::new();
        let id = UserId::new("u-1");
        store.insert(Profile::new(id.clone()).with_role("admin"));

        assert!(store.get(&id).await.unwrap().is_some());
        store.fail_gets(StoreError::Unavailable("timeout".into()));
        assert!(store.get(&id).await.is_err());
        store.recover_gets();
        assert!(store.get(&id).await.is_ok());
        assert_eq!(store.get_calls(&id), 3);
    }

    #[tokio::test]
    async fn test_profile_store_upsert_preserves_role() {
        let store = InMemoryProfileStore::new();
        let id = UserId::new("u-1");
        store.insert(Profile::new(id.clone()).with_role("admin"));

        store
            .upsert(
                &id,
                &ProfileFields {
                    full_name: Some("Ada".into()),
                    phone: None,
                },
            )
            .await
            .unwrap();

        let row = store.row(&id).unwrap();
        assert_eq!(row.role.as_deref(), Some("admin"));
        assert_eq!(row.full_name.as_deref(), Some("Ada"));
    }
}
