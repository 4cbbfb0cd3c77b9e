//! Sign-in, sign-up, sign-out, and profile edits.
//!
//! [`AuthActions`] is the write side of the session layer. Each action
//! talks to a collaborator and then updates the shared
//! [`SessionStore`](crate::SessionStore) state:
//!
//! | action           | `loading` | on success                      | on failure                |
//! |------------------|-----------|---------------------------------|---------------------------|
//! | `sign_in`        | raised    | set session, background profile | `AuthError` to caller     |
//! | `sign_up`        | raised    | upsert metadata, set session    | `AuthError` to caller     |
//! | `sign_out`       | untouched | clear everything                | clear anyway, `AuthError` |
//! | `update_profile` | untouched | merge into cached profile       | `SessionError` to caller  |
//!
//! Neither sign-in nor sign-up waits for the profile: the caller can
//! redirect as soon as the session is set, and the guards hold back
//! privileged views until `profile_loading` clears.

use hearth_provider::{AuthError, ProfileStore, SessionProvider, SignUpOutcome};
use hearth_types::{Profile, ProfileFields, Session};

use crate::{SessionError, SessionStore};

/// Holds one `loading` count for the duration of an auth call and
/// releases it on drop, including when the call's future is cancelled.
struct AuthCallGuard<'a, P: SessionProvider, S: ProfileStore> {
    store: &'a SessionStore<P, S>,
}

impl<'a, P: SessionProvider, S: ProfileStore> AuthCallGuard<'a, P, S> {
    fn begin(store: &'a SessionStore<P, S>) -> Self {
        store.begin_auth_call();
        Self { store }
    }
}

impl<P: SessionProvider, S: ProfileStore> Drop for AuthCallGuard<'_, P, S> {
    fn drop(&mut self) {
        self.store.end_auth_call();
    }
}

/// The authentication actions exposed to the rest of the app.
///
/// Cheap to clone; every clone drives the same [`SessionStore`].
pub struct AuthActions<P: SessionProvider, S: ProfileStore> {
    store: SessionStore<P, S>,
}

impl<P: SessionProvider, S: ProfileStore> Clone for AuthActions<P, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<P: SessionProvider, S: ProfileStore> AuthActions<P, S> {
    pub fn new(store: SessionStore<P, S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &SessionStore<P, S> {
        &self.store
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    /// Returns the provider's [`AuthError`] untouched; the only state
    /// change on failure is `loading` going back to false.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let _loading = AuthCallGuard::begin(&self.store);

        let session = self
            .store
            .provider()
            .sign_in_with_password(email, password)
            .await
            .inspect_err(|e| tracing::info!(error = %e, "sign-in rejected"))?;

        tracing::info!(user_id = %session.user_id(), "signed in");
        self.store.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Creates an account and, when the provider issues a session right
    /// away, signs the new user in.
    ///
    /// If `metadata` carries a name or phone number, it is upserted into
    /// the Profile Store under the new user id before the session is
    /// applied. That upsert is best-effort: a [`StoreError`] is logged
    /// and the sign-up still succeeds.
    ///
    /// [`StoreError`]: hearth_provider::StoreError
    ///
    /// # Errors
    /// Returns the provider's [`AuthError`] (e.g. `EmailTaken`).
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<ProfileFields>,
    ) -> Result<SignUpOutcome, AuthError> {
        let _loading = AuthCallGuard::begin(&self.store);

        let outcome = self
            .store
            .provider()
            .sign_up(email, password, metadata.as_ref())
            .await
            .inspect_err(|e| tracing::info!(error = %e, "sign-up rejected"))?;

        let user_id = &outcome.user.id;
        if let Some(fields) = metadata.filter(|f| !f.is_empty()) {
            match self.store.loader().store().upsert(user_id, &fields).await {
                Ok(()) => tracing::debug!(%user_id, "sign-up profile fields saved"),
                Err(e) => tracing::warn!(
                    %user_id,
                    error = %e,
                    "sign-up profile upsert failed, continuing without it"
                ),
            }
        }

        match &outcome.session {
            Some(session) => {
                tracing::info!(%user_id, "signed up and signed in");
                self.store.set_session(Some(session.clone()));
            }
            None => tracing::info!(%user_id, "signed up, awaiting confirmation"),
        }
        Ok(outcome)
    }

    /// Signs out and wipes every trace of the previous user.
    ///
    /// Local state is cleared even when the provider call fails; the
    /// provider error is still returned.
    ///
    /// # Errors
    /// The provider's [`AuthError`], after local state has been cleared.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let user_id = self.store.state().user_id().cloned();
        let result = self.store.provider().sign_out().await;

        // In-flight fetches are purged here too, so a late one can't
        // repopulate a profile for the user that just left.
        self.store.clear_session();

        match &result {
            Ok(()) => {
                tracing::info!(user_id = ?user_id.as_ref().map(|id| id.as_str()), "signed out")
            }
            Err(e) => tracing::warn!(
                error = %e,
                "provider sign-out failed, local session cleared anyway"
            ),
        }
        result
    }

    /// Updates the signed-in user's contact fields.
    ///
    /// Unlike the sign-up upsert this is an explicit user action, so a
    /// store failure is returned rather than swallowed. On success the
    /// fields are merged into the cached profile, which is returned.
    ///
    /// # Errors
    /// - [`SessionError::NotSignedIn`] if nobody is signed in
    /// - [`SessionError::Store`] if the upsert failed
    pub async fn update_profile(
        &self,
        fields: ProfileFields,
    ) -> Result<Option<Profile>, SessionError> {
        let user_id = self
            .store
            .state()
            .user_id()
            .cloned()
            .ok_or(SessionError::NotSignedIn)?;

        self.store.loader().store().upsert(&user_id, &fields).await?;
        tracing::info!(%user_id, "profile updated");

        match self.store.merge_profile(&user_id, &fields) {
            Some(profile) => Ok(Some(profile)),
            // Nothing cached yet (the row may have just been created).
            None => Ok(self.store.refresh_profile().await),
        }
    }
}
