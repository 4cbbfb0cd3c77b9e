//! Collaborator contracts for Hearth.
//!
//! Hearth never verifies credentials or stores profile rows itself. It
//! talks to two remote services through the traits defined here:
//!
//! - [`SessionProvider`]: credential verification, session issuance,
//!   and session-change notifications.
//! - [`ProfileStore`]: key-value lookup and update of the role record.
//!
//! A hosted auth backend implements both in production; the in-memory
//! doubles (feature `memory`) stand in for it in tests and demos.
//!
//! # Feature Flags
//!
//! - `memory` (default): [`InMemorySessionProvider`] and
//!   [`InMemoryProfileStore`], with scripted failures and gates.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;

pub use error::{AuthError, StoreError};
#[cfg(feature = "memory")]
pub use memory::{Gate, InMemoryProfileStore, InMemorySessionProvider, ProviderOp};

use std::future::Future;

use hearth_types::{Profile, ProfileFields, Session, SessionChange, User, UserId};
use tokio::sync::mpsc;

/// Result of a successful [`SessionProvider::sign_up`].
///
/// `session` is `None` when the provider requires email confirmation
/// before it will issue a session for the new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

/// A live subscription to session-change notifications.
///
/// Dropping the subscription (or calling [`close`](Self::close))
/// unsubscribes: the provider sees the channel closed and stops sending.
/// Notifications arrive in the order the provider emitted them.
#[derive(Debug)]
pub struct SessionSubscription {
    receiver: mpsc::UnboundedReceiver<SessionChange>,
}

impl SessionSubscription {
    /// Creates a connected sender/subscription pair.
    ///
    /// Provider implementations keep the sender and push every change
    /// into it; a failed send means the subscriber went away.
    pub fn channel() -> (mpsc::UnboundedSender<SessionChange>, Self) {
        let (tx, receiver) = mpsc::unbounded_channel();
        (tx, Self { receiver })
    }

    /// Waits for the next notification. `None` once the provider side
    /// is gone or the subscription was closed and drained.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        self.receiver.recv().await
    }

    /// Unsubscribes without dropping; already-queued changes can still
    /// be drained with [`recv`](Self::recv).
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

/// The remote authentication service.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the provider is shared between the
/// session listener task, background profile loads, and whichever task
/// calls the auth actions. Every returned future is `Send` so those
/// calls can run inside `tokio::spawn`.
pub trait SessionProvider: Send + Sync + 'static {
    /// Returns the session the provider currently considers active,
    /// e.g. one restored from a persisted refresh token.
    fn current_session(&self) -> impl Future<Output = Result<Option<Session>, AuthError>> + Send;

    /// Subscribes to session changes for as long as the returned
    /// subscription lives.
    fn on_session_change(&self) -> SessionSubscription;

    /// Verifies an email/password pair and issues a session.
    ///
    /// # Errors
    /// [`AuthError::InvalidCredentials`] when the pair is rejected.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, AuthError>> + Send;

    /// Creates an account. `metadata` is stored on the provider's user
    /// record; Hearth separately upserts it into the Profile Store.
    ///
    /// # Errors
    /// [`AuthError::EmailTaken`] on a duplicate email.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Option<&ProfileFields>,
    ) -> impl Future<Output = Result<SignUpOutcome, AuthError>> + Send;

    /// Ends the current session on the provider side.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;
}

/// The remote table holding one [`Profile`] per user.
pub trait ProfileStore: Send + Sync + 'static {
    /// Looks up the profile for `user_id`. `Ok(None)` when no row exists.
    ///
    /// # Errors
    /// [`StoreError`] on transport failure; callers in the session layer
    /// treat it the same as a missing row.
    fn get(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Option<Profile>, StoreError>> + Send;

    /// Inserts or merges the contact fields for `user_id`.
    ///
    /// Only fields set in `fields` are written; the role column is never
    /// touched by this call.
    fn upsert(
        &self,
        user_id: &UserId,
        fields: &ProfileFields,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_delivers_in_order() {
        let (tx, mut sub) = SessionSubscription::channel();
        tx.send(SessionChange::signed_out()).unwrap();
        let user = User {
            id: UserId::new("u-1"),
            email: None,
        };
        tx.send(SessionChange::signed_in(Session::new("t", user)))
            .unwrap();

        assert_eq!(sub.recv().await, Some(SessionChange::signed_out()));
        let second = sub.recv().await.unwrap();
        assert_eq!(second.user_id(), Some(&UserId::new("u-1")));
    }

    #[tokio::test]
    async fn test_subscription_close_rejects_new_sends() {
        let (tx, mut sub) = SessionSubscription::channel();
        sub.close();
        assert!(tx.send(SessionChange::signed_out()).is_err());
        assert_eq!(sub.recv().await, None);
    }

    #[test]
    fn test_dropping_subscription_closes_sender() {
        let (tx, sub) = SessionSubscription::channel();
        drop(sub);
        assert!(tx.is_closed());
    }
}
