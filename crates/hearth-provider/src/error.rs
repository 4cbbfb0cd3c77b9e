//! Error types for the two external collaborators.
//!
//! The split matters for policy: an [`AuthError`] is shown to whoever
//! called `sign_in`/`sign_up`, while a [`StoreError`] is almost always
//! absorbed and degraded to "no profile".

/// Errors reported by the Session Provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Email/password pair was rejected.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// Sign-up attempted with an email that already has an account.
    #[error("an account already exists for {0}")]
    EmailTaken(String),

    /// The provider refused the request for a reason it explained
    /// (weak password, rate limit, disabled sign-ups...).
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered garbage.
    #[error("session provider unavailable: {0}")]
    Provider(String),
}

/// Errors reported by the Profile Store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Transport failure: timeout, connection reset, 5xx.
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    /// The store understood the request and refused it
    /// (row-level security, constraint violation).
    #[error("profile store rejected the request: {0}")]
    Rejected(String),
}
