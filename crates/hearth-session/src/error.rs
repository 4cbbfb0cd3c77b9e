//! Error types for the session layer.

use hearth_provider::{AuthError, StoreError};

/// Errors returned by session operations that are not plain
/// sign-in/sign-up calls (those return [`AuthError`] directly).
///
/// Background work never produces one of these: profile loads absorb
/// their [`StoreError`]s and degrade to "no profile".
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The Session Provider rejected or failed the request.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The Profile Store failed an explicit, user-initiated write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The operation needs a signed-in user and there is none.
    #[error("no user is signed in")]
    NotSignedIn,
}
