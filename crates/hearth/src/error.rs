//! Unified error type for Hearth.

use hearth_provider::{AuthError, StoreError};
use hearth_session::SessionError;

/// Top-level error that wraps every crate-specific error.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum HearthError {
    /// The session provider rejected or failed an auth call.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The profile store failed a read or write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session-level action failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_auth_error() {
        let err: HearthError = AuthError::InvalidCredentials.into();
        assert!(matches!(err, HearthError::Auth(AuthError::InvalidCredentials)));
        assert_eq!(err.to_string(), AuthError::InvalidCredentials.to_string());
    }

    #[test]
    fn test_from_store_error() {
        let err: HearthError = StoreError::Unavailable("503".into()).into();
        assert!(matches!(err, HearthError::Store(_)));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_from_session_error() {
        let err: HearthError = SessionError::NotSignedIn.into();
        assert!(matches!(err, HearthError::Session(SessionError::NotSignedIn)));
    }

    #[test]
    fn test_from_serde_error() {
        let err: HearthError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
