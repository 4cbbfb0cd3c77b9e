//! Top-level configuration.

use hearth_guard::GuardConfig;
use hearth_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::HearthError;

/// Everything an embedding app can tune, in one document.
///
/// ```rust
/// use hearth::HearthConfig;
///
/// let config = HearthConfig::from_json(r#"{ "guard": { "home_path": "/listings" } }"#).unwrap();
/// assert_eq!(config.guard.home_path, "/listings");
/// assert_eq!(config.guard.login_path, "/login");
/// assert_eq!(config.session.admin_role, "admin");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HearthConfig {
    pub session: SessionConfig,
    pub guard: GuardConfig,
}

impl HearthConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// [`HearthError::Config`] if the document is not valid JSON or a
    /// field has the wrong type.
    pub fn from_json(json: &str) -> Result<Self, HearthError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_empty_object_is_default() {
        assert_eq!(HearthConfig::from_json("{}").unwrap(), HearthConfig::default());
    }

    #[test]
    fn test_from_json_overrides_admin_role() {
        let config =
            HearthConfig::from_json(r#"{ "session": { "admin_role": "staff" } }"#).unwrap();
        assert_eq!(config.session.admin_role, "staff");
        assert_eq!(config.guard, GuardConfig::default());
    }

    #[test]
    fn test_from_json_wrong_type_is_config_error() {
        let err = HearthConfig::from_json(r#"{ "guard": { "login_path": 7 } }"#).unwrap_err();
        assert!(matches!(err, HearthError::Config(_)));
    }
}
