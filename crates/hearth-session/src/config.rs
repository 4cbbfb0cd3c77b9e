//! Session layer configuration.

use hearth_types::ADMIN_ROLE;
use serde::{Deserialize, Serialize};

/// Configuration for the session store.
///
/// ```rust
/// use hearth_session::SessionConfig;
///
/// let config = SessionConfig::default();
/// assert_eq!(config.admin_role, "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// The profile role that grants back-office access. Compared after
    /// trimming and lowercasing both sides.
    pub admin_role: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            admin_role: ADMIN_ROLE.to_string(),
        }
    }
}
