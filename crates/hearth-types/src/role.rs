//! Role normalization.
//!
//! The Profile Store keeps the role as a free-form text column. Rows
//! written by hand in the back office show up as `"Admin"`, `" admin "`
//! or `"ADMIN"`, so every comparison goes through [`normalize_role`].

/// The role name that grants back-office access, in normalized form.
pub const ADMIN_ROLE: &str = "admin";

/// Trims surrounding whitespace and lowercases a raw role value.
pub fn normalize_role(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Returns `true` if `role` normalizes to `admin_role`.
///
/// A missing role is never an admin. `admin_role` is normalized as well,
/// so a configured `"Admin"` behaves the same as the default.
pub fn is_admin_role(role: Option<&str>, admin_role: &str) -> bool {
    match role {
        Some(raw) => normalize_role(raw) == normalize_role(admin_role),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_role_trims_and_lowercases() {
        assert_eq!(normalize_role("  Admin "), "admin");
        assert_eq!(normalize_role("AGENT"), "agent");
        assert_eq!(normalize_role(""), "");
    }

    #[test]
    fn test_is_admin_role_accepts_case_and_whitespace_variants() {
        for raw in ["Admin", " admin ", "ADMIN", "admin", "\tadmin\n"] {
            assert!(is_admin_role(Some(raw), ADMIN_ROLE), "{raw:?}");
        }
    }

    #[test]
    fn test_is_admin_role_rejects_other_roles_and_none() {
        assert!(!is_admin_role(Some("user"), ADMIN_ROLE));
        assert!(!is_admin_role(Some("administrator"), ADMIN_ROLE));
        assert!(!is_admin_role(Some(""), ADMIN_ROLE));
        assert!(!is_admin_role(None, ADMIN_ROLE));
    }

    #[test]
    fn test_is_admin_role_normalizes_configured_role() {
        assert!(is_admin_role(Some("staff"), " Staff "));
        assert!(!is_admin_role(Some("admin"), "staff"));
    }
}
