//! Authentication and authorization tests
//!
//! Role parsing, credential validation rules, and the role-to-operation
//! permission map.

use proptest::prelude::*;
use std::str::FromStr;

use shared::models::UserRole;
use shared::validation::{validate_email, validate_password};

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate valid email addresses
fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z]{5,10}@[a-z]{3,8}\\.(com|org|net)"
}

/// Generate valid passwords (8+ chars)
fn password_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9!@#$%]{8,20}"
}

fn role_strategy() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Admin),
        Just(UserRole::Supervisor),
        Just(UserRole::Operator),
    ]
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    #[test]
    fn role_strings_round_trip() {
        for role in [UserRole::Admin, UserRole::Supervisor, UserRole::Operator] {
            assert_eq!(UserRole::from_str(role.as_str()), Ok(role));
        }
    }

    #[test]
    fn unknown_role_string_is_rejected() {
        assert!(UserRole::from_str("superuser").is_err());
        assert!(UserRole::from_str("").is_err());
        assert!(UserRole::from_str("Admin").is_err());
    }

    #[test]
    fn password_rules_enforce_minimum_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[test]
    fn email_rules_reject_malformed_addresses() {
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("user@example.com").is_ok());
    }

    /// Sales are open to every role; restock, transfer and adjustment need
    /// a supervisor or admin; ledger deletion and user administration are
    /// admin-only
    #[test]
    fn permission_map_by_operation() {
        let sale_roles = [UserRole::Admin, UserRole::Supervisor, UserRole::Operator];
        let restock_roles = [UserRole::Admin, UserRole::Supervisor];
        let delete_roles = [UserRole::Admin];
        let user_admin_roles = [UserRole::Admin];

        assert!(sale_roles.contains(&UserRole::Operator));
        assert!(!restock_roles.contains(&UserRole::Operator));
        assert!(!delete_roles.contains(&UserRole::Supervisor));
        assert!(delete_roles.contains(&UserRole::Admin));
        assert!(!user_admin_roles.contains(&UserRole::Supervisor));
        assert!(!user_admin_roles.contains(&UserRole::Operator));
    }

    /// Role-change requests carry the role in snake_case on the wire
    #[test]
    fn role_json_wire_format_round_trips() {
        for (role, wire) in [
            (UserRole::Admin, "\"admin\""),
            (UserRole::Supervisor, "\"supervisor\""),
            (UserRole::Operator, "\"operator\""),
        ] {
            assert_eq!(serde_json::to_string(&role).unwrap(), wire);
            assert_eq!(serde_json::from_str::<UserRole>(wire).unwrap(), role);
        }
        assert!(serde_json::from_str::<UserRole>("\"Admin\"").is_err());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// Generated emails always pass validation
    #[test]
    fn generated_emails_validate(email in email_strategy()) {
        prop_assert!(validate_email(&email).is_ok());
    }

    /// Generated passwords always pass validation
    #[test]
    fn generated_passwords_validate(password in password_strategy()) {
        prop_assert!(password.len() >= 8);
        prop_assert!(validate_password(&password).is_ok());
    }

    /// Every role serializes to a string that parses back to itself
    #[test]
    fn role_serialization_round_trips(role in role_strategy()) {
        prop_assert_eq!(UserRole::from_str(role.as_str()), Ok(role));
    }
}
