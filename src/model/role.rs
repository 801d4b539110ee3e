use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

/// Closed role set. Stored as the MySQL ENUM value matching the variant
/// name, carried verbatim in JWT claims.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, sqlx::Type, ToSchema,
)]
pub enum Role {
    Admin,
    Manager,
    Employee,
}

impl Role {
    pub fn is_any_of(&self, allowed: &[Role]) -> bool {
        allowed.contains(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_exact_names_only() {
        assert_eq!(Role::from_str("Admin").unwrap(), Role::Admin);
        assert_eq!(Role::from_str("Manager").unwrap(), Role::Manager);
        assert_eq!(Role::from_str("Employee").unwrap(), Role::Employee);
        assert!(Role::from_str("admin").is_err());
        assert!(Role::from_str("SuperUser").is_err());
    }

    #[test]
    fn display_round_trips() {
        for role in [Role::Admin, Role::Manager, Role::Employee] {
            assert_eq!(Role::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn membership_check() {
        let admin_or_manager = [Role::Admin, Role::Manager];
        assert!(Role::Admin.is_any_of(&admin_or_manager));
        assert!(Role::Manager.is_any_of(&admin_or_manager));
        assert!(!Role::Employee.is_any_of(&admin_or_manager));
    }
}
