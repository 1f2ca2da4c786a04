use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::AuthzError;

/// The closed role catalog.
///
/// Roles carry no ranking. Whether a role may reach a route or see a row is
/// decided only by membership in route and scope rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Super,
    Admin,
    Management,
    Teacher,
    Student,
    Parent,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Super,
        Role::Admin,
        Role::Management,
        Role::Teacher,
        Role::Student,
        Role::Parent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Super => "super",
            Role::Admin => "admin",
            Role::Management => "management",
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }

    /// Roles exempt from row scoping on every resource type.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Role::Super | Role::Admin | Role::Management)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    /// Exact, case-sensitive match against the catalog.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownRoleClaim(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_catalog_role() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
    }

    #[test]
    fn rejects_unknown_and_differently_cased_names() {
        assert_eq!(
            "janitor".parse::<Role>(),
            Err(AuthzError::UnknownRoleClaim("janitor".to_string()))
        );
        assert!("Admin".parse::<Role>().is_err());
        assert!(" admin".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn only_staff_roles_are_unrestricted() {
        let unrestricted: Vec<Role> = Role::ALL.into_iter().filter(Role::is_unrestricted).collect();
        assert_eq!(unrestricted, vec![Role::Super, Role::Admin, Role::Management]);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Role::Management).unwrap();
        assert_eq!(json, "\"management\"");
        let role: Role = serde_json::from_str("\"parent\"").unwrap();
        assert_eq!(role, Role::Parent);
        assert!(serde_json::from_str::<Role>("\"janitor\"").is_err());
    }

    #[test]
    fn roles_are_compared_by_membership_only() {
        let staff: std::collections::HashSet<Role> = Role::ALL.into_iter().filter(Role::is_unrestricted).collect();
        assert_eq!(staff.len(), 3);
        assert!(staff.contains(&Role::Management));
        assert!(!staff.contains(&Role::Teacher));
        assert_eq!(Role::ALL.map(|role| role.as_str()), ["super", "admin", "management", "teacher", "student", "parent"]);
    }
}
