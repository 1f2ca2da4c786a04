use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::error::AuthzError;
use super::path::{PathPattern, RequestPath};
use super::role::Role;

/// One entry of the route access table as it appears in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub pattern: String,
    pub roles: Vec<Role>,
}

impl RouteConfig {
    pub fn new(pattern: &str, roles: &[Role]) -> Self {
        Self {
            pattern: pattern.to_string(),
            roles: roles.to_vec(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pattern: PathPattern,
    roles: HashSet<Role>,
}

/// Result of a route table lookup.
///
/// `Universal` is the explicit answer for a path no pattern claims. A caller
/// that has not evaluated a path yet holds no `RouteAccess` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess<'a> {
    Restricted {
        pattern: &'a str,
        roles: &'a HashSet<Role>,
    },
    Universal,
}

impl RouteAccess<'_> {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            RouteAccess::Restricted { roles, .. } => roles.contains(&role),
            RouteAccess::Universal => true,
        }
    }
}

/// Ordered route access table. The first matching pattern wins; later
/// patterns are never consulted for that path, even if they also match.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn from_config(entries: &[RouteConfig]) -> Result<Self, AuthzError> {
        let mut rules: Vec<RouteRule> = Vec::with_capacity(entries.len());
        for entry in entries {
            let pattern: PathPattern = entry.pattern.parse()?;
            if entry.roles.is_empty() {
                return Err(AuthzError::configuration(format!(
                    "route {:?} allows no roles and can never be reached",
                    entry.pattern
                )));
            }
            if rules.iter().any(|rule| rule.pattern == pattern) {
                return Err(AuthzError::configuration(format!(
                    "route {:?} is listed twice; the second entry is dead",
                    entry.pattern
                )));
            }
            rules.push(RouteRule {
                pattern,
                roles: entry.roles.iter().copied().collect(),
            });
        }
        Ok(Self { rules })
    }

    pub fn lookup(&self, path: &RequestPath) -> RouteAccess<'_> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| RouteAccess::Restricted {
                pattern: rule.pattern.as_str(),
                roles: &rule.roles,
            })
            .unwrap_or(RouteAccess::Universal)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[RouteConfig]) -> RouteTable {
        RouteTable::from_config(entries).unwrap()
    }

    #[test]
    fn first_matching_pattern_wins() {
        let table = table(&[
            RouteConfig::new("/list/fees/**", &[Role::Admin, Role::Parent]),
            RouteConfig::new("/list/**", &[Role::Admin, Role::Teacher, Role::Parent]),
        ]);

        let fees = table.lookup(&RequestPath::parse("/list/fees"));
        assert!(!fees.permits(Role::Teacher));
        assert!(fees.permits(Role::Parent));
        assert!(matches!(fees, RouteAccess::Restricted { pattern: "/list/fees/**", .. }));

        let events = table.lookup(&RequestPath::parse("/list/events"));
        assert!(events.permits(Role::Teacher));
    }

    #[test]
    fn order_changes_the_outcome_for_overlapping_patterns() {
        let broad_first = table(&[
            RouteConfig::new("/list/**", &[Role::Teacher]),
            RouteConfig::new("/list/fees", &[Role::Parent]),
        ]);
        let fees = broad_first.lookup(&RequestPath::parse("/list/fees"));
        assert!(fees.permits(Role::Teacher));
        assert!(!fees.permits(Role::Parent));
    }

    #[test]
    fn unmatched_paths_are_universal() {
        let table = table(&[RouteConfig::new("/list/**", &[Role::Admin])]);
        let access = table.lookup(&RequestPath::parse("/about"));
        assert_eq!(access, RouteAccess::Universal);
        assert!(Role::ALL.iter().all(|role| access.permits(*role)));
    }

    #[test]
    fn empty_role_set_is_a_configuration_error() {
        let err = RouteTable::from_config(&[RouteConfig::new("/list/subjects", &[])]).unwrap_err();
        assert!(matches!(err, AuthzError::Configuration(msg) if msg.contains("/list/subjects")));
    }

    #[test]
    fn duplicate_patterns_are_rejected() {
        let result = RouteTable::from_config(&[
            RouteConfig::new("/list/classes", &[Role::Admin]),
            RouteConfig::new("/list/classes", &[Role::Teacher]),
        ]);
        assert!(matches!(result, Err(AuthzError::Configuration(_))));
    }
}
