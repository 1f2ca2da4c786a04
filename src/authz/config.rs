use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::AuthzError;
use super::gate::PrivateArea;
use super::resources;
use super::role::Role;
use super::routes::RouteConfig;
use super::scope::{PredicateExpr, ScopeRule};

pub const POLICY_FILE_ENV: &str = "AUTHZ_POLICY_FILE";

fn default_sign_in_path() -> String {
    "/auth/signin".to_string()
}

/// Serialized form of the authorization policy.
///
/// Nothing here is trusted until [`Policy::from_config`](super::Policy::from_config)
/// has validated it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    #[serde(default)]
    pub public: Vec<String>,
    #[serde(default)]
    pub private_areas: Vec<PrivateArea>,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
    #[serde(default)]
    pub scopes: Vec<ScopeRule>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::school()
    }
}

impl PolicyConfig {
    pub fn from_json(json: &str) -> Result<Self, AuthzError> {
        serde_json::from_str(json)
            .map_err(|err| AuthzError::configuration(format!("invalid policy document: {err}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthzError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            AuthzError::configuration(format!("cannot read policy file {}: {err}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn from_env() -> Result<Self, AuthzError> {
        match std::env::var(POLICY_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                tracing::info!(path = %path, "loading authorization policy file");
                Self::from_file(path)
            }
            _ => Ok(Self::school()),
        }
    }

    /// The built-in policy for the school portal.
    pub fn school() -> Self {
        use Role::*;

        const STAFF: [Role; 3] = [Super, Admin, Management];
        let staff_and = |extra: &[Role]| -> Vec<Role> { STAFF.iter().chain(extra).copied().collect() };

        let routes = vec![
            RouteConfig::new("/list/teachers", &staff_and(&[Teacher])),
            RouteConfig::new("/list/students", &staff_and(&[Teacher])),
            RouteConfig::new("/list/parents", &staff_and(&[Teacher])),
            RouteConfig::new("/list/classes", &staff_and(&[Teacher])),
            RouteConfig::new("/list/subjects", &STAFF),
            RouteConfig::new("/list/fees/**", &staff_and(&[Student, Parent])),
            RouteConfig::new("/list/**", &Role::ALL),
            RouteConfig::new("/api/audit/**", &[Super, Admin]),
            RouteConfig::new("/api/**", &Role::ALL),
        ];

        Self {
            sign_in_path: default_sign_in_path(),
            public: [
                "/",
                "/auth/signin",
                "/auth/signout",
                "/auth/callback/**",
                "/api/health",
                "/api-docs/openapi.json",
            ]
            .iter()
            .map(|p| p.to_string())
            .collect(),
            private_areas: vec![
                PrivateArea::new("/super", Super),
                PrivateArea::new("/admin", Admin),
                PrivateArea::new("/management", Management),
                PrivateArea::new("/teacher", Teacher),
                PrivateArea::new("/student", Student),
                PrivateArea::new("/parent", Parent),
            ],
            routes,
            scopes: school_scopes(),
        }
    }
}

fn school_scopes() -> Vec<ScopeRule> {
    let in_taught_class =
        || PredicateExpr::exists("lessons", "class_id", "class_id", PredicateExpr::eq_self("teacher_id"));
    let in_own_class = || PredicateExpr::exists("students", "class_id", "class_id", PredicateExpr::eq_self("id"));
    let in_child_class =
        || PredicateExpr::exists("students", "class_id", "class_id", PredicateExpr::eq_self("parent_id"));
    let school_wide_or = |scoped: PredicateExpr| PredicateExpr::any(vec![PredicateExpr::is_null("class_id"), scoped]);

    let mut rules = Vec::new();
    for resource in [resources::ANNOUNCEMENTS, resources::EVENTS] {
        rules.push(ScopeRule::new(resource, Role::Teacher, school_wide_or(in_taught_class())));
        rules.push(ScopeRule::new(resource, Role::Student, school_wide_or(in_own_class())));
        rules.push(ScopeRule::new(resource, Role::Parent, school_wide_or(in_child_class())));
    }

    rules.push(ScopeRule::new(
        resources::CLASS_SCHEDULES,
        Role::Teacher,
        PredicateExpr::eq_self("teacher_id"),
    ));
    rules.push(ScopeRule::new(resources::CLASS_SCHEDULES, Role::Student, in_own_class()));
    rules.push(ScopeRule::new(resources::CLASS_SCHEDULES, Role::Parent, in_child_class()));

    rules.push(ScopeRule::new(
        resources::FEE_RECORDS,
        Role::Student,
        PredicateExpr::eq_self("student_id"),
    ));
    rules.push(ScopeRule::new(
        resources::FEE_RECORDS,
        Role::Parent,
        PredicateExpr::exists("students", "student_id", "id", PredicateExpr::eq_self("parent_id")),
    ));

    rules
}
