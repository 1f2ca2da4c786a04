//! Authorization module - route gate and row-scoping policy
//!
//! This module owns the single authoritative policy for the portal:
//! - a closed role catalog
//! - an ordered route access table (first match wins)
//! - role-private dashboard areas that redirect instead of deny
//! - declarative per-resource row scopes that fail closed
//!
//! The policy is validated once at startup and then only read.

mod config;
mod error;
mod gate;
pub mod middleware;
mod path;
mod policy;
mod principal;
mod role;
mod routes;
mod scope;

pub use config::{PolicyConfig, POLICY_FILE_ENV};
pub use error::{AuthzError, AuthzResult};
pub use gate::{Decision, PrivateArea};
pub use path::{PathPattern, RequestPath};
pub use policy::Policy;
pub use principal::{classify, resolve, AuthState, Principal, SessionClaims};
pub use role::Role;
pub use routes::{RouteAccess, RouteConfig, RouteTable};
pub use scope::{is_identifier, Operand, PredicateExpr, ScopeRule, ScopeRules};

/// Resource types that carry row scopes
pub mod resources {
    pub const ANNOUNCEMENTS: &str = "announcements";
    pub const EVENTS: &str = "events";
    pub const CLASS_SCHEDULES: &str = "class_schedules";
    pub const FEE_RECORDS: &str = "fee_records";

    pub const ALL: [&str; 4] = [ANNOUNCEMENTS, EVENTS, CLASS_SCHEDULES, FEE_RECORDS];
}
