use serde::{Deserialize, Serialize};

use super::error::AuthzError;
use super::path::{PathPattern, RequestPath};
use super::policy::Policy;
use super::principal::Principal;
use super::role::Role;
use super::routes::RouteAccess;

/// Outcome of the authorization gate for one request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "target", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectTo(String),
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::RedirectTo(_) => "redirect",
            Decision::Deny => "deny",
        }
    }

    /// The taxonomy entry behind a non-allow decision.
    pub fn denial(&self, path: &str, principal: &Principal) -> Option<AuthzError> {
        if self.is_allowed() {
            return None;
        }
        Some(match principal.role() {
            None => AuthzError::unauthenticated(path),
            Some(role) => AuthzError::forbidden(role.as_str(), path),
        })
    }
}

/// A route prefix reserved for exactly one role's own dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateArea {
    pub prefix: String,
    pub role: Role,
}

impl PrivateArea {
    pub fn new(prefix: &str, role: Role) -> Self {
        Self {
            prefix: prefix.to_string(),
            role,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CompiledArea {
    pub(crate) home: String,
    pub(crate) role: Role,
    pub(crate) covers: PathPattern,
}

impl Policy {
    /// Decides whether `principal` may proceed to `path`.
    ///
    /// 1. public paths are allowed for everyone;
    /// 2. anonymous principals are sent to sign-in;
    /// 3. a private area admits only its owner and sends anyone else to their
    ///    own area (or sign-in when they have none), ahead of the route table;
    /// 4. otherwise the first matching route table entry decides.
    pub fn decide(&self, path: &str, principal: &Principal) -> Decision {
        let request = RequestPath::parse(path);

        if self.is_public(&request) {
            return Decision::Allow;
        }

        let Some(role) = principal.role() else {
            return Decision::RedirectTo(self.sign_in_path().to_string());
        };

        if let Some(area) = self.areas.iter().find(|area| area.covers.matches(&request)) {
            if area.role == role {
                return Decision::Allow;
            }
            tracing::debug!(path = %request, role = %role, area = %area.home, "private area owned by another role");
            return Decision::RedirectTo(self.fallback_for(role).to_string());
        }

        match self.routes.lookup(&request) {
            RouteAccess::Universal => Decision::Allow,
            access if access.permits(role) => Decision::Allow,
            RouteAccess::Restricted { pattern, .. } => {
                tracing::debug!(path = %request, role = %role, pattern, "role not in route access set");
                Decision::Deny
            }
        }
    }

    /// Where a signed-in principal lands after being turned away.
    pub fn fallback_for(&self, role: Role) -> &str {
        self.home_for(role).unwrap_or(self.sign_in_path())
    }
}
