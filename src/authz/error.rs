pub type AuthzResult<T> = Result<T, AuthzError>;

/// Failure modes of the authorization layer.
///
/// `Configuration` is fatal and only produced while a policy is loaded. The
/// other variants describe per-request outcomes; the gate returns them as
/// values so the routing layer can pick a redirect or a JSON denial.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sign-in required for {path}")]
    UnauthenticatedAccess { path: String },
    #[error("role {role} may not access {path}")]
    ForbiddenRole { role: String, path: String },
    #[error("unknown role claim: {0:?}")]
    UnknownRoleClaim(String),
}

impl AuthzError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unauthenticated(path: impl Into<String>) -> Self {
        Self::UnauthenticatedAccess { path: path.into() }
    }

    pub fn forbidden(role: impl Into<String>, path: impl Into<String>) -> Self {
        Self::ForbiddenRole {
            role: role.into(),
            path: path.into(),
        }
    }
}
