use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;
use crate::errors::AppError;

/// Claims handed over by the session collaborator after it has verified the
/// token. Authenticity is trusted; shape is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Option<String>,
    pub role: Option<String>,
}

impl SessionClaims {
    pub fn new(sub: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            role: Some(role.into()),
        }
    }
}

/// The identity a single request acts as.
///
/// Either fully anonymous or an id paired with a catalog role; an id without
/// a role cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    id: Option<String>,
    role: Option<Role>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self { id: None, role: None }
    }

    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: Some(id.into()),
            role: Some(role),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_authenticated(&self) -> bool {
        self.role.is_some()
    }

    pub fn is_unrestricted(&self) -> bool {
        self.role.map(|role| role.is_unrestricted()).unwrap_or(false)
    }
}

/// How a request's claims were classified before a principal is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    AuthenticatedKnownRole { id: String, role: Role },
    /// A role claim outside the catalog. Handled exactly like `Unauthenticated`.
    AuthenticatedUnknownRole { id: String, claim: String },
}

pub fn classify(claims: Option<&SessionClaims>) -> AuthState {
    let Some(claims) = claims else {
        return AuthState::Unauthenticated;
    };

    let id = match claims.sub.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => return AuthState::Unauthenticated,
    };

    let Some(claim) = claims.role.as_deref() else {
        return AuthState::Unauthenticated;
    };

    match claim.parse::<Role>() {
        Ok(role) => AuthState::AuthenticatedKnownRole { id, role },
        Err(_) => AuthState::AuthenticatedUnknownRole {
            id,
            claim: claim.to_string(),
        },
    }
}

/// Maps verified claims onto a principal, failing closed to anonymous.
pub fn resolve(claims: Option<&SessionClaims>) -> Principal {
    match classify(claims) {
        AuthState::AuthenticatedKnownRole { id, role } => Principal::new(id, role),
        AuthState::AuthenticatedUnknownRole { id, claim } => {
            tracing::warn!(user_id = %id, role = %claim, "unknown role claim, treating as anonymous");
            Principal::anonymous()
        }
        AuthState::Unauthenticated => Principal::anonymous(),
    }
}

/// Handlers receive the principal the authorization middleware resolved.
/// A handler mounted outside the middleware gets a 401 instead of a guess.
#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("request was not authorized"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_claims_resolve_to_anonymous() {
        assert_eq!(resolve(None), Principal::anonymous());
        assert!(!resolve(None).is_authenticated());
    }

    #[test]
    fn known_role_claims_resolve_to_principal() {
        let claims = SessionClaims::new("t1", "teacher");
        let principal = resolve(Some(&claims));
        assert_eq!(principal.id(), Some("t1"));
        assert_eq!(principal.role(), Some(Role::Teacher));
        assert!(!principal.is_unrestricted());
    }

    #[test]
    fn unknown_role_is_never_passed_through() {
        let claims = SessionClaims::new("x1", "janitor");
        assert_eq!(
            classify(Some(&claims)),
            AuthState::AuthenticatedUnknownRole {
                id: "x1".to_string(),
                claim: "janitor".to_string()
            }
        );
        assert_eq!(resolve(Some(&claims)), Principal::anonymous());
    }

    #[test]
    fn partial_claims_fail_closed() {
        let no_role = SessionClaims {
            sub: Some("s1".to_string()),
            role: None,
        };
        let no_sub = SessionClaims {
            sub: None,
            role: Some("admin".to_string()),
        };
        let blank_sub = SessionClaims::new("   ", "admin");

        for claims in [no_role, no_sub, blank_sub] {
            assert_eq!(classify(Some(&claims)), AuthState::Unauthenticated);
            assert_eq!(resolve(Some(&claims)), Principal::anonymous());
        }
    }

    #[test]
    fn staff_principals_are_unrestricted() {
        assert!(Principal::new("a1", Role::Admin).is_unrestricted());
        assert!(Principal::new("m1", Role::Management).is_unrestricted());
        assert!(!Principal::anonymous().is_unrestricted());
    }
}
