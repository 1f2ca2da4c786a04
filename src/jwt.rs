use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};

use crate::authz::{Role, SessionClaims};
use crate::errors::AppError;

pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: Arc<Vec<u8>>,
    pub exp_hours: i64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<Vec<u8>>, exp_hours: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            exp_hours,
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        let secret = std::env::var("JWT_SECRET").map_err(|_| AppError::configuration("JWT_SECRET not set"))?;
        let exp_hours = std::env::var("JWT_EXP_HOURS")
            .map(|val| val.parse::<i64>())
            .unwrap_or(Ok(24))
            .map_err(|_| AppError::configuration("JWT_EXP_HOURS must be a valid integer"))?;

        Ok(Self::new(secret.into_bytes(), exp_hours))
    }

    pub fn encode(&self, user_id: &str, role: Role) -> Result<String, AppError> {
        use chrono::{Duration, Utc};

        let now = Utc::now();
        let exp = now + Duration::hours(self.exp_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.as_str().to_string(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|err| AppError::token(err.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(&self.secret), &validation)
            .map(|data| data.claims)
            .map_err(|err| AppError::token(err.to_string()))
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub iat: usize,
}

impl From<Claims> for SessionClaims {
    fn from(claims: Claims) -> Self {
        SessionClaims {
            sub: Some(claims.sub),
            role: Some(claims.role),
        }
    }
}

/// Raw session material found on a request, before any verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionEvidence {
    pub bearer: Option<String>,
    pub cookie: Option<String>,
}

impl SessionEvidence {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty());

        let cookie = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, token)| token.to_string())
            .filter(|token| !token.is_empty());

        Self { bearer, cookie }
    }

    /// The bearer header wins over the cookie when both are present.
    pub fn token(&self) -> Option<&str> {
        self.bearer.as_deref().or(self.cookie.as_deref())
    }
}

/// Session-management collaborator: turns request evidence into verified
/// claims. Any lookup or cryptography happens here, before the gate runs.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, evidence: &SessionEvidence) -> Option<SessionClaims>;
}

#[async_trait]
impl SessionVerifier for JwtConfig {
    async fn verify(&self, evidence: &SessionEvidence) -> Option<SessionClaims> {
        let token = evidence.token()?;
        match self.decode(token) {
            Ok(claims) => Some(claims.into()),
            Err(err) => {
                tracing::warn!(error = %err, "rejected session token");
                None
            }
        }
    }
}

pub fn session_cookie(token: &str, max_age_hours: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        max_age_hours * 3600
    )
}

pub fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
