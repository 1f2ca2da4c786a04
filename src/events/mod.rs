//! Access audit trail.
//!
//! The authorization middleware publishes an [`AccessEvent`] for every
//! request it turns away. A background listener persists them into
//! `access_log`, chaining each row's hash to the previous one so edits to
//! the trail are detectable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, SqlitePool};
use tokio::sync::broadcast;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Decision, Principal};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    pub id: Uuid,
    pub path: String,
    pub principal_id: Option<String>,
    pub role: Option<String>,
    pub outcome: String,
    pub target: Option<String>,
    pub context: RequestContext,
    pub occurred_at: DateTime<Utc>,
}

impl AccessEvent {
    pub fn new(path: &str, principal: &Principal, decision: &Decision, context: RequestContext) -> Self {
        let target = match decision {
            Decision::RedirectTo(target) => Some(target.clone()),
            Decision::Allow | Decision::Deny => None,
        };

        Self {
            id: Uuid::new_v4(),
            path: path.to_string(),
            principal_id: principal.id().map(str::to_string),
            role: principal.role().map(|role| role.as_str().to_string()),
            outcome: decision.as_str().to_string(),
            target,
            context,
            occurred_at: Utc::now(),
        }
    }
}

pub type EventBus = broadcast::Sender<AccessEvent>;

pub fn init_event_bus() -> (EventBus, broadcast::Receiver<AccessEvent>) {
    broadcast::channel(1024)
}

/// Fire and forget; a missing listener must never fail the request.
pub fn publish(bus: &EventBus, event: AccessEvent) {
    let _ = bus.send(event);
}

/// Request context for the audit trail (IP, User-Agent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                headers
                    .get("x-real-ip")
                    .and_then(|v| v.to_str().ok())
                    .map(String::from)
            });

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        Self { ip, user_agent }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct AccessLogEntry {
    pub id: String,
    pub path: String,
    pub principal_id: Option<String>,
    pub role: Option<String>,
    pub outcome: String,
    pub target: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub hash: String,
}

pub async fn record_access(pool: &SqlitePool, event: &AccessEvent) -> Result<(), sqlx::Error> {
    let prev_hash: Option<String> =
        sqlx::query_scalar("SELECT hash FROM access_log ORDER BY seq DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    let payload = serde_json::to_string(event)
        .map_err(|err| sqlx::Error::Protocol(format!("cannot serialize access event: {err}")))?;
    let mut hasher = Sha256::new();
    if let Some(ref prev) = prev_hash {
        hasher.update(prev.as_bytes());
    }
    hasher.update(payload.as_bytes());
    let hash = hex::encode(hasher.finalize());

    sqlx::query(
        "INSERT INTO access_log (id, path, principal_id, role, outcome, target, ip, user_agent, occurred_at, prev_hash, hash) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(event.id.to_string())
    .bind(&event.path)
    .bind(&event.principal_id)
    .bind(&event.role)
    .bind(&event.outcome)
    .bind(&event.target)
    .bind(&event.context.ip)
    .bind(&event.context.user_agent)
    .bind(event.occurred_at)
    .bind(&prev_hash)
    .bind(&hash)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn recent_access(pool: &SqlitePool, limit: i64) -> Result<Vec<AccessLogEntry>, sqlx::Error> {
    sqlx::query_as::<_, AccessLogEntry>(
        "SELECT id, path, principal_id, role, outcome, target, ip, user_agent, occurred_at, hash \
         FROM access_log ORDER BY seq DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn start_access_listener(mut rx: broadcast::Receiver<AccessEvent>, pool: SqlitePool) {
    tracing::info!("access listener started");
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(err) = record_access(&pool, &event).await {
                    tracing::error!(error = %err, path = %event.path, "failed to save access event");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "access listener fell behind, events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::Role;
    use axum::http::{HeaderMap, HeaderValue};

    #[test]
    fn context_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.9.9.9"));
        headers.insert(axum::http::header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(ctx.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn event_captures_redirect_target() {
        let principal = Principal::new("t1", Role::Teacher);
        let decision = Decision::RedirectTo("/teacher".to_string());
        let event = AccessEvent::new("/admin", &principal, &decision, RequestContext::default());

        assert_eq!(event.outcome, "redirect");
        assert_eq!(event.target.as_deref(), Some("/teacher"));
        assert_eq!(event.role.as_deref(), Some("teacher"));
    }

    #[tokio::test]
    async fn publishing_without_listeners_is_harmless() {
        let (bus, rx) = init_event_bus();
        drop(rx);
        let event = AccessEvent::new("/list/fees", &Principal::anonymous(), &Decision::Deny, RequestContext::default());
        publish(&bus, event);
    }

    #[tokio::test]
    async fn recorded_rows_chain_their_hashes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("audit.db").display());
        let pool = SqlitePool::connect(&url).await?;
        let migrations = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
        sqlx::migrate::Migrator::new(migrations).await?.run(&pool).await?;

        let teacher = Principal::new("t1", Role::Teacher);
        let first = AccessEvent::new("/admin", &teacher, &Decision::RedirectTo("/teacher".to_string()), RequestContext::default());
        let second = AccessEvent::new("/list/fees", &teacher, &Decision::Deny, RequestContext::default());
        record_access(&pool, &first).await?;
        record_access(&pool, &second).await?;

        let rows: Vec<(Option<String>, String)> =
            sqlx::query_as("SELECT prev_hash, hash FROM access_log ORDER BY seq").fetch_all(&pool).await?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, None);
        assert_eq!(rows[1].0.as_deref(), Some(rows[0].1.as_str()));
        assert_eq!(rows[0].1.len(), 64);
        assert_ne!(rows[0].1, rows[1].1);
        Ok(())
    }
}
