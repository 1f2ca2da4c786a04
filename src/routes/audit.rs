use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};
use crate::events::{recent_access, AccessLogEntry};

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// Number of entries to return, newest first
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/audit",
    tag = "Audit",
    params(AuditQuery),
    responses(
        (status = 200, description = "Turned-away requests, newest first", body = [AccessLogEntry]),
        (status = 403, description = "Caller is not super or admin")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_access_log(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> AppResult<Json<Vec<AccessLogEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::bad_request(format!("limit must be between 1 and {MAX_LIMIT}")));
    }

    let entries = recent_access(&state.pool, limit).await?;
    Ok(Json(entries))
}
