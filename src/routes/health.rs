use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::query_scalar;
use utoipa::ToSchema;

use crate::app::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub db_ok: bool,
    pub db_error: Option<String>,
    /// Number of entries in the loaded route access table
    pub policy_routes: usize,
}

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_check = query_scalar::<_, i64>("SELECT 1").fetch_one(&state.pool).await;
    let policy_routes = state.policy.route_count();

    match db_check {
        Ok(_) => Json(HealthResponse { status: "ok", db_ok: true, db_error: None, policy_routes }),
        Err(e) => Json(HealthResponse {
            status: "degraded",
            db_ok: false,
            db_error: Some(e.to_string()),
            policy_routes,
        }),
    }
}
