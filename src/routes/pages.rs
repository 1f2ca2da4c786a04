use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::Principal;
use crate::db::count_visible;
use crate::errors::AppResult;
use crate::models::school::{Announcement, Event, FeeRecord, Lesson};

/// Dashboard paths served by [`dashboard`]. Each is a private area in the
/// built-in policy, so the gate has already checked ownership.
pub const DASHBOARDS: [&str; 6] = ["/super", "/admin", "/management", "/teacher", "/student", "/parent"];

#[derive(Debug, Serialize, ToSchema)]
pub struct HomePage {
    pub signed_in: bool,
    pub dashboard: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VisibleCounts {
    pub announcements: i64,
    pub events: i64,
    pub class_schedules: i64,
    pub fee_records: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardPage {
    pub area: String,
    pub principal: Principal,
    pub visible: VisibleCounts,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Pages",
    responses((status = 200, description = "Public landing page", body = HomePage))
)]
pub async fn home(State(state): State<AppState>, principal: Principal) -> Json<HomePage> {
    let dashboard = principal
        .role()
        .and_then(|role| state.policy.home_for(role))
        .map(str::to_string);

    Json(HomePage {
        signed_in: principal.is_authenticated(),
        dashboard,
    })
}

#[utoipa::path(
    get,
    path = "/{area}",
    tag = "Pages",
    params(("area" = String, Path, description = "Role dashboard: super, admin, management, teacher, student or parent")),
    responses(
        (status = 200, description = "Role dashboard", body = DashboardPage),
        (status = 303, description = "Redirect to the caller's own dashboard or sign-in")
    )
)]
pub async fn dashboard(State(state): State<AppState>, principal: Principal, uri: Uri) -> AppResult<Json<DashboardPage>> {
    let (pool, policy) = (&state.pool, state.policy.as_ref());

    let visible = VisibleCounts {
        announcements: count_visible::<Announcement>(pool, policy, &principal).await?,
        events: count_visible::<Event>(pool, policy, &principal).await?,
        class_schedules: count_visible::<Lesson>(pool, policy, &principal).await?,
        fee_records: count_visible::<FeeRecord>(pool, policy, &principal).await?,
    };

    Ok(Json(DashboardPage {
        area: uri.path().to_string(),
        principal,
        visible,
    }))
}
