//! List page loaders for the scoped resources.
//!
//! None of these build their own role conditionals; each one reads through
//! [`fetch_visible`], which applies the policy's row scope.

use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::Principal;
use crate::db::fetch_visible;
use crate::errors::AppResult;
use crate::models::school::{Announcement, Event, FeeRecord, Lesson};

#[utoipa::path(
    get,
    path = "/list/announcements",
    tag = "Lists",
    responses((status = 200, description = "Announcements visible to the caller", body = [Announcement]))
)]
pub async fn list_announcements(
    State(state): State<AppState>,
    principal: Principal,
) -> AppResult<Json<Vec<Announcement>>> {
    let rows = fetch_visible::<Announcement>(&state.pool, &state.policy, &principal).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/list/events",
    tag = "Lists",
    responses((status = 200, description = "Events visible to the caller", body = [Event]))
)]
pub async fn list_events(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Event>>> {
    let rows = fetch_visible::<Event>(&state.pool, &state.policy, &principal).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/list/lessons",
    tag = "Lists",
    responses((status = 200, description = "Class schedule entries visible to the caller", body = [Lesson]))
)]
pub async fn list_lessons(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<Lesson>>> {
    let rows = fetch_visible::<Lesson>(&state.pool, &state.policy, &principal).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/list/fees",
    tag = "Lists",
    responses(
        (status = 200, description = "Fee records visible to the caller", body = [FeeRecord]),
        (status = 303, description = "Role may not open the fee list")
    )
)]
pub async fn list_fees(State(state): State<AppState>, principal: Principal) -> AppResult<Json<Vec<FeeRecord>>> {
    let rows = fetch_visible::<FeeRecord>(&state.pool, &state.policy, &principal).await?;
    Ok(Json(rows))
}
