use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::Principal;
use crate::errors::{AppError, AppResult};
use crate::jwt::{expired_session_cookie, session_cookie};
use crate::models::user::{DbUser, SignInRequest, SignInResponse, User};
use crate::utils::verify_password;

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignInPage {
    pub message: String,
    pub action: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub principal: Principal,
    pub user: Option<User>,
}

#[utoipa::path(
    get,
    path = "/auth/signin",
    tag = "Auth",
    responses((status = 200, description = "Sign-in landing", body = SignInPage))
)]
pub async fn sign_in_page(State(state): State<AppState>) -> Json<SignInPage> {
    Json(SignInPage {
        message: "sign in to continue".to_string(),
        action: state.policy.sign_in_path().to_string(),
    })
}

#[utoipa::path(
    post,
    path = "/auth/signin",
    tag = "Auth",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> AppResult<impl IntoResponse> {
    let db_user = fetch_user_by_username(&state.pool, &payload.username)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &db_user.password_hash) {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let user: User = db_user.try_into()?;
    let token = state.jwt.encode(&user.id, user.role)?;
    let redirect_to = state.policy.home_for(user.role).unwrap_or("/").to_string();
    tracing::info!(user_id = %user.id, role = %user.role, "signed in");

    let cookie = session_cookie(&token, state.jwt.exp_hours);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(SignInResponse {
            token,
            user,
            redirect_to,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/auth/signout",
    tag = "Auth",
    responses((status = 200, description = "Session cleared", body = MessageResponse))
)]
pub async fn sign_out() -> impl IntoResponse {
    (
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, expired_session_cookie())]),
        Json(MessageResponse {
            message: "signed out".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Not signed in")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, principal: Principal) -> AppResult<Json<MeResponse>> {
    let user = match principal.id() {
        Some(id) => fetch_user_by_id(&state.pool, id)
            .await?
            .map(User::try_from)
            .transpose()?,
        None => None,
    };

    Ok(Json(MeResponse { principal, user }))
}

async fn fetch_user_by_username(pool: &SqlitePool, username: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

async fn fetch_user_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, password_hash, role, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
