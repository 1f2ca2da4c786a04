use std::sync::Arc;

use axum::http::Method;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{self, Policy};
use crate::docs;
use crate::errors::AppError;
use crate::events::{self, EventBus};
use crate::jwt::{JwtConfig, SessionVerifier};
use crate::routes::{audit, auth, health, lists, pages};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub policy: Arc<Policy>,
    pub events: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, policy: Policy, events: EventBus) -> Self {
        let jwt = Arc::new(jwt);
        Self {
            pool,
            sessions: jwt.clone(),
            jwt,
            policy: Arc::new(policy),
            events,
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let policy = Policy::from_env()?;
    create_app_with_policy(pool, policy).await
}

pub async fn create_app_with_policy(pool: SqlitePool, policy: Policy) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let (event_bus, event_rx) = events::init_event_bus();
    tokio::spawn(events::start_access_listener(event_rx, pool.clone()));

    let state = AppState::new(pool, jwt_config, policy, event_bus);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/signin", get(auth::sign_in_page).post(auth::sign_in))
        .route("/signout", post(auth::sign_out));

    let list_routes = Router::new()
        .route("/announcements", get(lists::list_announcements))
        .route("/events", get(lists::list_events))
        .route("/lessons", get(lists::list_lessons))
        .route("/fees", get(lists::list_fees));

    let api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/me", get(auth::me))
        .route("/audit", get(audit::list_access_log));

    let mut router = Router::new()
        .route("/", get(pages::home))
        .route("/api-docs/openapi.json", get(docs::openapi_json));

    for area in pages::DASHBOARDS {
        router = router.route(area, get(pages::dashboard));
    }

    let router = router
        .nest("/auth", auth_routes)
        .nest("/list", list_routes)
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(state.clone(), authz::middleware::enforce))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
