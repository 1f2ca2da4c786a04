use axum::Json;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::Components;
use utoipa::{Modify, OpenApi};

use crate::authz::{Principal, Role};
use crate::events::AccessLogEntry;
use crate::models;
use crate::routes::{audit, auth, health, lists, pages};

#[derive(OpenApi)]
#[openapi(
	paths(
		auth::sign_in_page,
		auth::sign_in,
		auth::sign_out,
		auth::me,
		health::health,
		audit::list_access_log,
		lists::list_announcements,
		lists::list_events,
		lists::list_lessons,
		lists::list_fees,
		pages::home,
		pages::dashboard
	),
	components(
		schemas(
			Role,
			Principal,
			AccessLogEntry,
			models::user::User,
			models::user::SignInRequest,
			models::user::SignInResponse,
			models::school::Announcement,
			models::school::Event,
			models::school::Lesson,
			models::school::FeeRecord,
			auth::MessageResponse,
			auth::SignInPage,
			auth::MeResponse,
			health::HealthResponse,
			pages::HomePage,
			pages::DashboardPage,
			pages::VisibleCounts
		)
	),
	modifiers(&SessionSchemes),
	tags(
		(name = "Auth", description = "Sign-in and session endpoints"),
		(name = "Pages", description = "Landing page and role dashboards"),
		(name = "Lists", description = "Row-scoped list pages"),
		(name = "Audit", description = "Access decisions that turned a request away"),
		(name = "Health", description = "Liveness")
	)
)]
pub struct ApiDoc;

/// Sessions travel either as a bearer token or as the `session` cookie.
struct SessionSchemes;

impl Modify for SessionSchemes {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		let components = openapi.components.get_or_insert_with(Components::new);
		components.add_security_scheme(
			"bearerAuth",
			SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).bearer_format("JWT").build()),
		);
		components.add_security_scheme(
			"sessionCookie",
			SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(crate::jwt::SESSION_COOKIE))),
		);
	}
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
	Json(ApiDoc::openapi())
}
