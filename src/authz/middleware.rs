//! Route-level enforcement point.
//!
//! Runs before every handler: resolves the principal from session evidence,
//! asks the gate for a decision and either forwards the request (with the
//! principal attached) or turns it away.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use super::{Decision, Policy, Principal, RequestPath};
use crate::app::AppState;
use crate::errors::AppError;
use crate::events::{self, AccessEvent, RequestContext};
use crate::jwt::SessionEvidence;

pub async fn enforce(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    let evidence = SessionEvidence::from_headers(req.headers());
    let claims = state.sessions.verify(&evidence).await;
    let principal = super::resolve(claims.as_ref());

    let decision = state.policy.decide(&path, &principal);
    if decision.is_allowed() {
        tracing::debug!(path = %path, role = ?principal.role(), "request allowed");
        req.extensions_mut().insert(principal);
        return next.run(req).await;
    }

    tracing::info!(
        path = %path,
        user_id = ?principal.id(),
        role = ?principal.role(),
        outcome = decision.as_str(),
        "request turned away"
    );

    let context = RequestContext::from_headers(req.headers());
    events::publish(&state.events, AccessEvent::new(&path, &principal, &decision, context));

    reject(&state.policy, &path, &principal, decision)
}

/// `/api` callers get a JSON status; page loads are redirected so a user
/// never lands on a raw error.
fn reject(policy: &Policy, path: &str, principal: &Principal, decision: Decision) -> Response {
    if is_api_path(path) {
        return match decision.denial(path, principal) {
            Some(err) => AppError::from(err).into_response(),
            None => AppError::internal("allowed request reached rejection").into_response(),
        };
    }

    let target = match decision {
        Decision::RedirectTo(target) => target,
        Decision::Deny | Decision::Allow => match principal.role() {
            Some(role) => policy.fallback_for(role).to_string(),
            None => policy.sign_in_path().to_string(),
        },
    };
    Redirect::to(&target).into_response()
}

fn is_api_path(path: &str) -> bool {
    RequestPath::parse(path)
        .segments()
        .first()
        .map(|segment| segment == "api")
        .unwrap_or(false)
}
