use axum::{
    Router,
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::Value;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    routes::common::{Payload, message_response},
    session::{SESSION_COOKIE, cookie_value},
    state::AppState,
};

// POST /jwt
async fn issue_token(
    State(state): State<AppState>,
    Payload(claims): Payload<Value>,
) -> AppResult<Response> {
    let Value::Object(claims) = claims else {
        return Err(AppError::Validation(
            "token claims must be a JSON object".to_string(),
        ));
    };

    let token = state.sessions.issue(claims)?;
    let cookie = state.sessions.session_cookie(&token);
    Ok(([(SET_COOKIE, cookie)], message_response("JWT token issued")).into_response())
}

// POST /logout
async fn logout(State(state): State<AppState>) -> Response {
    let cookie = state.sessions.cleared_cookie();
    ([(SET_COOKIE, cookie)], message_response("Logged out successfully")).into_response()
}

/// Gate for session-only routes: 401 without a cookie, 403 when the token
/// does not verify. Decoded claims land in the request extensions.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let token = cookie_value(req.headers(), SESSION_COOKIE)
        .map(str::to_owned)
        .ok_or(AppError::Unauthorized)?;

    let claims = state.sessions.verify(&token).map_err(|e| {
        debug!(error = %e, "session token rejected");
        AppError::Forbidden
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

pub fn auth_router(state: AppState) -> Router {
    Router::new()
        .route("/jwt", post(issue_token))
        .route("/logout", post(logout))
        .with_state(state)
}
