use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use sahyog_types::token::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token, then expose its [`Claims`] to the
/// handler as an `Extension`. Runs before any handler logic.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::MissingToken)?;

    let claims = Claims::decode(token, &state.jwt_secret).map_err(|e| {
        debug!("bearer token rejected: {}", e);
        ApiError::InvalidCredentials
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
