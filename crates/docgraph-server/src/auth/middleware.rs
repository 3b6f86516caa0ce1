use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, routes::AppState};

/// Require `Authorization: Bearer <token>` when a token is configured.
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = state.config.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    if token != expected {
        tracing::debug!("rejected request with invalid API token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
