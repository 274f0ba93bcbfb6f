use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use super::{claims::AuthSubject, session::AuthError};
use crate::{error::AppError, state::AppState};

/// Rejects with 401 unless the request carries a valid session token.
/// On success the subject is available to handlers as `Extension<AuthSubject>`.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = extract_bearer(req.headers())
        .and_then(|token| state.sessions.verify(token))
        .map_err(AppError::from)?;

    tracing::Span::current().record("clerk_user_id", claims.sub.as_str());
    req.extensions_mut().insert(AuthSubject(claims.sub));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::InvalidScheme);
    }
    Ok(token)
}
