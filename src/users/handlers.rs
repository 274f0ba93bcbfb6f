use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::{info, instrument, warn};

use crate::{auth::AuthSubject, error::AppError, state::AppState};

use super::{dto::SignupRequest, repo_types::User};

#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(payload) = payload.map_err(|e| AppError::Validation(e.body_text()))?;

    // blank ids are rejected, anything else is stored exactly as sent
    if payload.clerk_id.trim().is_empty() {
        warn!("signup without clerk_id");
        return Err(AppError::Validation("clerk_id is required".into()));
    }

    User::insert(&state.db, &payload.clerk_id).await?;
    Ok(StatusCode::CREATED)
}

#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(AuthSubject(requested_by)): Extension<AuthSubject>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = User::list_all(&state.db).await?;
    info!(requested_by = %requested_by, count = users.len(), "listed users");
    Ok(Json(users))
}

/// GET /{version}/users/:id — the segment is the identity provider id.
#[instrument(skip(state))]
pub async fn get_user_by_clerk_id(
    State(state): State<AppState>,
    Path(clerk_id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = User::find_by_clerk_id(&state.db, &clerk_id).await?;
    Ok(Json(user))
}

/// DELETE /{version}/users/:id — the segment is the numeric primary key.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = id
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("invalid user id {id:?}")))?;

    User::delete_by_id(&state.db, id).await?;
    info!(user_id = id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
