use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use bytes::Bytes;
use tracing::{error, info, instrument, warn};

use crate::{error::AppError, state::AppState, users::User};

use super::dto::{ClerkUserCreated, Envelope};

pub const USER_CREATED: &str = "user.created";

/// POST /webhooks/clerk
///
/// Signature is checked before the body is parsed. A repeated `user.created`
/// delivery hits the unique constraint on `clerk_id` and answers 500.
#[instrument(skip_all)]
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), AppError> {
    if let Err(e) = state.webhooks.verify(&headers, &body) {
        warn!(error = %e, "webhook verification failed");
        return Err(e.into());
    }

    let envelope: Envelope = serde_json::from_slice(&body).map_err(|e| {
        error!(error = %e, "failed to parse webhook payload");
        AppError::Validation("malformed webhook envelope".into())
    })?;

    info!(event_type = %envelope.event_type, "received verified webhook");

    match envelope.event_type.as_str() {
        USER_CREATED => {
            let data: ClerkUserCreated =
                serde_json::from_str(envelope.data.get()).map_err(|e| {
                    error!(error = %e, "failed to parse user data");
                    AppError::Validation("malformed user.created payload".into())
                })?;
            if data.id.trim().is_empty() {
                return Err(AppError::Validation("user.created without id".into()));
            }

            info!(
                clerk_id = %data.id,
                name = %data.display_name(),
                email = data.primary_email().unwrap_or("-"),
                "received user data"
            );

            if let Err(e) = User::insert(&state.db, &data.id).await {
                error!(error = %e, clerk_id = %data.id, "failed to add user to database");
                return Err(e.into());
            }

            info!(clerk_id = %data.id, "added user from webhook");
        }
        other => {
            info!(event_type = %other, "unhandled event type");
        }
    }

    Ok((StatusCode::OK, "Webhook received"))
}
