use serde::Deserialize;

/// Request body for POST /{version}/signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub clerk_id: String,
}
