use serde::{Deserialize, Serialize};

/// Session token claims issued by Clerk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String, // Clerk user ID
    pub exp: usize,  // expires at (unix timestamp)
    #[serde(default)]
    pub iat: Option<usize>,
    #[serde(default)]
    pub nbf: Option<usize>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub sid: Option<String>, // session ID
    #[serde(default)]
    pub azp: Option<String>, // authorized party (origin)
}

/// Subject resolved by the auth middleware, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSubject(pub String);
