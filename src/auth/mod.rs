mod claims;
pub mod middleware;
pub mod session;

pub use claims::{AuthSubject, SessionClaims};
pub use session::{AuthError, SessionVerifier};
