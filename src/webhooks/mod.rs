pub mod dto;
pub mod handlers;
pub mod signature;

pub use signature::{WebhookError, WebhookVerifier};
