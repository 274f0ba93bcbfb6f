pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod state;
pub mod users;
pub mod webhooks;
