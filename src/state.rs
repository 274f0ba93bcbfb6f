use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::auth::{session::fetch_jwks, SessionVerifier};
use crate::config::AppConfig;
use crate::db;
use crate::webhooks::WebhookVerifier;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub sessions: Arc<SessionVerifier>,
    pub webhooks: Arc<WebhookVerifier>,
}

impl AppState {
    /// Everything that can fail at startup happens here, before the listener binds.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let webhooks = WebhookVerifier::new(&config.clerk.webhook_signing_secret)
            .context("CLERK_WEBHOOK_SIGNING_SECRET")?;

        let issuer = config.clerk.issuer.as_deref();
        let sessions = match &config.clerk.jwt_key {
            Some(pem) => SessionVerifier::from_rsa_pem(pem, issuer)?,
            None => {
                let jwks = fetch_jwks(&config.clerk.api_url, &config.clerk.secret_key)
                    .await
                    .context("fetch session JWKS")?;
                SessionVerifier::from_jwks(&jwks, issuer)?
            }
        };

        let db = db::connect_with_retry(&config.database_url).await?;

        Ok(Self::from_parts(
            db,
            config,
            Arc::new(sessions),
            Arc::new(webhooks),
        ))
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        sessions: Arc<SessionVerifier>,
        webhooks: Arc<WebhookVerifier>,
    ) -> Self {
        Self {
            db,
            config,
            sessions,
            webhooks,
        }
    }
}
