use std::path::PathBuf;

pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ClerkConfig {
    pub secret_key: String,
    pub webhook_signing_secret: String,
    /// PEM public key for offline session verification. When absent the JWKS
    /// is fetched from the backend API at startup.
    pub jwt_key: Option<String>,
    pub api_url: String,
    pub issuer: Option<String>,
}

/// Where migrations come from. The driver is validated but not kept: only
/// Postgres is supported.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub dbstring: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub clerk: ClerkConfig,
    pub run_migration: bool,
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let clerk = ClerkConfig {
            secret_key: required("CLERK_SECRET_KEY")?,
            webhook_signing_secret: required("CLERK_WEBHOOK_SIGNING_SECRET")?,
            jwt_key: optional("CLERK_JWT_KEY"),
            api_url: optional("CLERK_API_URL").unwrap_or_else(|| DEFAULT_CLERK_API_URL.into()),
            issuer: optional("CLERK_ISSUER"),
        };

        let port = match optional("PORT") {
            Some(v) => v.parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let environment = optional("APP_ENV").unwrap_or_else(|| {
            tracing::warn!("APP_ENV not set, defaulting to development");
            "development".into()
        });

        Ok(Self {
            database_url,
            clerk,
            run_migration: optional("RUN_MIGRATION").as_deref() == Some("true"),
            host: optional("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            environment,
            static_dir: optional("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl MigrationConfig {
    /// Only consulted when `RUN_MIGRATION=true`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let driver = required("MIGRATION_DRIVER")?;
        if driver != "postgres" {
            return Err(ConfigError::Invalid {
                name: "MIGRATION_DRIVER",
                reason: format!("unsupported driver {driver:?}"),
            });
        }
        Ok(Self {
            dbstring: required("MIGRATION_DBSTRING")?,
            dir: PathBuf::from(required("MIGRATION_DIR")?),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::Missing(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variable_names_itself() {
        let err = required("CLERK_USERS_TEST_SURELY_UNSET").unwrap_err();
        assert_eq!(
            err.to_string(),
            "CLERK_USERS_TEST_SURELY_UNSET environment variable not set"
        );
    }

    #[test]
    fn blank_values_count_as_missing() {
        std::env::set_var("CLERK_USERS_TEST_BLANK", "   ");
        assert!(optional("CLERK_USERS_TEST_BLANK").is_none());
        std::env::remove_var("CLERK_USERS_TEST_BLANK");
    }

    #[test]
    fn migration_driver_must_be_postgres() {
        std::env::set_var("MIGRATION_DRIVER", "mysql");
        std::env::set_var("MIGRATION_DBSTRING", "mysql://localhost/users");
        std::env::set_var("MIGRATION_DIR", "migrations");
        let rejected = MigrationConfig::from_env();

        std::env::set_var("MIGRATION_DRIVER", "postgres");
        let accepted = MigrationConfig::from_env();

        for name in ["MIGRATION_DRIVER", "MIGRATION_DBSTRING", "MIGRATION_DIR"] {
            std::env::remove_var(name);
        }

        assert!(matches!(
            rejected,
            Err(ConfigError::Invalid { name: "MIGRATION_DRIVER", .. })
        ));
        let cfg = accepted.unwrap();
        assert_eq!(cfg.dbstring, "mysql://localhost/users");
        assert_eq!(cfg.dir, PathBuf::from("migrations"));
    }
}
