use serde::Deserialize;

/// Fallback salt matching the original deployment. Deliberately weak; real
/// deployments are expected to set APP_SECRET.
const DEFAULT_SECRET_SALT: &str = "jurassic-salt";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub secret_salt: String,
    pub session_ttl_days: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let secret_salt =
            std::env::var("APP_SECRET").unwrap_or_else(|_| DEFAULT_SECRET_SALT.into());
        let session_ttl_days = std::env::var("SESSION_TTL_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7);
        Ok(Self {
            database_url,
            secret_salt,
            session_ttl_days,
        })
    }
}
