use anyhow::Context;

/// Process-wide configuration, read from the environment once in `main`
/// and shared read-only behind the application state.
#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub bind_addr: String,
    /// Absolute base used when generating pagination and `_links` hrefs.
    pub public_base_url: String,
    /// Version applied when the `Accept` header does not request one.
    pub default_api_version: String,
    pub token_secret: String,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3001".to_string()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
            default_api_version: std::env::var("DEFAULT_API_VERSION")
                .unwrap_or_else(|_| "1.0".to_string()),
            token_secret: std::env::var("TOKEN").context("TOKEN not set")?,
        })
    }
}
