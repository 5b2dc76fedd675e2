use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub identity_project_id: String,
    pub identity_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Adds `Secure` to the session cookie. Set when `APP_ENV=production`.
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            identity_project_id: require_env("IDENTITY_PROJECT_ID")?,
            identity_api_key: require_env("IDENTITY_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            secure_cookies: is_production(std::env::var("APP_ENV").ok().as_deref()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    let value = std::env::var(key)
        .with_context(|| format!("Required environment variable '{key}' is not set"))?;
    if value.trim().is_empty() {
        anyhow::bail!("Required environment variable '{key}' is empty");
    }
    Ok(value)
}

fn is_production(app_env: Option<&str>) -> bool {
    app_env.is_some_and(|env| env.trim().eq_ignore_ascii_case("production"))
}
