use std::time::Duration;

use anyhow::{Context, Result};

/// Coalescing window for debounced persistence, in milliseconds.
const DEBOUNCE_MIN_MS: u64 = 1500;
const DEBOUNCE_MAX_MS: u64 = 2000;

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub persist_debounce: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            persist_debounce: debounce_window(std::env::var("PERSIST_DEBOUNCE_MS").ok().as_deref())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn debounce_window(raw: Option<&str>) -> Result<Duration> {
    let ms = match raw {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .context("PERSIST_DEBOUNCE_MS must be a number of milliseconds")?,
        None => DEBOUNCE_MIN_MS,
    };
    Ok(Duration::from_millis(ms.clamp(DEBOUNCE_MIN_MS, DEBOUNCE_MAX_MS)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_window_defaults_and_clamps() {
        assert_eq!(debounce_window(None).unwrap(), Duration::from_millis(1500));
        assert_eq!(debounce_window(Some("1800")).unwrap(), Duration::from_millis(1800));
        assert_eq!(debounce_window(Some("100")).unwrap(), Duration::from_millis(1500));
        assert_eq!(debounce_window(Some("60000")).unwrap(), Duration::from_millis(2000));
        assert!(debounce_window(Some("soon")).is_err());
    }
}
