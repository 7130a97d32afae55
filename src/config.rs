//! Agent configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::context::SessionSettings;

/// Agent configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Marketplace REST API base URL
    pub api_base_url: String,
    /// Identity provider login page; redirects back to `/auth/callback`
    pub identity_login_url: String,
    /// Session file (durable token storage)
    pub session_file: PathBuf,
    /// Loopback port for the agent
    pub port: u16,
    /// Silent refresh period
    pub refresh_interval: Duration,
    /// Delay before a failed callback returns to login
    pub callback_error_delay: Duration,
    /// Delay before a successful callback moves to the dashboard
    pub callback_success_delay: Duration,
    /// Timeout for auth API requests
    pub http_timeout: Duration,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        let settings = SessionSettings::default();
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            identity_login_url: "http://localhost:3000/auth/sso".to_string(),
            session_file: PathBuf::from(".realty-session.json"),
            port: 8765,
            refresh_interval: settings.refresh_interval,
            callback_error_delay: settings.error_redirect_delay,
            callback_success_delay: settings.success_redirect_delay,
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("API_BASE_URL"))?,
            identity_login_url: env::var("IDENTITY_LOGIN_URL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("IDENTITY_LOGIN_URL"))?,
            session_file: env::var("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.session_file),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            refresh_interval: parse_var("REFRESH_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_interval),
            callback_error_delay: parse_var("CALLBACK_ERROR_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.callback_error_delay),
            callback_success_delay: parse_var("CALLBACK_SUCCESS_DELAY_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.callback_success_delay),
            http_timeout: parse_var("HTTP_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
        })
    }

    /// Timings for the session core.
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            refresh_interval: self.refresh_interval,
            error_redirect_delay: self.callback_error_delay,
            success_redirect_delay: self.callback_success_delay,
        }
    }
}

/// Optional numeric variable; present but unparseable is an error.
fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("API_BASE_URL", "https://api.example.com ");
        env::set_var("IDENTITY_LOGIN_URL", "https://id.example.com/login");
        env::set_var("REFRESH_INTERVAL_SECS", "60");
        env::remove_var("PORT");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.port, 8765);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert_eq!(config.callback_error_delay, Duration::from_millis(4000));
        assert_eq!(config.callback_success_delay, Duration::from_millis(500));

        let settings = config.session_settings();
        assert_eq!(settings.refresh_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("REALTY_SESSION_TEST_NUMBER", "fifteen");
        let result: Result<Option<u64>, _> = parse_var("REALTY_SESSION_TEST_NUMBER");
        assert!(matches!(result, Err(ConfigError::Invalid(_, _))));

        let result: Result<Option<u64>, _> = parse_var("REALTY_SESSION_TEST_UNSET");
        assert!(matches!(result, Ok(None)));
    }
}
