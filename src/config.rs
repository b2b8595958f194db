//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string
    pub database_url: String,
    /// Upper bound for the store connection pool
    pub database_max_connections: u32,
    /// TTL in seconds applied to every cache entry
    pub cache_expire_time: u64,
    /// Maximum number of entries the in-memory cache can hold
    pub cache_max_entries: usize,
    /// Background expiry sweep interval in seconds
    pub cache_cleanup_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Path prefix for the versioned entity routes: empty or `/segment[/...]`
    pub api_prefix: String,
    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,
    /// Application name reported by the root endpoint
    pub app_name: String,
    /// Application version reported by the health endpoint
    pub app_version: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DATABASE_URL` - SQLite URL (default: sqlite:product_api.db)
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `CACHE_EXPIRE_TIME` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10000)
    /// - `CACHE_CLEANUP_INTERVAL` - Expiry sweep frequency in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `API_PREFIX` - Route prefix (default: /api/v1)
    /// - `CORS_ORIGINS` - Comma-separated allowed origins (default: *)
    /// - `APP_NAME` - Display name (default: Product Management API)
    /// - `APP_VERSION` - Reported version (default: 1.0.0)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            cache_expire_time: parse_env("CACHE_EXPIRE_TIME")
                .unwrap_or(defaults.cache_expire_time),
            cache_max_entries: parse_env("CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries),
            cache_cleanup_interval: parse_env("CACHE_CLEANUP_INTERVAL")
                .unwrap_or(defaults.cache_cleanup_interval),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            api_prefix: env::var("API_PREFIX")
                .map(|prefix| normalize_api_prefix(&prefix))
                .unwrap_or(defaults.api_prefix),
            cors_origins: env::var("CORS_ORIGINS")
                .ok()
                .map(|origins| parse_origins(&origins))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(defaults.cors_origins),
            app_name: env::var("APP_NAME").unwrap_or(defaults.app_name),
            app_version: env::var("APP_VERSION").unwrap_or(defaults.app_version),
        }
    }
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Leading slash added, trailing slashes dropped. The root prefix becomes
/// the empty string.
pub fn normalize_api_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:product_api.db".to_string(),
            database_max_connections: 5,
            cache_expire_time: 300,
            cache_max_entries: 10_000,
            cache_cleanup_interval: 60,
            server_port: 8000,
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec!["*".to_string()],
            app_name: "Product Management API".to_string(),
            app_version: "1.0.0".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_expire_time, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.api_prefix, "/api/v1");
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_EXPIRE_TIME");
        env::remove_var("CACHE_MAX_ENTRIES");
        env::remove_var("SERVER_PORT");
        env::remove_var("API_PREFIX");

        let config = Config::from_env();
        assert_eq!(config.cache_expire_time, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.api_prefix, "/api/v1");
    }

    #[test]
    fn test_normalize_api_prefix() {
        assert_eq!(normalize_api_prefix("api/v1"), "/api/v1");
        assert_eq!(normalize_api_prefix("/api/v2/"), "/api/v2");
        assert_eq!(normalize_api_prefix("/"), "");
        assert_eq!(normalize_api_prefix(""), "");
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("http://localhost:3000, https://shop.example.com,"),
            vec!["http://localhost:3000", "https://shop.example.com"]
        );
        assert!(parse_origins(" ").is_empty());
        assert_eq!(Config::default().cors_origins, vec!["*"]);
    }

    #[test]
    fn test_parse_env_ignores_garbage() {
        env::set_var("PRODUCT_API_TEST_PORT", "not-a-number");
        assert_eq!(parse_env::<u16>("PRODUCT_API_TEST_PORT"), None);
        env::remove_var("PRODUCT_API_TEST_PORT");
    }
}
