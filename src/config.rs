//! Configuration Module
//!
//! Handles loading and managing cache layer configuration from environment variables.

use std::env;

// == Log Level ==
/// Verbosity threshold for cache manager logging.
///
/// Levels are ordered numerically; a message is emitted only when its level
/// is at or below the configured threshold. `None` suppresses everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// No cache logging at all
    None = 0,
    /// Failures that lose data or break a call
    Error = 1,
    /// Degraded-but-handled conditions (disconnects, fallbacks)
    Warn = 2,
    /// Lifecycle events (connects, clears)
    Info = 3,
    /// Per-operation hit/miss detail
    Debug = 4,
}

impl LogLevel {
    /// Returns true if a message at `level` passes this threshold.
    pub fn allows(self, level: LogLevel) -> bool {
        level != LogLevel::None && level <= self
    }

    /// Parses a level name, falling back to `Warn` for unknown values.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "none" => LogLevel::None,
            "error" => LogLevel::Error,
            "warn" => LogLevel::Warn,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            _ => LogLevel::Warn,
        }
    }
}

// == Cache Config ==
/// Cache layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Remote store connection URL
    pub backend_url: String,
    /// Namespace prefix prepended to every remote key
    pub prefix: String,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Connection attempt timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Logging verbosity threshold
    pub log_level: LogLevel,
    /// Background sweep interval in seconds for the in-process maps
    pub sweep_interval: u64,
}

impl CacheConfig {
    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND_URL` - Remote store URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_PREFIX` - Key namespace prefix (default: "app:cache:")
    /// - `CACHE_DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `CACHE_CONNECT_TIMEOUT_MS` - Connect timeout in ms (default: 10000)
    /// - `CACHE_LOG_LEVEL` - one of none|error|warn|info|debug (default: warn)
    /// - `CACHE_SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    pub fn from_env() -> Self {
        Self {
            backend_url: env::var("CACHE_BACKEND_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            prefix: env::var("CACHE_PREFIX").unwrap_or_else(|_| "app:cache:".to_string()),
            default_ttl: env::var("CACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3600),
            connect_timeout_ms: env::var("CACHE_CONNECT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),
            log_level: env::var("CACHE_LOG_LEVEL")
                .map(|v| LogLevel::parse(&v))
                .unwrap_or(LogLevel::Warn),
            sweep_interval: env::var("CACHE_SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend_url: "redis://127.0.0.1:6379".to_string(),
            prefix: "app:cache:".to_string(),
            default_ttl: 3600,
            connect_timeout_ms: 10_000,
            log_level: LogLevel::Warn,
            sweep_interval: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.backend_url, "redis://127.0.0.1:6379");
        assert_eq!(config.prefix, "app:cache:");
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.connect_timeout_ms, 10_000);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert_eq!(config.sweep_interval, 60);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        env::remove_var("CACHE_BACKEND_URL");
        env::remove_var("CACHE_PREFIX");
        env::remove_var("CACHE_DEFAULT_TTL");
        env::remove_var("CACHE_CONNECT_TIMEOUT_MS");
        env::remove_var("CACHE_LOG_LEVEL");
        env::remove_var("CACHE_SWEEP_INTERVAL");

        let config = CacheConfig::from_env();
        assert_eq!(config.prefix, "app:cache:");
        assert_eq!(config.default_ttl, 3600);
        assert_eq!(config.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug.allows(LogLevel::Error));
        assert!(LogLevel::Debug.allows(LogLevel::Debug));
        assert!(LogLevel::Warn.allows(LogLevel::Warn));
        assert!(!LogLevel::Warn.allows(LogLevel::Info));
        assert!(!LogLevel::Error.allows(LogLevel::Warn));
    }

    #[test]
    fn test_log_level_none_suppresses_everything() {
        assert!(!LogLevel::None.allows(LogLevel::Error));
        assert!(!LogLevel::None.allows(LogLevel::None));
        assert!(!LogLevel::Debug.allows(LogLevel::None));
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("NONE"), LogLevel::None);
        assert_eq!(LogLevel::parse("Info"), LogLevel::Info);
        assert_eq!(LogLevel::parse("bogus"), LogLevel::Warn);
    }
}
