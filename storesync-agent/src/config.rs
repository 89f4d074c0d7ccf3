use std::env::var;
use std::time::Duration;

use dotenvy::dotenv;
use storesync_core::SyncSettings;

/// Agent configuration with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    /// Store backend base URL
    /// Env: STORE_API_URL (required)
    pub store_api_url: String,

    /// Secret key authenticating this server with the store backend
    /// Env: STORE_SECRET_KEY (required)
    pub secret_key: String,

    /// Log expanded commands and raw response bodies
    /// Env: DEBUG_MODE (default: false)
    pub debug_mode: bool,

    /// Send diagnostic events to the triage endpoint
    /// Env: AUTO_REPORTING (default: true)
    pub auto_reporting_enabled: bool,

    /// Diagnostics endpoint
    /// Env: TRIAGE_URL (default: empty, which disables reporting)
    pub triage_url: String,

    /// Lifetime of every cache write, in minutes
    /// Env: CACHE_LIFETIME_MINUTES (default: 30)
    pub cache_lifetime_minutes: u64,

    /// Timeout for store backend requests
    /// Env: REQUEST_TIMEOUT_SECS (default: 10)
    pub request_timeout: Duration,

    /// How often the command queue is polled
    /// Env: QUEUE_TICK_SECS (default: 30)
    /// The backend's own next_check interval still gates each poll
    pub queue_tick: Duration,

    /// How often executed commands and join events are flushed
    /// Env: MAINTENANCE_TICK_SECS (default: 60)
    pub maintenance_tick: Duration,

    /// Address the host bridge listens on
    /// Env: BRIDGE_BIND (default: "127.0.0.1")
    pub bridge_bind: String,

    /// Port the host bridge listens on
    /// Env: BRIDGE_PORT (default: 3000)
    pub bridge_port: u16,

    /// Bearer token the game server uses on the bridge
    /// Env: BRIDGE_TOKEN (optional, generated at startup if missing)
    pub bridge_token: Option<String>,

    /// Request body size limit in bytes
    /// Env: REQUEST_BODY_LIMIT (default: 65536 = 64KB)
    pub request_body_limit: usize,

    /// Public address of the game server, attached to triage events
    /// Env: SERVER_IP (default: empty)
    pub server_ip: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenv(); //for local runs mostly
        Self {
            store_api_url: var("STORE_API_URL")
                .expect("STORE_API_URL environment variable is required"),
            secret_key: var("STORE_SECRET_KEY")
                .expect("STORE_SECRET_KEY environment variable is required"),
            debug_mode: env_or_default("DEBUG_MODE", false),
            auto_reporting_enabled: env_or_default("AUTO_REPORTING", true),
            triage_url: env_or_default_string("TRIAGE_URL", ""),
            cache_lifetime_minutes: env_or_default("CACHE_LIFETIME_MINUTES", 30),
            request_timeout: Duration::from_secs(env_or_default("REQUEST_TIMEOUT_SECS", 10)),
            queue_tick: Duration::from_secs(env_or_default("QUEUE_TICK_SECS", 30)),
            maintenance_tick: Duration::from_secs(env_or_default("MAINTENANCE_TICK_SECS", 60)),
            bridge_bind: env_or_default_string("BRIDGE_BIND", "127.0.0.1"),
            bridge_port: env_or_default("BRIDGE_PORT", 3000),
            bridge_token: var("BRIDGE_TOKEN").ok().filter(|token| !token.is_empty()),
            request_body_limit: env_or_default("REQUEST_BODY_LIMIT", 64 * 1024),
            server_ip: env_or_default_string("SERVER_IP", ""),
        }
    }

    /// Create configuration with all default values
    pub fn default() -> Self {
        Self {
            store_api_url: "http://127.0.0.1:8080".to_string(),
            secret_key: String::new(),
            debug_mode: false,
            auto_reporting_enabled: true,
            triage_url: String::new(),
            cache_lifetime_minutes: 30,
            request_timeout: Duration::from_secs(10),
            queue_tick: Duration::from_secs(30),
            maintenance_tick: Duration::from_secs(60),
            bridge_bind: "127.0.0.1".to_string(),
            bridge_port: 3000,
            bridge_token: None,
            request_body_limit: 64 * 1024, // 64 KB
            server_ip: String::new(),
        }
    }

    /// Options handed to the sync engine
    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            debug_mode: self.debug_mode,
            auto_reporting_enabled: self.auto_reporting_enabled,
            cache_lifetime: Duration::from_secs(self.cache_lifetime_minutes.saturating_mul(60)),
            triage_url: self.triage_url.clone(),
        }
    }
}

/// Parse environment variable or return default value
fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    var(key)
        .ok()
        .and_then(|val| val.parse().ok())
        .unwrap_or(default)
}

/// Parse environment variable string or return default value
fn env_or_default_string(key: &str, default: &str) -> String {
    var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.debug_mode);
        assert!(config.auto_reporting_enabled);
        assert_eq!(config.cache_lifetime_minutes, 30);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.queue_tick, Duration::from_secs(30));
        assert_eq!(config.maintenance_tick, Duration::from_secs(60));
        assert_eq!(config.bridge_bind, "127.0.0.1");
        assert_eq!(config.bridge_port, 3000);
        assert_eq!(config.request_body_limit, 64 * 1024);
        assert!(config.bridge_token.is_none());
    }

    #[test]
    fn test_sync_settings_from_config() {
        let config = Config {
            cache_lifetime_minutes: 5,
            triage_url: "https://triage.example".to_string(),
            debug_mode: true,
            ..Config::default()
        };
        let settings = config.sync_settings();
        assert_eq!(settings.cache_lifetime, Duration::from_secs(300));
        assert_eq!(settings.triage_url, "https://triage.example");
        assert!(settings.debug_mode);
        assert!(settings.auto_reporting_enabled);
    }

    #[test]
    fn test_huge_cache_lifetime_saturates() {
        let config = Config {
            cache_lifetime_minutes: u64::MAX,
            ..Config::default()
        };
        let settings = config.sync_settings();
        assert_eq!(settings.cache_lifetime, Duration::from_secs(u64::MAX));
    }
}
