use std::env;
use std::time::Duration;

const DEFAULT_DATABASE_URL: &str = "sqlite://case.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CACHE_ENTRIES: usize = 16;
const DEFAULT_CACHE_IDLE_SECS: u64 = 120;

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Sizing of the email page cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub time_to_idle: Duration,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self {
            max_entries: env_usize("EMAILS_CACHE_MAX_ENTRIES", DEFAULT_CACHE_ENTRIES).max(1),
            time_to_idle: env_duration_secs("EMAILS_CACHE_IDLE_SECS", DEFAULT_CACHE_IDLE_SECS),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_ENTRIES,
            time_to_idle: Duration::from_secs(DEFAULT_CACHE_IDLE_SECS),
        }
    }
}

/// Runtime configuration of the server.
#[derive(Debug, Clone)]
pub struct CaseViewsConfig {
    /// Case database URL; the scheme selects the SQL dialect.
    pub database_url: String,
    pub max_connections: u32,
    pub cache: CacheConfig,
}

impl CaseViewsConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env_string("CASE_DATABASE_URL", DEFAULT_DATABASE_URL),
            max_connections: env_u32("CASE_DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)
                .max(1),
            cache: CacheConfig::from_env(),
        }
    }
}

impl Default for CaseViewsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
