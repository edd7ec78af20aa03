//! API Configuration Module
//!
//! Server, CORS, store, and cache settings. Configuration is loaded from
//! environment variables with sensible defaults for development.
//! Auth and session settings live beside their modules (`auth`, `sessions`).

use std::str::FromStr;
use std::time::Duration;

use stockroom_core::ConfigError;
use stockroom_storage::{
    CacheConfig, CacheFailurePolicy, RedisCacheConfig, DEFAULT_ENTRY_TTL, MAX_ENTRY_TTL,
};

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Read a variable through `lookup` and parse it, reporting bad values.
pub(crate) fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

// ============================================================================
// DEPLOYMENT ENVIRONMENT
// ============================================================================

/// Deployment environment, from `STOCKROOM_ENVIRONMENT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl Environment {
    pub fn from_env() -> Self {
        env_lookup("STOCKROOM_ENVIRONMENT")
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Server and CORS configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Socket address to listen on.
    pub bind_addr: String,

    pub environment: Environment,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    /// Example: "https://stockroom.example,https://app.stockroom.example"
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            environment: Environment::Development,
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `STOCKROOM_BIND_ADDR`: Listen address (default: 0.0.0.0:3000)
    /// - `STOCKROOM_ENVIRONMENT`: "development" or "production"
    /// - `STOCKROOM_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `STOCKROOM_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `STOCKROOM_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        let cors_origins = env_lookup("STOCKROOM_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_allow_credentials = env_lookup("STOCKROOM_CORS_ALLOW_CREDENTIALS")
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(false);

        let cors_max_age_secs = env_lookup("STOCKROOM_CORS_MAX_AGE_SECS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(86400);

        Self {
            bind_addr: env_lookup("STOCKROOM_BIND_ADDR")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            environment: Environment::from_env(),
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs,
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production || !self.cors_origins.is_empty()
    }

    /// Check if a given origin is allowed.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.stockroom.example
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}

// ============================================================================
// STORE AND CACHE SELECTION
// ============================================================================

/// Which item and user store to run against, from `STOCKROOM_STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Process-local maps. Data is lost on restart.
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            other => Err(format!("expected 'memory' or 'postgres', got '{}'", other)),
        }
    }
}

impl StoreKind {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(parse_var(&env_lookup, "STOCKROOM_STORE")?.unwrap_or_default())
    }
}

/// Which cache backend to run against, from `STOCKROOM_CACHE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheKind::Memory),
            "redis" => Ok(CacheKind::Redis),
            other => Err(format!("expected 'memory' or 'redis', got '{}'", other)),
        }
    }
}

/// Cache backend choice plus read-through policy.
#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    pub kind: CacheKind,
    pub redis: RedisCacheConfig,
    pub cache: CacheConfig,
}

impl CacheSettings {
    /// Load from environment variables.
    ///
    /// - `STOCKROOM_CACHE`: "memory" or "redis" (default: memory)
    /// - `STOCKROOM_REDIS_URL`: Redis connection URL
    /// - `STOCKROOM_CACHE_TTL_SECS`: Entry lifetime (default: 300, at most 30 days)
    /// - `STOCKROOM_CACHE_FAILURE_POLICY`: "degrade" or "fail" (default: degrade)
    /// - `STOCKROOM_CACHE_MAX_ENTRIES`: Capacity bound for the memory backend
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Load using an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = parse_var(&lookup, "STOCKROOM_CACHE")?.unwrap_or_default();

        let mut redis = RedisCacheConfig::default();
        if let Some(url) = lookup("STOCKROOM_REDIS_URL").filter(|s| !s.trim().is_empty()) {
            redis.url = url;
        }

        let ttl_secs: u64 = parse_var(&lookup, "STOCKROOM_CACHE_TTL_SECS")?
            .unwrap_or(DEFAULT_ENTRY_TTL.as_secs());
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "STOCKROOM_CACHE_TTL_SECS".to_string(),
                value: "0".to_string(),
                reason: "cache TTL must be at least one second".to_string(),
            });
        }
        if ttl_secs > MAX_ENTRY_TTL.as_secs() {
            return Err(ConfigError::InvalidValue {
                field: "STOCKROOM_CACHE_TTL_SECS".to_string(),
                value: ttl_secs.to_string(),
                reason: format!("cache TTL must be at most {} seconds", MAX_ENTRY_TTL.as_secs()),
            });
        }

        let policy: CacheFailurePolicy =
            parse_var(&lookup, "STOCKROOM_CACHE_FAILURE_POLICY")?.unwrap_or_default();

        let mut cache = CacheConfig::new()
            .with_ttl(Duration::from_secs(ttl_secs))
            .with_failure_policy(policy);
        if let Some(max) = parse_var::<usize, _>(&lookup, "STOCKROOM_CACHE_MAX_ENTRIES")? {
            cache = cache.with_max_entries(max);
        }

        Ok(Self { kind, redis, cache })
    }
}
