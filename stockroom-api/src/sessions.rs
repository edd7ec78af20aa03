//! Cookie sessions for the web interface.
//!
//! Sessions are held in process memory and keyed by a random 32-byte hex id
//! carried in the `stockroom_session` cookie. Each successful lookup pushes
//! the idle expiry forward. Restarting the process signs everyone out.

use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use dashmap::DashMap;
use stockroom_core::{ConfigError, User, UserId};
use tokio::time::Instant;

use crate::auth::{AuthContext, AuthMethod};
use crate::config::{env_lookup, parse_var};

pub const SESSION_COOKIE_NAME: &str = "stockroom_session";

/// Two weeks, matching the usual web framework default.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1_209_600;

/// Longest accepted idle lifetime (one year).
pub const MAX_SESSION_TTL_SECS: u64 = 31_536_000;

/// Session lifetime and cookie flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which a session is dropped.
    pub idle_ttl: Duration,
    /// Set the `Secure` flag on cookies. Enable behind TLS.
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            secure_cookies: false,
        }
    }
}

impl SessionConfig {
    /// Environment variables:
    /// - `STOCKROOM_SESSION_TTL_SECS`: idle lifetime (default: two weeks)
    /// - `STOCKROOM_COOKIE_SECURE`: "true" to mark cookies `Secure`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl_secs = parse_var::<u64, _>(&lookup, "STOCKROOM_SESSION_TTL_SECS")?
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "STOCKROOM_SESSION_TTL_SECS".to_string(),
                value: "0".to_string(),
                reason: "session lifetime must be positive".to_string(),
            });
        }
        if ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "STOCKROOM_SESSION_TTL_SECS".to_string(),
                value: ttl_secs.to_string(),
                reason: format!("session lifetime must be at most {} seconds", MAX_SESSION_TTL_SECS),
            });
        }

        Ok(Self {
            idle_ttl: Duration::from_secs(ttl_secs),
            secure_cookies: parse_var::<bool, _>(&lookup, "STOCKROOM_COOKIE_SECURE")?
                .unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone)]
struct SessionEntry {
    user_id: UserId,
    username: String,
    expires_at: Instant,
}

/// In-memory session table.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<String, SessionEntry>,
    config: SessionConfig,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn new_session_id() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

impl SessionStore {
    /// Idle lifetimes above [`MAX_SESSION_TTL_SECS`] are capped.
    pub fn new(mut config: SessionConfig) -> Self {
        config.idle_ttl = config
            .idle_ttl
            .min(Duration::from_secs(MAX_SESSION_TTL_SECS));
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    fn expiry_from(&self, now: Instant) -> Instant {
        now.checked_add(self.config.idle_ttl).unwrap_or(now)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a session for `user` and return its id.
    pub fn create(&self, user: &User) -> String {
        let id = new_session_id();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                user_id: user.id,
                username: user.username.clone(),
                expires_at: self.expiry_from(Instant::now()),
            },
        );
        tracing::debug!(user_id = %user.id, "session started");
        id
    }

    /// Resolve a session id, refreshing its idle expiry.
    ///
    /// Expired sessions are removed and reported as absent.
    pub fn resolve(&self, id: &str) -> Option<AuthContext> {
        let now = Instant::now();
        let context = {
            let mut entry = self.sessions.get_mut(id)?;
            if now >= entry.expires_at {
                None
            } else {
                entry.expires_at = self.expiry_from(now);
                Some(AuthContext::new(
                    entry.user_id,
                    entry.username.clone(),
                    AuthMethod::Session,
                ))
            }
        };

        if context.is_none() {
            self.sessions.remove(id);
            tracing::debug!("expired session dropped");
        }
        context
    }

    /// End a session. Unknown ids are ignored.
    pub fn destroy(&self, id: &str) {
        self.sessions.remove(id);
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Cookie carrying a session id.
    pub fn session_cookie(&self, id: String) -> Cookie<'static> {
        let secs = i64::try_from(self.config.idle_ttl.as_secs()).unwrap_or(i64::MAX);
        let max_age = time::Duration::seconds(secs);
        Cookie::build((SESSION_COOKIE_NAME, id))
            .http_only(true)
            .secure(self.config.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    /// Cookie that removes the session cookie from the browser.
    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, "")).path("/").build()
    }
}
