//! Authentication Module
//!
//! Bearer-token authentication for the JSON API. Tokens are HS256 JWTs of
//! two kinds: short-lived access tokens presented on every request, and
//! longer-lived refresh tokens exchanged for new access tokens. A token of
//! one kind is never accepted where the other is expected.

use crate::config::Environment;
use crate::error::{ApiError, ApiResult};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use stockroom_core::{ConfigError, StockroomError, User, UserId};

const INSECURE_DEFAULT_SECRET: &str = "INSECURE_DEFAULT_SECRET_CHANGE_IN_PRODUCTION";

/// Default access token lifetime (5 minutes).
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 300;

/// Default refresh token lifetime (1 day).
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 86_400;

// ============================================================================
// CLOCK ABSTRACTION
// ============================================================================

/// Clock abstraction for JWT time validation.
///
/// Token expiry is checked against this clock instead of inside
/// `jsonwebtoken`, so tests can pin time and a broken system clock surfaces
/// as an error rather than a panic.
pub trait JwtClock: Send + Sync {
    /// Current time as Unix epoch seconds. May be negative on a broken host.
    fn now_epoch_secs(&self) -> i64;
}

/// Production clock using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl JwtClock for SystemClock {
    fn now_epoch_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Fixed clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl JwtClock for FixedClock {
    fn now_epoch_secs(&self) -> i64 {
        self.0
    }
}

/// Test clock helpers for common scenarios.
#[cfg(test)]
pub mod test_clocks {
    use super::FixedClock;

    /// 2024-01-01 00:00:00 UTC
    pub fn valid() -> FixedClock {
        FixedClock(1704067200)
    }

    /// 2030-01-01 00:00:00 UTC
    pub fn future() -> FixedClock {
        FixedClock(1893456000)
    }
}

// ============================================================================
// JWT SECRET (TYPE-SAFE)
// ============================================================================

/// JWT signing secret that never appears in logs or `Debug` output.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Create a new JWT secret.
    ///
    /// # Errors
    /// Returns error if the secret is empty.
    pub fn new(secret: String) -> Result<Self, StockroomError> {
        if secret.is_empty() {
            return Err(StockroomError::Config(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            }));
        }
        Ok(Self(SecretString::new(secret.into())))
    }

    /// Expose the secret value (only for cryptographic operations).
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn len(&self) -> usize {
        self.0.expose_secret().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }

    pub fn is_insecure_default(&self) -> bool {
        self.0.expose_secret() == INSECURE_DEFAULT_SECRET
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret([REDACTED, {} chars])", self.len())
    }
}

fn build_jwt_secret(secret_str: String) -> JwtSecret {
    let normalized = if secret_str.trim().is_empty() {
        INSECURE_DEFAULT_SECRET.to_string()
    } else {
        secret_str
    };

    match JwtSecret::new(normalized) {
        Ok(secret) => secret,
        Err(_) => JwtSecret(SecretString::new(INSECURE_DEFAULT_SECRET.to_string().into())),
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Authentication configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// JWT secret key for signing and verification
    pub jwt_secret: JwtSecret,

    /// JWT algorithm (default: HS256)
    pub jwt_algorithm: Algorithm,

    /// Access token lifetime in seconds (default: 300)
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds (default: 86400)
    pub refresh_ttl_secs: i64,

    /// Clock skew tolerance in seconds (default: 60)
    pub jwt_clock_skew_secs: i64,

    /// Clock for JWT time validation (injected for testing)
    pub clock: Arc<dyn JwtClock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("jwt_clock_skew_secs", &self.jwt_clock_skew_secs)
            .field("clock", &"<JwtClock>")
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        let secret_str = std::env::var("STOCKROOM_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            access_ttl_secs: DEFAULT_ACCESS_TTL_SECS,
            refresh_ttl_secs: DEFAULT_REFRESH_TTL_SECS,
            jwt_clock_skew_secs: 60,
            clock: Arc::new(SystemClock),
        }
    }
}

impl AuthConfig {
    /// Create authentication configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `STOCKROOM_JWT_SECRET`: JWT signing secret
    /// - `STOCKROOM_ACCESS_TTL_SECS`: Access token lifetime (default: 300)
    /// - `STOCKROOM_REFRESH_TTL_SECS`: Refresh token lifetime (default: 86400)
    /// - `STOCKROOM_CLOCK_SKEW_SECS`: Clock skew tolerance (default: 60)
    pub fn from_env() -> Self {
        let secret_str = std::env::var("STOCKROOM_JWT_SECRET")
            .unwrap_or_else(|_| INSECURE_DEFAULT_SECRET.to_string());

        Self {
            jwt_secret: build_jwt_secret(secret_str),
            jwt_algorithm: Algorithm::HS256,
            access_ttl_secs: std::env::var("STOCKROOM_ACCESS_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ACCESS_TTL_SECS),
            refresh_ttl_secs: std::env::var("STOCKROOM_REFRESH_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_REFRESH_TTL_SECS),
            jwt_clock_skew_secs: std::env::var("STOCKROOM_CLOCK_SKEW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            clock: Arc::new(SystemClock),
        }
    }

    /// Refuse insecure secrets in production.
    ///
    /// Called at server startup. In development, warnings are logged but the
    /// server continues.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let is_production = Environment::from_env() == Environment::Production;

        if self.jwt_secret.is_insecure_default() {
            if is_production {
                return Err(ApiError::invalid_input(
                    "Cannot start server in production with insecure JWT secret. \
                     Set STOCKROOM_JWT_SECRET to a secure value.",
                ));
            }
            tracing::warn!(
                "SECURITY WARNING: Using insecure default JWT secret. \
                 Set STOCKROOM_JWT_SECRET to a random value of at least 32 characters \
                 before deploying."
            );
        }

        if self.jwt_secret.len() < 32 {
            if is_production {
                return Err(ApiError::invalid_input(format!(
                    "JWT secret is too short for production use ({} chars). \
                     It must be at least 32 characters long.",
                    self.jwt_secret.len()
                )));
            } else if !self.jwt_secret.is_insecure_default() {
                tracing::warn!(
                    "SECURITY WARNING: JWT secret is short ({} chars). \
                     For production, use at least 32 characters.",
                    self.jwt_secret.len()
                );
            }
        }

        Ok(())
    }
}

// ============================================================================
// JWT CLAIMS
// ============================================================================

/// Which role a token plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    fn ttl_secs(self, config: &AuthConfig) -> i64 {
        match self {
            TokenType::Access => config.access_ttl_secs,
            TokenType::Refresh => config.refresh_ttl_secs,
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => f.write_str("access"),
            TokenType::Refresh => f.write_str("refresh"),
        }
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Unique token id, 32 hex characters
    pub jti: String,

    pub token_type: TokenType,
}

impl Claims {
    /// Create claims for a user using a clock.
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        token_type: TokenType,
        expiration_secs: i64,
        clock: &dyn JwtClock,
    ) -> Self {
        let now = clock.now_epoch_secs();

        Self {
            sub: user_id.to_string(),
            username: username.into(),
            iat: now,
            exp: now + expiration_secs,
            jti: hex::encode(rand::random::<[u8; 16]>()),
            token_type,
        }
    }

    /// Check if the token has expired according to a clock.
    pub fn is_expired(&self, clock: &dyn JwtClock) -> bool {
        self.exp < clock.now_epoch_secs()
    }

    pub fn user_id(&self) -> ApiResult<UserId> {
        self.sub
            .parse::<i64>()
            .map(UserId)
            .map_err(|_| ApiError::invalid_token("Token subject is not a user id"))
    }
}

/// Access and refresh tokens returned by login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authentication context extracted from a request.
///
/// Injected into Axum request extensions after successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub username: String,
    pub auth_method: AuthMethod,
}

impl AuthContext {
    pub fn new(user_id: UserId, username: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            user_id,
            username: username.into(),
            auth_method,
        }
    }
}

/// Authentication method used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Bearer JWT on the JSON API
    Jwt,

    /// Session cookie on the web interface
    Session,
}

// ============================================================================
// AUTHENTICATION FUNCTIONS
// ============================================================================

/// Check `exp` against a clock with skew tolerance.
fn validate_expiry(now: i64, exp: i64, leeway_secs: i64) -> ApiResult<()> {
    if exp < now - leeway_secs {
        return Err(ApiError::token_expired());
    }

    Ok(())
}

/// Validate a JWT and extract its claims.
///
/// Signature is checked by `jsonwebtoken`; times are checked against the
/// configured clock. Fails with `InvalidToken` when the token is of a
/// different type than `expected`.
pub fn validate_jwt_token(
    config: &AuthConfig,
    token: &str,
    expected: TokenType,
) -> ApiResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.expose().as_bytes());

    let mut validation = Validation::new(config.jwt_algorithm);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let token_data =
        decode::<Claims>(token, &decoding_key, &validation).map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::invalid_token("Token signature is invalid")
            }
            _ => ApiError::invalid_token("Token is invalid or expired"),
        })?;

    let claims = token_data.claims;

    let now = config.clock.now_epoch_secs();
    if now < 0 {
        tracing::error!(
            timestamp = now,
            "System clock returned pre-epoch time - server time is broken"
        );
        return Err(ApiError::internal_error(
            "Server time configuration error - please contact support",
        ));
    }

    validate_expiry(now, claims.exp, config.jwt_clock_skew_secs)?;

    if claims.token_type != expected {
        return Err(ApiError::invalid_token(format!(
            "Token has wrong type: expected {}, got {}",
            expected, claims.token_type
        )));
    }

    Ok(claims)
}

/// Sign a token of the given type for a user.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: UserId,
    username: &str,
    token_type: TokenType,
) -> ApiResult<String> {
    let claims = Claims::new(
        user_id,
        username,
        token_type,
        token_type.ttl_secs(config),
        &*config.clock,
    );

    let encoding_key = EncodingKey::from_secret(config.jwt_secret.expose().as_bytes());
    let header = Header::new(config.jwt_algorithm);

    encode(&header, &claims, &encoding_key)
        .map_err(|e| ApiError::internal_error(format!("Failed to generate token: {}", e)))
}

/// Issue a fresh access and refresh token for a user who just logged in.
pub fn issue_token_pair(config: &AuthConfig, user: &User) -> ApiResult<TokenPair> {
    Ok(TokenPair {
        access: generate_jwt_token(config, user.id, &user.username, TokenType::Access)?,
        refresh: generate_jwt_token(config, user.id, &user.username, TokenType::Refresh)?,
    })
}

/// Exchange a refresh token for a new access token.
pub fn refresh_access_token(config: &AuthConfig, refresh_token: &str) -> ApiResult<String> {
    let claims = validate_jwt_token(config, refresh_token, TokenType::Refresh)?;
    generate_jwt_token(config, claims.user_id()?, &claims.username, TokenType::Access)
}

/// Authenticate a request from its `Authorization` header.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let Some(auth_value) = auth_header else {
        return Err(ApiError::from_code(crate::error::ErrorCode::Unauthorized));
    };

    let Some(token) = auth_value.strip_prefix("Bearer ") else {
        return Err(ApiError::invalid_token(
            "Authorization header must use Bearer scheme",
        ));
    };

    let claims = validate_jwt_token(config, token.trim(), TokenType::Access)?;
    Ok(AuthContext::new(
        claims.user_id()?,
        claims.username,
        AuthMethod::Jwt,
    ))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::sync::Mutex;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.previous.as_deref() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: JwtSecret::new("test_secret".to_string())
                .expect("Test secret should be valid"),
            clock: Arc::new(test_clocks::valid()),
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_access_token_round_trip() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, UserId(7), "alice", TokenType::Access)?;

        let claims = validate_jwt_token(&config, &token, TokenType::Access)?;
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, DEFAULT_ACCESS_TTL_SECS);
        assert_eq!(claims.jti.len(), 32);
        assert!(!claims.is_expired(&test_clocks::valid()));
        Ok(())
    }

    #[test]
    fn test_token_types_are_not_interchangeable() -> ApiResult<()> {
        let config = test_config();
        let access = generate_jwt_token(&config, UserId(1), "bob", TokenType::Access)?;
        let refresh = generate_jwt_token(&config, UserId(1), "bob", TokenType::Refresh)?;

        let err = validate_jwt_token(&config, &refresh, TokenType::Access);
        assert!(matches!(err, Err(ref e) if e.code == ErrorCode::InvalidToken));

        let err = refresh_access_token(&config, &access);
        assert!(matches!(err, Err(ref e) if e.code == ErrorCode::InvalidToken));
        Ok(())
    }

    #[test]
    fn test_jti_is_unique_per_token() -> ApiResult<()> {
        let config = test_config();
        let a = generate_jwt_token(&config, UserId(1), "bob", TokenType::Access)?;
        let b = generate_jwt_token(&config, UserId(1), "bob", TokenType::Access)?;
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn test_refresh_issues_access_token() -> ApiResult<()> {
        let config = test_config();
        let refresh = generate_jwt_token(&config, UserId(3), "carol", TokenType::Refresh)?;

        let access = refresh_access_token(&config, &refresh)?;
        let ctx = authenticate(&config, Some(&format!("Bearer {}", access)))?;
        assert_eq!(ctx.user_id, UserId(3));
        assert_eq!(ctx.username, "carol");
        assert_eq!(ctx.auth_method, AuthMethod::Jwt);
        Ok(())
    }

    #[test]
    fn test_expired_access_token() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId(1), "dave", TokenType::Access)?;

        config.clock = Arc::new(test_clocks::future());
        let result = validate_jwt_token(&config, &token, TokenType::Access);
        assert!(matches!(result, Err(ref e) if e.code == ErrorCode::TokenExpired));
        Ok(())
    }

    #[test]
    fn test_refresh_outlives_access() -> ApiResult<()> {
        let mut config = test_config();
        let access = generate_jwt_token(&config, UserId(1), "erin", TokenType::Access)?;
        let refresh = generate_jwt_token(&config, UserId(1), "erin", TokenType::Refresh)?;

        // One hour later the access token is dead, the refresh token is not
        config.clock = Arc::new(FixedClock(test_clocks::valid().0 + 3600));
        assert!(validate_jwt_token(&config, &access, TokenType::Access).is_err());
        assert!(refresh_access_token(&config, &refresh).is_ok());
        Ok(())
    }

    #[test]
    fn test_clock_skew_tolerance() -> ApiResult<()> {
        let mut config = test_config();
        config.jwt_clock_skew_secs = 60;
        let token = generate_jwt_token(&config, UserId(1), "u", TokenType::Access)?;

        config.clock = Arc::new(FixedClock(test_clocks::valid().0 + DEFAULT_ACCESS_TTL_SECS + 30));
        assert!(validate_jwt_token(&config, &token, TokenType::Access).is_ok());

        config.clock = Arc::new(FixedClock(test_clocks::valid().0 + DEFAULT_ACCESS_TTL_SECS + 61));
        assert!(validate_jwt_token(&config, &token, TokenType::Access).is_err());
        Ok(())
    }

    #[test]
    fn test_validate_expiry_boundaries() {
        assert!(validate_expiry(1_000, 1_000, 0).is_ok());
        assert!(validate_expiry(1_001, 1_000, 0).is_err());
        assert!(validate_expiry(1_010, 1_000, 10).is_ok());
        assert!(matches!(
            validate_expiry(1_011, 1_000, 10),
            Err(ApiError { code: ErrorCode::TokenExpired, .. })
        ));
    }

    #[test]
    fn test_tampered_signature_rejected() -> ApiResult<()> {
        let config = test_config();
        let token = generate_jwt_token(&config, UserId(1), "u", TokenType::Access)?;

        let other = AuthConfig {
            jwt_secret: JwtSecret::new("another_secret".to_string())
                .expect("Test secret should be valid"),
            ..test_config()
        };
        let result = validate_jwt_token(&other, &token, TokenType::Access);
        assert!(matches!(result, Err(ref e) if e.code == ErrorCode::InvalidToken));
        Ok(())
    }

    #[test]
    fn test_authenticate_header_shapes() {
        let config = test_config();

        let missing = authenticate(&config, None);
        assert!(matches!(missing, Err(ref e) if e.code == ErrorCode::Unauthorized));

        let basic = authenticate(&config, Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(basic, Err(ref e) if e.code == ErrorCode::InvalidToken));

        let garbage = authenticate(&config, Some("Bearer not.a.jwt"));
        assert!(matches!(garbage, Err(ref e) if e.code == ErrorCode::InvalidToken));
    }

    #[test]
    fn test_pre_epoch_clock_fails_loud() -> ApiResult<()> {
        let mut config = test_config();
        let token = generate_jwt_token(&config, UserId(1), "u", TokenType::Access)?;

        config.clock = Arc::new(FixedClock(-1000));
        let result = validate_jwt_token(&config, &token, TokenType::Access);
        assert!(
            matches!(result, Err(ref e) if e.code == ErrorCode::InternalError
                && e.message.contains("time configuration error"))
        );
        Ok(())
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = JwtSecret::new("super-secret-value".to_string())
            .expect("Test secret should be valid");
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("super-secret-value"));
        assert!(rendered.contains("REDACTED"));
        assert!(JwtSecret::new(String::new()).is_err());
    }

    #[test]
    fn test_production_validation_rejects_insecure_default() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("STOCKROOM_ENVIRONMENT", Some("production"));
        let _secret_guard = EnvVarGuard::set("STOCKROOM_JWT_SECRET", None);
        let config = AuthConfig::default();

        assert!(config.validate_for_production().is_err());
    }

    #[test]
    fn test_production_validation_rejects_short_secret() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("STOCKROOM_ENVIRONMENT", Some("production"));
        let config = AuthConfig {
            jwt_secret: JwtSecret::new("short".to_string()).expect("test secret should be valid"),
            ..Default::default()
        };

        assert!(config.validate_for_production().is_err());
    }

    #[test]
    fn test_production_validation_allows_secure_secret() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("STOCKROOM_ENVIRONMENT", Some("production"));
        let config = AuthConfig {
            jwt_secret: JwtSecret::new(
                "this-is-a-very-secure-secret-that-is-at-least-32-characters-long".to_string(),
            )
            .expect("test secret should be valid"),
            ..Default::default()
        };

        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_production_validation_allows_development() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _env_guard = EnvVarGuard::set("STOCKROOM_ENVIRONMENT", None);
        let config = AuthConfig::default();

        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_from_env_reads_lifetimes() {
        let _env_lock = ENV_MUTEX.lock().expect("env mutex should not be poisoned");
        let _access = EnvVarGuard::set("STOCKROOM_ACCESS_TTL_SECS", Some("120"));
        let _refresh = EnvVarGuard::set("STOCKROOM_REFRESH_TTL_SECS", Some("not-a-number"));

        let config = AuthConfig::from_env();
        assert_eq!(config.access_ttl_secs, 120);
        assert_eq!(config.refresh_ttl_secs, DEFAULT_REFRESH_TTL_SECS);
    }
}
