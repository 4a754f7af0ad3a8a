//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` (Supabase) connection string
//!   (falls back to `DATABASE_URL`)
//! - `ADMIN_JWT_SECRET` - HS256 signing secret for admin tokens (min 32 chars,
//!   high entropy). There is no built-in default: startup fails without it.
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_JWT_EXPIRES_IN` - Token lifetime such as `24h`, `30m`, `7d` (default: 24h)
//! - `ADMIN_USERNAME` / `ADMIN_PASSWORD` - Login credentials (set together)
//! - `ADMIN_SESSION_SECRET` - Legacy shared secret accepted by the token gate
//! - `ADMIN_LEGACY_EMAIL` - Email reported for legacy sessions
//!   (default: admin@atelier.local)
//! - `LOGIN_MAX_ATTEMPTS` - Login attempts per window (default: 5)
//! - `LOGIN_WINDOW_SECS` - Login rate-limit window in seconds (default: 900)
//! - `LOGIN_CLIENT_IP_HEADER` - Header set by the fronting proxy that carries
//!   the client IP (default: fly-client-ip). `none` keys on the socket peer.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (Stack Auth - enables identity-based admin routes)
//! - `STACK_PROJECT_ID` - Stack Auth project ID
//! - `STACK_SECRET_SERVER_KEY` - Stack Auth server key
//! - `STACK_API_URL` - API base URL (default: <https://api.stack-auth.com>)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::http::HeaderName;
use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

use atelier_core::Email;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_TOKEN_LIFETIME: &str = "24h";
const DEFAULT_LEGACY_EMAIL: &str = "admin@atelier.local";
const DEFAULT_STACK_API_URL: &str = "https://api.stack-auth.com";
const DEFAULT_LOGIN_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 15 * 60;
const DEFAULT_LOGIN_CLIENT_IP_HEADER: &str = "fly-client-ip";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing and login credentials
    pub auth: AuthConfig,
    /// Stack Auth configuration (optional - enables identity-based routes)
    pub identity: Option<StackAuthConfig>,
    /// Login rate limiting
    pub login_limit: LoginLimitConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

/// Admin token and login configuration.
///
/// Implements `Debug` manually to redact every credential.
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret for admin tokens
    pub jwt_secret: SecretString,
    /// Lifetime of newly issued tokens
    pub token_lifetime: TimeDelta,
    /// Username/password accepted by `POST /admin/auth`
    pub login: Option<LoginCredentials>,
    /// Pre-JWT shared secret still accepted by the token gate
    pub legacy_session_secret: Option<SecretString>,
    /// Email reported in the synthesized legacy admin context
    pub legacy_email: Email,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("token_lifetime", &self.token_lifetime)
            .field("login", &self.login)
            .field(
                "legacy_session_secret",
                &self.legacy_session_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("legacy_email", &self.legacy_email)
            .finish()
    }
}

/// Username/password pair for the login endpoint.
#[derive(Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: SecretString,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Stack Auth server API configuration.
///
/// Implements `Debug` manually to redact the server key.
#[derive(Clone)]
pub struct StackAuthConfig {
    /// Stack Auth project ID
    pub project_id: String,
    /// Secret server key (grants server-side access to the project)
    pub secret_server_key: SecretString,
    /// API base URL
    pub api_url: Url,
}

impl std::fmt::Debug for StackAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackAuthConfig")
            .field("project_id", &self.project_id)
            .field("secret_server_key", &"[REDACTED]")
            .field("api_url", &self.api_url.as_str())
            .finish()
    }
}

/// Fixed-window limits for the login endpoint.
#[derive(Debug, Clone)]
pub struct LoginLimitConfig {
    /// Attempts allowed per window and client
    pub max_attempts: u32,
    /// Window length, measured from the most recent failed attempt
    pub window: Duration,
    /// Proxy header trusted for the client IP; `None` uses the socket peer
    pub client_ip_header: Option<HeaderName>,
}

impl Default for LoginLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_LOGIN_MAX_ATTEMPTS,
            window: Duration::from_secs(DEFAULT_LOGIN_WINDOW_SECS),
            client_ip_header: Some(HeaderName::from_static(DEFAULT_LOGIN_CLIENT_IP_HEADER)),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (length, placeholder detection, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let auth = AuthConfig::from_env()?;
        let identity = StackAuthConfig::from_env()?;
        let login_limit = LoginLimitConfig::from_env()?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            auth,
            identity,
            login_limit,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AuthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("ADMIN_JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "ADMIN_JWT_SECRET")?;

        let token_lifetime = parse_lifetime(&get_env_or_default(
            "ADMIN_JWT_EXPIRES_IN",
            DEFAULT_TOKEN_LIFETIME,
        ))
        .map_err(|reason| ConfigError::InvalidEnvVar("ADMIN_JWT_EXPIRES_IN".to_string(), reason))?;

        let login = match (
            get_optional_env("ADMIN_USERNAME"),
            get_optional_env("ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(LoginCredentials {
                username,
                password: SecretString::from(password),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidEnvVar(
                    "ADMIN_USERNAME".to_string(),
                    "Both ADMIN_USERNAME and ADMIN_PASSWORD must be set together".to_string(),
                ));
            }
        };

        let legacy_session_secret = get_optional_env("ADMIN_SESSION_SECRET").map(|secret| {
            if let Err(e) = validate_secret_strength(&secret, "ADMIN_SESSION_SECRET") {
                tracing::warn!("ADMIN_SESSION_SECRET validation warning: {e}");
            }
            SecretString::from(secret)
        });

        let legacy_email = Email::parse(&get_env_or_default(
            "ADMIN_LEGACY_EMAIL",
            DEFAULT_LEGACY_EMAIL,
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_LEGACY_EMAIL".to_string(), e.to_string()))?;

        Ok(Self {
            jwt_secret,
            token_lifetime,
            login,
            legacy_session_secret,
            legacy_email,
        })
    }
}

impl StackAuthConfig {
    /// Load Stack Auth configuration from environment.
    ///
    /// Returns `None` if neither project ID nor server key is set, which
    /// disables the identity-based admin gate.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let project_id = get_optional_env("STACK_PROJECT_ID");
        let server_key = get_optional_env("STACK_SECRET_SERVER_KEY");

        match (project_id, server_key) {
            (Some(project_id), Some(key)) => {
                let api_url = Url::parse(&get_env_or_default("STACK_API_URL", DEFAULT_STACK_API_URL))
                    .map_err(|e| {
                        ConfigError::InvalidEnvVar("STACK_API_URL".to_string(), e.to_string())
                    })?;
                Ok(Some(Self {
                    project_id,
                    secret_server_key: SecretString::from(key),
                    api_url,
                }))
            }
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "STACK_*".to_string(),
                "Both STACK_PROJECT_ID and STACK_SECRET_SERVER_KEY must be set together"
                    .to_string(),
            )),
        }
    }
}

impl LoginLimitConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_attempts = get_env_or_default(
            "LOGIN_MAX_ATTEMPTS",
            &DEFAULT_LOGIN_MAX_ATTEMPTS.to_string(),
        )
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar("LOGIN_MAX_ATTEMPTS".to_string(), e.to_string()))?;
        let window_secs = get_env_or_default(
            "LOGIN_WINDOW_SECS",
            &DEFAULT_LOGIN_WINDOW_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar("LOGIN_WINDOW_SECS".to_string(), e.to_string()))?;

        if max_attempts == 0 || window_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "LOGIN_*".to_string(),
                "LOGIN_MAX_ATTEMPTS and LOGIN_WINDOW_SECS must be positive".to_string(),
            ));
        }

        let client_ip_header = parse_client_ip_header(&get_env_or_default(
            "LOGIN_CLIENT_IP_HEADER",
            DEFAULT_LOGIN_CLIENT_IP_HEADER,
        ))?;

        Ok(Self {
            max_attempts,
            window: Duration::from_secs(window_secs),
            client_ip_header,
        })
    }
}

/// Parse `LOGIN_CLIENT_IP_HEADER`. `none` (or empty) disables header lookup.
fn parse_client_ip_header(value: &str) -> Result<Option<HeaderName>, ConfigError> {
    let value = value.trim().to_ascii_lowercase();
    if value.is_empty() || value == "none" {
        return Ok(None);
    }

    HeaderName::try_from(value)
        .map(Some)
        .map_err(|e| ConfigError::InvalidEnvVar("LOGIN_CLIENT_IP_HEADER".to_string(), e.to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a token lifetime such as `24h`, `30m`, `45s` or `7d`.
///
/// A bare number is read as seconds.
///
/// # Errors
///
/// Returns a description of the problem if the string is empty, has an
/// unknown unit, or is not a positive number.
pub fn parse_lifetime(value: &str) -> Result<TimeDelta, String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(split);

    let amount: i64 = digits
        .parse()
        .map_err(|_| format!("'{value}' is not a duration like 24h, 30m or 7d"))?;
    if amount <= 0 {
        return Err(format!("'{value}' must be positive"));
    }

    let lifetime = match unit {
        "" | "s" => TimeDelta::try_seconds(amount),
        "m" => TimeDelta::try_minutes(amount),
        "h" => TimeDelta::try_hours(amount),
        "d" => TimeDelta::try_days(amount),
        other => return Err(format!("unknown duration unit '{other}' in '{value}'")),
    };

    lifetime.ok_or_else(|| format!("'{value}' is out of range"))
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
