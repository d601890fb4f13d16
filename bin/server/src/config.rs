//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, using `__` as
//! the section separator. For example `SESSION__SIGNING_KEY`,
//! `ACCESS__SHARED_SECRET` or `FEATURES__SECRET_MUTATIONS`.

use league_gate_core::SecretString;
use league_gate_platform_access::{DEFAULT_TOKEN_VALIDITY_DAYS, MIN_KEY_LENGTH};
use rootcause::prelude::Report;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Session token and cookie configuration.
    #[serde(default)]
    pub session: SessionConfig,

    /// External identity provider configuration.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Authorization configuration.
    #[serde(default)]
    pub access: AccessConfig,

    /// Feature flags read from the shared configuration surface.
    #[serde(default)]
    pub features: FeatureFlags,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

/// Session-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC key for session tokens. At least 32 bytes.
    #[serde(default)]
    pub signing_key: SecretString,

    /// Primary session cookie name.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Legacy session cookie name, still accepted on requests.
    #[serde(default = "default_legacy_cookie_name")]
    pub legacy_cookie_name: String,

    /// Whether to set the Secure flag on cookies (requires HTTPS).
    /// Defaults to true for production safety; set to false for local HTTP development.
    #[serde(default = "default_secure_cookies")]
    pub secure_cookies: bool,

    /// Cookie lifetime for a regular sign-in, in hours.
    #[serde(default = "default_short_cookie_hours")]
    pub short_cookie_hours: i64,

    /// Cookie lifetime when the caller asked to be remembered, in days.
    #[serde(default = "default_long_cookie_days")]
    pub long_cookie_days: i64,

    /// Validity of issued tokens, in days.
    #[serde(default = "default_token_validity_days")]
    pub token_validity_days: i64,
}

fn default_cookie_name() -> String {
    "session".to_string()
}

fn default_legacy_cookie_name() -> String {
    "auth_token".to_string()
}

fn default_secure_cookies() -> bool {
    true
}

fn default_short_cookie_hours() -> i64 {
    24
}

fn default_long_cookie_days() -> i64 {
    30
}

fn default_token_validity_days() -> i64 {
    DEFAULT_TOKEN_VALIDITY_DAYS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            signing_key: SecretString::default(),
            cookie_name: default_cookie_name(),
            legacy_cookie_name: default_legacy_cookie_name(),
            secure_cookies: default_secure_cookies(),
            short_cookie_hours: default_short_cookie_hours(),
            long_cookie_days: default_long_cookie_days(),
            token_validity_days: default_token_validity_days(),
        }
    }
}

/// External identity provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the provider API.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// Project id used as the basic-auth user.
    #[serde(default)]
    pub project_id: String,

    /// Project secret used as the basic-auth password.
    #[serde(default)]
    pub secret: SecretString,

    /// Timeout for every provider call, in milliseconds.
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_provider_base_url() -> String {
    "https://api.stytch.com/v1".to_string()
}

fn default_provider_timeout_ms() -> u64 {
    5_000
}

impl ProviderConfig {
    /// Returns the provider call timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            project_id: String::new(),
            secret: SecretString::default(),
            timeout_ms: default_provider_timeout_ms(),
        }
    }
}

/// Authorization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Shared administrative secret accepted on opted-in routes.
    #[serde(default)]
    pub shared_secret: Option<SecretString>,

    /// Timeout for membership lookups, in milliseconds.
    #[serde(default = "default_resolver_timeout_ms")]
    pub resolver_timeout_ms: u64,

    /// Optional membership cache.
    #[serde(default)]
    pub membership_cache: MembershipCacheConfig,

    /// Link unlinked players to new subjects by verified phone number.
    #[serde(default = "default_link_players_by_phone")]
    pub link_players_by_phone: bool,
}

fn default_resolver_timeout_ms() -> u64 {
    2_000
}

fn default_link_players_by_phone() -> bool {
    true
}

impl AccessConfig {
    /// Returns the membership lookup timeout.
    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_timeout_ms)
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            shared_secret: None,
            resolver_timeout_ms: default_resolver_timeout_ms(),
            membership_cache: MembershipCacheConfig::default(),
            link_players_by_phone: default_link_players_by_phone(),
        }
    }
}

/// Membership cache configuration.
///
/// Only misses are cached. A membership created without an invalidation may
/// be denied for up to `ttl_seconds`.
#[derive(Debug, Clone, Deserialize)]
pub struct MembershipCacheConfig {
    /// Whether the cache is used.
    #[serde(default)]
    pub enabled: bool,

    /// Entry lifetime, in seconds.
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Maximum number of entries.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_ttl_seconds() -> u64 {
    30
}

fn default_cache_capacity() -> usize {
    10_000
}

impl MembershipCacheConfig {
    /// Returns the entry lifetime.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for MembershipCacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_cache_ttl_seconds(),
            capacity: default_cache_capacity(),
        }
    }
}

/// Feature flags consumed, not owned, by this server.
///
/// Other flags on the shared `features` section, such as the scoring
/// fallback switch, belong to other services and are ignored here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeatureFlags {
    /// Allow the shared administrative secret on opted-in routes.
    #[serde(default)]
    pub secret_mutations: bool,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment could not be read or deserialized.
    Load { details: String },
    /// A value was read but is not usable.
    Invalid { field: &'static str, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load { details } => write!(f, "failed to load configuration: {}", details),
            Self::Invalid { field, reason } => {
                write!(f, "invalid configuration for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, Report<ConfigError>> {
        let config: Self = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|built| built.try_deserialize())
            .map_err(|e| ConfigError::Load {
                details: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key_len = self.session.signing_key.expose_secret().len();
        if key_len < MIN_KEY_LENGTH {
            return Err(ConfigError::Invalid {
                field: "session.signing_key",
                reason: format!("must be at least {} bytes, got {}", MIN_KEY_LENGTH, key_len),
            });
        }
        if self.session.token_validity_days <= 0 {
            return Err(ConfigError::Invalid {
                field: "session.token_validity_days",
                reason: "must be positive".to_string(),
            });
        }
        if self.access.membership_cache.enabled && self.access.membership_cache.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "access.membership_cache.capacity",
                reason: "must be positive when the cache is enabled".to_string(),
            });
        }
        if self.features.secret_mutations
            && self.access.shared_secret.as_ref().is_none_or(SecretString::is_empty)
        {
            tracing::warn!("secret mutations enabled but no shared secret configured");
        }
        Ok(())
    }
}
