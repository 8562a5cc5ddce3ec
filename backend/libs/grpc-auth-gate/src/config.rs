//! Authentication settings
//!
//! | Variable | Default |
//! |---|---|
//! | `JWT_SECRET` | required |
//! | `JWT_EXPIRY_SECONDS` | `86400` |
//! | `AUTH_BYPASS_METHODS` | `/user.v1.UserService/Register,/user.v1.UserService/Login` |
//! | `AUTH_HEADER_SCHEME` | `raw` |

use std::env;
use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Duration;
use crypto_core::clock::Clock;
use crypto_core::jwt::{TokenCodec, TokenIssuer};
use crypto_core::secret::{classify_secret, SecretStrength};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::bypass::{BypassRegistry, DEFAULT_BYPASS_METHODS};
use crate::gate::HeaderScheme;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 86_400;

/// Settings shared by the issuing side (Login) and the verifying side (gate)
#[derive(Clone)]
pub struct AuthSettings {
    pub secret: Zeroizing<String>,
    pub token_ttl: Duration,
    pub bypass_methods: Vec<String>,
    pub header_scheme: HeaderScheme,
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("bypass_methods", &self.bypass_methods)
            .field("header_scheme", &self.header_scheme)
            .finish()
    }
}

impl AuthSettings {
    /// Settings with defaults for everything but the secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: Zeroizing::new(secret.into()),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECONDS),
            bypass_methods: DEFAULT_BYPASS_METHODS.iter().map(|m| m.to_string()).collect(),
            header_scheme: HeaderScheme::default(),
        }
    }

    /// Load from the environment (and `.env` in debug builds)
    pub fn from_env() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
        }

        Self::load()
    }

    /// Process environment only
    fn load() -> Result<Self> {
        let secret = Zeroizing::new(env::var("JWT_SECRET").context("JWT_SECRET must be set")?);
        if secret.is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let ttl_seconds = match env::var("JWT_EXPIRY_SECONDS") {
            Ok(value) => value
                .trim()
                .parse::<i64>()
                .with_context(|| format!("JWT_EXPIRY_SECONDS is not an integer: {}", value))?,
            Err(_) => DEFAULT_TOKEN_TTL_SECONDS,
        };
        if ttl_seconds <= 0 {
            bail!("JWT_EXPIRY_SECONDS must be positive, got {}", ttl_seconds);
        }
        let token_ttl =
            Duration::try_seconds(ttl_seconds).context("JWT_EXPIRY_SECONDS is out of range")?;

        let bypass_methods = match env::var("AUTH_BYPASS_METHODS") {
            Ok(value) => parse_methods(&value),
            Err(_) => DEFAULT_BYPASS_METHODS.iter().map(|m| m.to_string()).collect(),
        };
        for method in bypass_methods.iter().filter(|m| !m.starts_with('/')) {
            warn!(method = %method, "Bypass method is not a fully qualified path and will never match");
        }

        let header_scheme = match env::var("AUTH_HEADER_SCHEME") {
            Ok(value) => value
                .parse::<HeaderScheme>()
                .context("invalid AUTH_HEADER_SCHEME")?,
            Err(_) => HeaderScheme::default(),
        };

        let strength = classify_secret(secret.as_bytes());
        if strength == SecretStrength::Weak {
            warn!(
                strength = strength.as_str(),
                "JWT_SECRET is weak; use at least 32 random bytes"
            );
        }

        let settings = Self {
            secret,
            token_ttl,
            bypass_methods,
            header_scheme,
        };

        info!(
            token_ttl_seconds = ttl_seconds,
            bypass_methods = settings.bypass_methods.len(),
            header_scheme = ?settings.header_scheme,
            "Authentication settings loaded"
        );

        Ok(settings)
    }

    pub fn codec(&self) -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(self.secret.as_bytes()))
    }

    pub fn bypass_registry(&self) -> BypassRegistry {
        BypassRegistry::new(self.bypass_methods.iter().cloned())
    }

    /// Issuer for the Login path, sharing the gate's codec
    pub fn token_issuer(&self, codec: Arc<TokenCodec>, clock: Arc<dyn Clock>) -> TokenIssuer {
        TokenIssuer::new(codec, self.token_ttl, clock)
    }
}

fn parse_methods(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
