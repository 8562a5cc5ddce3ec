//! Interception gate
//!
//! Decides, for every inbound call, whether it proceeds and under which
//! identity.
//!
//! ```text
//! START → BYPASS_CHECK ─┬─────────────────────────────────────────────→ PASSED
//!                       └→ HEADER_CHECK → CREDENTIAL_CHECK → IDENTITY_ATTACHED → PASSED
//!                               │               │
//!                               └→ FAILED       └→ FAILED
//! ```
//!
//! Steps run strictly in order and stop at the first failure. The call scope is
//! only written after verification succeeded, so a rejected call never carries
//! a partial identity.

use std::str::FromStr;
use std::sync::Arc;

use crypto_core::clock::{Clock, SystemClock};
use crypto_core::jwt::{TokenCodec, TokenError};
use tracing::{debug, warn};

use crate::bypass::BypassRegistry;
use crate::call::InboundCall;
use crate::carrier::CallScope;
use crate::config::AuthSettings;
use crate::error::AuthError;
use crate::identity::Identity;

/// Metadata key carrying the credential (gRPC metadata keys are lowercase)
pub const AUTHORIZATION_HEADER: &str = "authorization";

const BEARER_PREFIX: &str = "Bearer ";

/// How the credential sits inside the authorization header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderScheme {
    /// The whole header value is the credential
    #[default]
    Raw,
    /// The header must read `Bearer <credential>`
    Bearer,
}

impl HeaderScheme {
    /// Credential part of a header value, `None` if the scheme does not match
    pub fn extract<'a>(&self, header_value: &'a str) -> Option<&'a str> {
        match self {
            HeaderScheme::Raw => Some(header_value),
            HeaderScheme::Bearer => header_value.strip_prefix(BEARER_PREFIX),
        }
    }

    /// Header value presenting `credential` under this scheme
    pub fn format(&self, credential: &str) -> String {
        match self {
            HeaderScheme::Raw => credential.to_string(),
            HeaderScheme::Bearer => format!("{}{}", BEARER_PREFIX, credential),
        }
    }
}

impl FromStr for HeaderScheme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(HeaderScheme::Raw),
            "bearer" => Ok(HeaderScheme::Bearer),
            other => Err(anyhow::anyhow!(
                "unknown header scheme `{}` (expected `raw` or `bearer`)",
                other
            )),
        }
    }
}

/// A call that may proceed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Public method: no credential checked, no identity attached
    Bypassed,
    /// Credential verified; the identity is attached to the call scope
    Authenticated(Identity),
}

/// Per-call authentication decision point
///
/// Holds only read-only state (codec keys, bypass set, clock), so one instance
/// is shared by all concurrent calls behind an `Arc`.
///
/// ## Usage
///
/// ```rust
/// use std::sync::Arc;
/// use chrono::Duration;
/// use crypto_core::jwt::TokenCodec;
/// use grpc_auth_gate::{AuthGate, BypassRegistry, CallDescriptor, CallScope, Outcome};
///
/// let codec = Arc::new(TokenCodec::new(b"gate-doc-secret"));
/// let gate = AuthGate::new(codec.clone(), BypassRegistry::with_defaults());
///
/// let now = chrono::Utc::now().timestamp();
/// let token = codec.issue(42, "alice", now, Duration::hours(1)).unwrap();
/// let mut call = CallDescriptor::new("/marine.v1.MarineService/AddHistory")
///     .with_header("authorization", token);
///
/// let outcome = gate.intercept(&mut call).unwrap();
/// assert!(matches!(outcome, Outcome::Authenticated(_)));
/// assert_eq!(call.extensions().current_identity().unwrap().subject_id, 42);
/// ```
#[derive(Clone)]
pub struct AuthGate {
    codec: Arc<TokenCodec>,
    registry: Arc<BypassRegistry>,
    clock: Arc<dyn Clock>,
    scheme: HeaderScheme,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("registry", &self.registry)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    pub fn new(codec: Arc<TokenCodec>, registry: BypassRegistry) -> Self {
        Self {
            codec,
            registry: Arc::new(registry),
            clock: Arc::new(SystemClock),
            scheme: HeaderScheme::default(),
        }
    }

    /// Gate configured from loaded settings, sharing `codec` with the issuer
    pub fn from_settings(settings: &AuthSettings, codec: Arc<TokenCodec>) -> Self {
        Self::new(codec, settings.bypass_registry()).with_header_scheme(settings.header_scheme)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_header_scheme(mut self, scheme: HeaderScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn registry(&self) -> &BypassRegistry {
        &self.registry
    }

    pub fn header_scheme(&self) -> HeaderScheme {
        self.scheme
    }

    /// Run the gate for one call
    ///
    /// ## Errors
    ///
    /// - `AuthError::MissingToken` if the header is absent or empty
    /// - `AuthError::InvalidToken` for any scheme or verification failure
    ///
    /// Both are terminal: the caller must not run the handler.
    pub fn intercept<C>(&self, call: &mut C) -> Result<Outcome, AuthError>
    where
        C: InboundCall + ?Sized,
    {
        if self.registry.is_bypassed(call.method_id()) {
            debug!(
                method = call.method_id(),
                decision = "bypassed",
                "Authentication not required"
            );
            return Ok(Outcome::Bypassed);
        }

        let identity = match self.authenticate(&*call) {
            Ok(identity) => identity,
            Err(err) => {
                warn!(
                    method = call.method_id(),
                    decision = "denied",
                    reason = %err.diagnostic(),
                    "Call rejected"
                );
                return Err(err);
            }
        };

        debug!(
            method = call.method_id(),
            decision = "allowed",
            subject_id = identity.subject_id,
            "Call authenticated"
        );

        call.scope_mut().attach_identity(identity.clone());
        Ok(Outcome::Authenticated(identity))
    }

    fn authenticate<C>(&self, call: &C) -> Result<Identity, AuthError>
    where
        C: InboundCall + ?Sized,
    {
        let header = call
            .header(AUTHORIZATION_HEADER)
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let credential = self
            .scheme
            .extract(&header)
            .ok_or(AuthError::InvalidToken(TokenError::MalformedCredential))?;

        let claims = self
            .codec
            .verify(credential, self.clock.now())
            .map_err(AuthError::InvalidToken)?;

        Ok(Identity::from_verified_claims(&claims))
    }
}
