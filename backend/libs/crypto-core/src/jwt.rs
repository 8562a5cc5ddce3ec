//! HS256 credential codec for Yuyan services
//!
//! A credential is a compact JWT: `base64url(header).base64url(claims).base64url(hmac)`.
//! The header is pinned to `{"alg":"HS256","typ":"JWT"}` and the claims carry:
//!
//! - `subject_id`: numeric principal identifier
//! - `subject_name`: human-readable principal label
//! - `exp`: Unix timestamp at which the credential stops being valid
//!
//! ## Verification order
//!
//! 1. structure (exactly three segments, decodable header)
//! 2. algorithm (anything other than HS256 is rejected before signature work)
//! 3. signature (recomputed, compared in constant time by `jsonwebtoken`)
//! 4. expiry against the caller-supplied `now`
//! 5. required subject claims
//!
//! Errors never carry the secret, the signature bytes or the credential itself.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Duration;
//! use crypto_core::jwt::TokenCodec;
//!
//! let codec = TokenCodec::new(b"example-signing-secret");
//! let token = codec.issue(42, "alice", 1_700_000_000, Duration::hours(1)).unwrap();
//!
//! let claims = codec.verify(&token, 1_700_000_010).unwrap();
//! assert_eq!(claims.subject_id, 42);
//! assert_eq!(claims.subject_name, "alice");
//! ```

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;

// ============================================================================
// Constants
// ============================================================================

/// The only accepted signing algorithm
const JWT_ALGORITHM: Algorithm = Algorithm::HS256;
const JWT_ALGORITHM_NAME: &str = "HS256";

pub const CLAIM_SUBJECT_ID: &str = "subject_id";
pub const CLAIM_SUBJECT_NAME: &str = "subject_name";
pub const CLAIM_EXPIRES_AT: &str = "exp";

// ============================================================================
// Errors
// ============================================================================

/// Reason a credential failed verification
///
/// These variants are for diagnostics. Callers facing the network must collapse
/// them into a single "invalid token" answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("credential is malformed")]
    MalformedCredential,

    #[error("credential declares an unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("credential signature does not match")]
    BadSignature,

    #[error("credential has expired")]
    Expired,

    #[error("credential is missing claim `{0}`")]
    MissingClaim(&'static str),
}

/// Internal failure while minting a credential
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("subject name must not be empty")]
    EmptySubjectName,

    #[error("credential time-to-live must be at least one whole second")]
    NonPositiveTtl,

    #[error("credential expiry overflows the timestamp range")]
    ExpiryOverflow,

    #[error("failed to sign credential: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Serialize)]
struct IssuedClaims<'a> {
    subject_id: i64,
    subject_name: &'a str,
    exp: i64,
}

#[derive(Deserialize)]
struct SegmentHeader {
    alg: String,
}

/// Claims of a verified credential
///
/// Only `subject_id` and `subject_name` are guaranteed by verification. `raw`
/// holds the full claims object as it was signed.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub subject_id: i64,
    pub subject_name: String,
    pub expires_at: i64,
    pub raw: Map<String, Value>,
}

// ============================================================================
// Codec
// ============================================================================

/// Issues and verifies HS256 credentials with one shared secret
///
/// Keys are derived once at construction; the codec is immutable afterwards and
/// can be shared across calls behind an `Arc`.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &JWT_ALGORITHM)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8]) -> Self {
        // Expiry and subject claims are checked here against an injected clock,
        // so the library only handles structure, algorithm and signature.
        let mut validation = Validation::new(JWT_ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Mint a credential for `subject_id` valid from `now` for `ttl`
    ///
    /// `exp` has one-second resolution, so `ttl` is truncated to whole seconds.
    ///
    /// ## Errors
    ///
    /// All errors are internal conditions (bad caller input or a signing
    /// failure), never authentication outcomes.
    pub fn issue(
        &self,
        subject_id: i64,
        subject_name: &str,
        now: i64,
        ttl: Duration,
    ) -> Result<String, IssueError> {
        if subject_name.is_empty() {
            return Err(IssueError::EmptySubjectName);
        }

        let ttl_secs = ttl.num_seconds();
        if ttl_secs <= 0 {
            return Err(IssueError::NonPositiveTtl);
        }

        let exp = now
            .checked_add(ttl_secs)
            .ok_or(IssueError::ExpiryOverflow)?;

        let claims = IssuedClaims {
            subject_id,
            subject_name,
            exp,
        };

        Ok(encode(
            &Header::new(JWT_ALGORITHM),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Verify `token` at time `now` (Unix seconds)
    pub fn verify(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let header = header_segment(token)?;
        check_algorithm(header)?;

        let token_data = decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)
            .map_err(classify_decode_error)?;
        let raw = token_data.claims;

        let expires_at = raw
            .get(CLAIM_EXPIRES_AT)
            .and_then(Value::as_i64)
            .ok_or(TokenError::MissingClaim(CLAIM_EXPIRES_AT))?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }

        let subject_id = raw
            .get(CLAIM_SUBJECT_ID)
            .and_then(Value::as_i64)
            .ok_or(TokenError::MissingClaim(CLAIM_SUBJECT_ID))?;

        let subject_name = raw
            .get(CLAIM_SUBJECT_NAME)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(TokenError::MissingClaim(CLAIM_SUBJECT_NAME))?;

        Ok(Claims {
            subject_id,
            subject_name,
            expires_at,
            raw,
        })
    }
}

/// Returns the header segment if `token` has exactly three non-empty segments
fn header_segment(token: &str) -> Result<&str, TokenError> {
    let mut segments = token.split('.');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok(header)
        }
        _ => Err(TokenError::MalformedCredential),
    }
}

/// Pins the declared algorithm before any signature work happens
fn check_algorithm(header_segment: &str) -> Result<(), TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(header_segment)
        .map_err(|_| TokenError::MalformedCredential)?;
    let header: SegmentHeader =
        serde_json::from_slice(&bytes).map_err(|_| TokenError::MalformedCredential)?;

    if header.alg == JWT_ALGORITHM_NAME {
        Ok(())
    } else {
        Err(TokenError::UnsupportedAlgorithm)
    }
}

fn classify_decode_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature => TokenError::BadSignature,
        ErrorKind::InvalidAlgorithm => TokenError::UnsupportedAlgorithm,
        _ => TokenError::MalformedCredential,
    }
}

// ============================================================================
// Issuer
// ============================================================================

/// Mints credentials with a fixed time-to-live at the current clock time
///
/// This is what registration and login call once a principal is known.
#[derive(Clone)]
pub struct TokenIssuer {
    codec: Arc<TokenCodec>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(codec: Arc<TokenCodec>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { codec, ttl, clock }
    }

    pub fn issue(&self, subject_id: i64, subject_name: &str) -> Result<String, IssueError> {
        self.codec
            .issue(subject_id, subject_name, self.clock.now(), self.ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// ============================================================================
// Tests
// ============================================================================
