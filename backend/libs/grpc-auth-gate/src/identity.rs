//! Authenticated identity
//!
//! An [`Identity`] only comes out of successful credential verification and lives
//! for exactly one call. This module also defines its outbound metadata form,
//! used when a handler fans out to other services.

use crypto_core::jwt::Claims;
use serde::{Deserialize, Serialize};
use tonic::metadata::{AsciiMetadataValue, MetadataMap};

/// Outbound metadata key carrying the subject id as a decimal string
pub const SUBJECT_ID_METADATA_KEY: &str = "x-subject-id";

/// Outbound metadata key carrying the percent-encoded subject name
pub const SUBJECT_NAME_METADATA_KEY: &str = "x-subject-name";

/// Caller identity derived from a verified credential
///
/// Fields are public for direct access; only the gate constructs one from a
/// credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub subject_id: i64,
    pub subject_name: String,
}

impl Identity {
    pub fn new(subject_id: i64, subject_name: impl Into<String>) -> Self {
        Self {
            subject_id,
            subject_name: subject_name.into(),
        }
    }

    /// Bridge between the codec and the gate: keeps only the two trusted claims
    pub fn from_verified_claims(claims: &Claims) -> Self {
        Self {
            subject_id: claims.subject_id,
            subject_name: claims.subject_name.clone(),
        }
    }

    /// Whether this identity is the given subject
    ///
    /// Useful for resource ownership checks:
    ///
    /// ```rust
    /// use grpc_auth_gate::Identity;
    ///
    /// let identity = Identity::new(42, "alice");
    /// let history_owner_id = 42; // From storage
    ///
    /// assert!(identity.is_subject(history_owner_id));
    /// ```
    pub fn is_subject(&self, subject_id: i64) -> bool {
        self.subject_id == subject_id
    }

    /// Mirror this identity into outbound metadata
    ///
    /// The receiving service gets plain key/value pairs. This is a convenience
    /// export, not proof of identity: receivers must establish trust in the
    /// sender on their own.
    pub fn write_metadata(&self, metadata: &mut MetadataMap) {
        metadata.insert(
            SUBJECT_ID_METADATA_KEY,
            AsciiMetadataValue::from(self.subject_id),
        );

        // Percent-encoding only emits visible ASCII, so non-ASCII names survive
        let encoded = urlencoding::encode(&self.subject_name);
        if let Ok(value) = AsciiMetadataValue::try_from(encoded.as_ref()) {
            metadata.insert(SUBJECT_NAME_METADATA_KEY, value);
        }
    }

    /// Read an identity mirrored by [`Identity::write_metadata`]
    ///
    /// Returns `None` unless both entries are present and well-formed.
    pub fn from_metadata(metadata: &MetadataMap) -> Option<Self> {
        let subject_id = metadata
            .get(SUBJECT_ID_METADATA_KEY)?
            .to_str()
            .ok()?
            .parse::<i64>()
            .ok()?;

        let raw_name = metadata.get(SUBJECT_NAME_METADATA_KEY)?.to_str().ok()?;
        let subject_name = urlencoding::decode(raw_name).ok()?.into_owned();

        Some(Self {
            subject_id,
            subject_name,
        })
    }
}
