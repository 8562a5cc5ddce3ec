//! Client-side interceptors
//!
//! - [`CredentialInterceptor`] presents a credential on every outgoing call
//! - [`IdentityPropagationInterceptor`] mirrors an authenticated identity into
//!   outgoing metadata when a handler calls other services

use tonic::metadata::{AsciiMetadataValue, MetadataMap};
use tonic::service::Interceptor;
use tonic::{Request, Status};

use crate::extensions::IdentityExt;
use crate::gate::{HeaderScheme, AUTHORIZATION_HEADER};
use crate::identity::Identity;

/// Injects the `authorization` header into outgoing requests
///
/// The header value is parsed once at construction and cloned per call.
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_auth_gate::{CredentialInterceptor, HeaderScheme};
/// use tonic::transport::Channel;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let token = "eyJhbGc..."; // From Login
/// let interceptor = CredentialInterceptor::new(token, HeaderScheme::Raw)?;
///
/// let channel = Channel::from_static("http://[::1]:50051").connect().await?;
/// // let mut client = MarineServiceClient::with_interceptor(channel, interceptor);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CredentialInterceptor {
    auth_header: AsciiMetadataValue,
}

impl std::fmt::Debug for CredentialInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialInterceptor")
            .field("auth_header", &"[REDACTED]")
            .finish()
    }
}

impl CredentialInterceptor {
    /// ## Errors
    ///
    /// `Status::invalid_argument` if the credential is not valid header text.
    /// Issued tokens are base64url and always pass.
    pub fn new(credential: &str, scheme: HeaderScheme) -> Result<Self, Status> {
        let auth_header = AsciiMetadataValue::try_from(scheme.format(credential))
            .map_err(|_| Status::invalid_argument("credential is not valid header text"))?;

        Ok(Self { auth_header })
    }

    pub fn from_header(auth_header: AsciiMetadataValue) -> Self {
        Self { auth_header }
    }

    /// Forward the caller's header as-is, e.g. from a gateway to a backend
    pub fn forward_from(metadata: &MetadataMap) -> Result<Self, Status> {
        metadata
            .get(AUTHORIZATION_HEADER)
            .cloned()
            .map(Self::from_header)
            .ok_or_else(|| Status::unauthenticated("missing authorization token"))
    }
}

impl Interceptor for CredentialInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        request
            .metadata_mut()
            .insert(AUTHORIZATION_HEADER, self.auth_header.clone());

        Ok(request)
    }
}

/// Writes `x-subject-id` / `x-subject-name` into outgoing requests
///
/// Receivers get convenience metadata, not proof: it carries no signature.
#[derive(Debug, Clone)]
pub struct IdentityPropagationInterceptor {
    identity: Identity,
}

impl IdentityPropagationInterceptor {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    /// Interceptor for the identity of an inbound, authenticated request
    pub fn from_request<T>(request: &Request<T>) -> Result<Self, Status> {
        request.require_identity().cloned().map(Self::new)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

impl Interceptor for IdentityPropagationInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        self.identity.write_metadata(request.metadata_mut());
        Ok(request)
    }
}
