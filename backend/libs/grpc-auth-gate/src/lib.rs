//! Request authentication gate for gRPC services
//!
//! Every inbound call passes through one gate before its handler runs. Public
//! methods (registration, login) skip it; every other call must present a valid
//! HS256 credential, and the resulting identity is carried in the call's own
//! scope for the handler to read.
//!
//! ## Core Components
//!
//! - **BypassRegistry**: exact-match set of methods that need no credential
//! - **AuthGate**: bypass check, header check, credential check, identity attach
//! - **AuthLayer**: runs the gate as a tower layer in front of tonic services
//! - **IdentityExt**: handler-side accessors for the authenticated identity
//! - **CredentialInterceptor** / **IdentityPropagationInterceptor**: outbound
//!   credential and identity metadata
//! - **RecoveryLayer**: turns handler panics into `INTERNAL`
//! - **AuthSettings**: environment-driven configuration
//!
//! ## Server Wiring
//!
//! ```rust,ignore
//! let settings = AuthSettings::from_env()?;
//! let codec = settings.codec();
//! let gate = Arc::new(AuthGate::from_settings(&settings, codec.clone()));
//! let issuer = settings.token_issuer(codec, Arc::new(SystemClock));
//!
//! Server::builder()
//!     .layer(RecoveryLayer::new())
//!     .layer(AuthLayer::new(gate))
//!     .add_service(UserServiceServer::new(UserService::new(issuer)))
//!     .add_service(MarineServiceServer::new(MarineService::default()))
//!     .serve(addr)
//!     .await?;
//! ```
//!
//! ## Handler Side
//!
//! ```rust,no_run
//! use grpc_auth_gate::IdentityExt;
//! use tonic::{Request, Response, Status};
//!
//! async fn list_history(request: Request<()>) -> Result<Response<()>, Status> {
//!     let identity = request.require_identity()?;
//!     tracing::debug!(subject_id = identity.subject_id, "Listing history");
//!     Ok(Response::new(()))
//! }
//! ```
//!
//! ## Guarantees
//!
//! - No header, or an empty one = `Status::unauthenticated("missing authorization token")`
//! - Any other credential failure = `Status::unauthenticated("invalid authorization token")`
//! - A rejected call never reaches its handler and never carries an identity
//! - A bypassed call never carries an identity, even if it sent a valid credential

mod bypass;
mod call;
mod carrier;
mod client;
mod config;
mod error;
mod extensions;
mod gate;
mod identity;
mod layer;
mod recovery;

pub use bypass::{BypassRegistry, DEFAULT_BYPASS_METHODS};
pub use call::{CallDescriptor, InboundCall};
pub use carrier::CallScope;
pub use client::{CredentialInterceptor, IdentityPropagationInterceptor};
pub use config::{AuthSettings, DEFAULT_TOKEN_TTL_SECONDS};
pub use error::AuthError;
pub use extensions::IdentityExt;
pub use gate::{AuthGate, HeaderScheme, Outcome, AUTHORIZATION_HEADER};
pub use identity::{Identity, SUBJECT_ID_METADATA_KEY, SUBJECT_NAME_METADATA_KEY};
pub use layer::{AuthLayer, AuthService};
pub use recovery::{RecoveryLayer, RecoveryService};

pub use crypto_core::{Clock, ManualClock, SystemClock, TokenCodec, TokenError, TokenIssuer};

// Re-export tonic Status for convenience
pub use tonic::Status;
