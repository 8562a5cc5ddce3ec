//! Handler-side access to the authenticated identity

use tonic::{Request, Status};

use crate::carrier::CallScope;
use crate::identity::Identity;

/// Identity accessors for gRPC handlers
///
/// Implemented for every `Request<T>`. Reads whatever the gate attached to the
/// call scope; it never looks at the raw credential.
///
/// ## Usage
///
/// ```rust,no_run
/// use grpc_auth_gate::IdentityExt;
/// use tonic::{Request, Response, Status};
///
/// async fn delete_history(request: Request<()>) -> Result<Response<()>, Status> {
///     let identity = request.require_identity()?;
///
///     let history_owner_id = 42; // From storage
///     request.require_subject(history_owner_id)?;
///
///     tracing::info!(subject_id = identity.subject_id, "Deleting history");
///     Ok(Response::new(()))
/// }
/// ```
pub trait IdentityExt {
    /// Identity attached by the gate, `None` on bypassed methods
    fn identity(&self) -> Option<&Identity>;

    /// Identity or `Status::unauthenticated`
    fn require_identity(&self) -> Result<&Identity, Status>;

    /// Identity for handlers that are only reachable through the gate
    ///
    /// # Panics
    ///
    /// Panics when no identity is attached. Behind the recovery layer this
    /// surfaces to the client as an internal error.
    fn expect_identity(&self) -> &Identity;

    /// Fails with `Status::permission_denied` unless the caller is `subject_id`
    fn require_subject(&self, subject_id: i64) -> Result<&Identity, Status>;
}

impl<T> IdentityExt for Request<T> {
    fn identity(&self) -> Option<&Identity> {
        self.extensions().current_identity()
    }

    fn require_identity(&self) -> Result<&Identity, Status> {
        self.identity()
            .ok_or_else(|| Status::unauthenticated("missing authenticated identity"))
    }

    fn expect_identity(&self) -> &Identity {
        match self.identity() {
            Some(identity) => identity,
            None => panic!("identity requested on a call without an authenticated identity"),
        }
    }

    fn require_subject(&self, subject_id: i64) -> Result<&Identity, Status> {
        let identity = self.require_identity()?;

        if !identity.is_subject(subject_id) {
            return Err(Status::permission_denied(
                "caller is not the owner of this resource",
            ));
        }

        Ok(identity)
    }
}
