//! Identity carrier over call-scoped state
//!
//! The identity is stored under a private wrapper type, so no other component
//! can collide with it or forge it by inserting a bare [`Identity`].
//!
//! Contract:
//! - the gate attaches once per authenticated call, before the handler runs
//! - handlers only read; a second attach overwrites
//! - absence is a valid state (bypassed methods) and is not an error here

use crate::identity::Identity;

#[derive(Clone)]
struct AuthenticatedIdentity(Identity);

/// Call-scoped storage able to carry an authenticated identity
pub trait CallScope {
    fn attach_identity(&mut self, identity: Identity);

    fn current_identity(&self) -> Option<&Identity>;
}

/// Also serves handlers: `tonic::Extensions` is this same type
impl CallScope for http::Extensions {
    fn attach_identity(&mut self, identity: Identity) {
        self.insert(AuthenticatedIdentity(identity));
    }

    fn current_identity(&self) -> Option<&Identity> {
        self.get::<AuthenticatedIdentity>().map(|carried| &carried.0)
    }
}
