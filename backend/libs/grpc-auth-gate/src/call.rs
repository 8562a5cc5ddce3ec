//! Minimal view of an inbound call
//!
//! The gate needs three things from a transport: the method identifier, a
//! header lookup, and mutable call-scoped state to carry the identity.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::carrier::CallScope;

pub trait InboundCall {
    type Scope: CallScope;

    /// Fully qualified method, e.g. `/user.v1.UserService/Login`
    fn method_id(&self) -> &str;

    /// Header value by exact key
    ///
    /// Values that are not valid UTF-8 are decoded lossily so they fail
    /// verification instead of looking absent.
    fn header(&self, name: &str) -> Option<Cow<'_, str>>;

    fn scope(&self) -> &Self::Scope;

    fn scope_mut(&mut self) -> &mut Self::Scope;
}

/// gRPC over HTTP/2: the method is the request path
impl<B> InboundCall for http::Request<B> {
    type Scope = http::Extensions;

    fn method_id(&self) -> &str {
        self.uri().path()
    }

    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers()
            .get(name)
            .map(|value| String::from_utf8_lossy(value.as_bytes()))
    }

    fn scope(&self) -> &Self::Scope {
        self.extensions()
    }

    fn scope_mut(&mut self) -> &mut Self::Scope {
        self.extensions_mut()
    }
}

/// Transport-neutral call with case-sensitive header keys
#[derive(Debug, Default)]
pub struct CallDescriptor {
    method: String,
    headers: HashMap<String, String>,
    extensions: http::Extensions,
}

impl CallDescriptor {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    pub fn into_extensions(self) -> http::Extensions {
        self.extensions
    }
}

impl InboundCall for CallDescriptor {
    type Scope = http::Extensions;

    fn method_id(&self) -> &str {
        &self.method
    }

    fn header(&self, name: &str) -> Option<Cow<'_, str>> {
        self.headers.get(name).map(|value| Cow::Borrowed(value.as_str()))
    }

    fn scope(&self) -> &Self::Scope {
        &self.extensions
    }

    fn scope_mut(&mut self) -> &mut Self::Scope {
        &mut self.extensions
    }
}
