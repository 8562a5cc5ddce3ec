//! Panic recovery for gRPC handlers
//!
//! A handler that panics (for example via `IdentityExt::expect_identity` on a
//! bypassed method) answers with `INTERNAL` instead of tearing down the
//! connection task.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt};
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};
use tracing::error;

#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryLayer;

impl RecoveryLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RecoveryLayer {
    type Service = RecoveryService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RecoveryService { inner: service }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryService<S> {
    inner: S,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for RecoveryService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<ReqBody>) -> Self::Future {
        let method = req.uri().path().to_string();

        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| self.inner.call(req))) {
            Ok(future) => future,
            Err(panic) => return future::ready(Ok(internal_error(&method, panic))).boxed(),
        };

        async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => Ok(internal_error(&method, panic)),
            }
        }
        .boxed()
    }
}

fn internal_error(method: &str, panic: Box<dyn Any + Send>) -> http::Response<BoxBody> {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");

    error!(method, panic = message, "Handler panicked");

    Status::internal("internal server error").into_http()
}
