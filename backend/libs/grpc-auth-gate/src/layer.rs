//! Tower Layer running the authentication gate in front of gRPC handlers
//!
//! A tonic `Interceptor` only sees metadata, not the method path, so the gate
//! runs one level lower on the HTTP request.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, Either, Ready};
use tonic::body::BoxBody;
use tonic::Status;
use tower::{Layer, Service};

use crate::gate::AuthGate;

/// Authentication Layer for tonic servers
///
/// ```rust,ignore
/// Server::builder()
///     .layer(AuthLayer::new(Arc::new(gate)))
///     .add_service(MarineServiceServer::new(marine))
///     .serve(addr)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct AuthLayer {
    gate: Arc<AuthGate>,
}

impl AuthLayer {
    pub fn new(gate: Arc<AuthGate>) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, service: S) -> Self::Service {
        AuthService {
            inner: service,
            gate: self.gate.clone(),
        }
    }
}

/// Rejected calls skip the inner service after `poll_ready`, so place this layer
/// outside any concurrency limit or buffer.
#[derive(Debug, Clone)]
pub struct AuthService<S> {
    inner: S,
    gate: Arc<AuthGate>,
}

impl<S, ReqBody> Service<http::Request<ReqBody>> for AuthService<S>
where
    S: Service<http::Request<ReqBody>, Response = http::Response<BoxBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Either<Ready<Result<Self::Response, Self::Error>>, S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<ReqBody>) -> Self::Future {
        // Rejected calls never reach the inner service
        match self.gate.intercept(&mut req) {
            Ok(_) => Either::Right(self.inner.call(req)),
            Err(err) => Either::Left(future::ready(Ok(Status::from(err).into_http()))),
        }
    }
}
