//! Integration Tests for the authentication gate
//!
//! These tests drive the complete flow:
//! Client interceptor -> metadata on the wire -> AuthLayer -> handler access

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Duration;
use futures::future::{self, Ready};
use grpc_auth_gate::{
    AuthGate, AuthLayer, BypassRegistry, CredentialInterceptor, HeaderScheme, Identity,
    IdentityExt, IdentityPropagationInterceptor, ManualClock, RecoveryLayer, TokenCodec,
    TokenIssuer,
};
use tonic::body::BoxBody;
use tonic::service::Interceptor;
use tonic::Request;
use tower::{Layer, Service, ServiceBuilder, ServiceExt};

const SECRET: &[u8] = b"integration-test-secret-with-enough-length";
const NOW: i64 = 1_700_000_000;

const ADD_HISTORY: &str = "/marine.v1.MarineService/AddHistory";
const LOGIN: &str = "/user.v1.UserService/Login";
const REGISTER: &str = "/user.v1.UserService/Register";

/// What the handler saw, stored in the response extensions
#[derive(Debug, Clone, PartialEq)]
struct Seen {
    identity: Option<Identity>,
    outbound: Option<Identity>,
}

struct Harness {
    codec: Arc<TokenCodec>,
    clock: Arc<ManualClock>,
    issuer: TokenIssuer,
    gate: Arc<AuthGate>,
    calls: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self::with_scheme(HeaderScheme::Raw)
    }

    fn with_scheme(scheme: HeaderScheme) -> Self {
        let codec = Arc::new(TokenCodec::new(SECRET));
        let clock = Arc::new(ManualClock::new(NOW));
        let issuer = TokenIssuer::new(codec.clone(), Duration::hours(1), clock.clone());
        let gate = Arc::new(
            AuthGate::new(codec.clone(), BypassRegistry::with_defaults())
                .with_clock(clock.clone())
                .with_header_scheme(scheme),
        );

        Self {
            codec,
            clock,
            issuer,
            gate,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handler that records the identity it observed and what it would propagate
    fn handler(
        &self,
    ) -> impl Service<
        http::Request<()>,
        Response = http::Response<BoxBody>,
        Error = Infallible,
        Future = Ready<Result<http::Response<BoxBody>, Infallible>>,
    > + Clone {
        let calls = self.calls.clone();

        tower::service_fn(move |req: http::Request<()>| {
            calls.fetch_add(1, Ordering::SeqCst);

            let request = Request::from_http(req);
            let outbound = IdentityPropagationInterceptor::from_request(&request)
                .ok()
                .and_then(|mut interceptor| interceptor.call(Request::new(())).ok())
                .and_then(|outgoing| Identity::from_metadata(outgoing.metadata()));

            let seen = Seen {
                identity: request.identity().cloned(),
                outbound,
            };

            let mut response = http::Response::new(tonic::body::empty_body());
            response.extensions_mut().insert(seen);
            future::ready(Ok(response))
        })
    }

    async fn call(&self, method: &str, interceptor: Option<CredentialInterceptor>) -> Reply {
        let service = AuthLayer::new(self.gate.clone()).layer(self.handler());
        let response = service
            .oneshot(wire_request(method, interceptor))
            .await
            .unwrap();
        Reply::from(response)
    }

    fn token(&self, subject_id: i64, subject_name: &str) -> String {
        self.issuer
            .issue(subject_id, subject_name)
            .expect("Failed to issue token")
    }

    fn handler_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Client request serialized the way it would travel: metadata becomes headers
fn wire_request(method: &str, interceptor: Option<CredentialInterceptor>) -> http::Request<()> {
    let mut request = Request::new(());
    if let Some(mut interceptor) = interceptor {
        request = interceptor.call(request).expect("interceptor should succeed");
    }

    let (metadata, _, ()) = request.into_parts();
    let mut http_request = http::Request::builder().uri(method).body(()).unwrap();
    *http_request.headers_mut() = metadata.into_headers();
    http_request
}

fn raw(token: &str) -> Option<CredentialInterceptor> {
    Some(CredentialInterceptor::new(token, HeaderScheme::Raw).unwrap())
}

struct Reply {
    grpc_status: Option<String>,
    grpc_message: Option<String>,
    seen: Option<Seen>,
}

impl From<http::Response<BoxBody>> for Reply {
    fn from(response: http::Response<BoxBody>) -> Self {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Self {
            grpc_status: header("grpc-status"),
            grpc_message: header("grpc-message"),
            seen: response.extensions().get::<Seen>().cloned(),
        }
    }
}

impl Reply {
    fn is_unauthenticated(&self) -> bool {
        self.grpc_status.as_deref() == Some("16")
    }
}

#[tokio::test]
async fn test_end_to_end_authenticated_call() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    let reply = harness.call(ADD_HISTORY, raw(&token)).await;

    assert_eq!(reply.grpc_status, None);
    let seen = reply.seen.expect("handler should run");
    assert_eq!(seen.identity, Some(Identity::new(42, "alice")));
    assert_eq!(harness.handler_calls(), 1);
}

#[tokio::test]
async fn test_missing_token_rejected_before_handler() {
    let harness = Harness::new();

    let reply = harness.call(ADD_HISTORY, None).await;

    assert!(reply.is_unauthenticated());
    assert_eq!(
        reply.grpc_message.as_deref(),
        Some("missing%20authorization%20token")
    );
    assert!(reply.seen.is_none());
    assert_eq!(harness.handler_calls(), 0);
}

#[tokio::test]
async fn test_empty_token_is_missing() {
    let harness = Harness::new();

    let reply = harness.call(ADD_HISTORY, raw("")).await;

    assert!(reply.is_unauthenticated());
    assert_eq!(
        reply.grpc_message.as_deref(),
        Some("missing%20authorization%20token")
    );
    assert_eq!(harness.handler_calls(), 0);
}

#[tokio::test]
async fn test_failures_share_one_outward_message() {
    let harness = Harness::new();

    let foreign = TokenCodec::new(b"some-other-service-secret");
    let wrong_secret = foreign
        .issue(42, "alice", NOW, Duration::hours(1))
        .unwrap();
    let garbage = "not-a-jwt".to_string();

    let mut tampered = harness.token(42, "alice");
    tampered.push('x');

    for token in [wrong_secret, garbage, tampered] {
        let reply = harness.call(ADD_HISTORY, raw(&token)).await;

        assert!(reply.is_unauthenticated());
        assert_eq!(
            reply.grpc_message.as_deref(),
            Some("invalid%20authorization%20token")
        );
        assert!(reply.seen.is_none());
    }
    assert_eq!(harness.handler_calls(), 0);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    harness.clock.advance(Duration::hours(1));
    let reply = harness.call(ADD_HISTORY, raw(&token)).await;

    assert!(reply.is_unauthenticated());
    assert_eq!(harness.handler_calls(), 0);
}

#[tokio::test]
async fn test_token_valid_until_expiry() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    harness.clock.advance(Duration::seconds(3599));
    let reply = harness.call(ADD_HISTORY, raw(&token)).await;

    assert_eq!(reply.grpc_status, None);
    assert_eq!(harness.handler_calls(), 1);
}

#[tokio::test]
async fn test_bypassed_methods_need_no_token() {
    let harness = Harness::new();

    for method in [LOGIN, REGISTER] {
        let reply = harness.call(method, None).await;

        assert_eq!(reply.grpc_status, None);
        assert_eq!(reply.seen.unwrap().identity, None);
    }
    assert_eq!(harness.handler_calls(), 2);
}

#[tokio::test]
async fn test_bypassed_method_ignores_presented_token() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    let reply = harness.call(LOGIN, raw(&token)).await;

    assert_eq!(reply.seen.unwrap().identity, None);
}

#[tokio::test]
async fn test_bypassed_method_accepts_garbage_token() {
    let harness = Harness::new();

    let reply = harness.call(REGISTER, raw("garbage")).await;

    assert_eq!(reply.grpc_status, None);
    assert_eq!(harness.handler_calls(), 1);
}

#[tokio::test]
async fn test_bearer_scheme_end_to_end() {
    let harness = Harness::with_scheme(HeaderScheme::Bearer);
    let token = harness.token(7, "bob");

    let bearer = CredentialInterceptor::new(&token, HeaderScheme::Bearer).unwrap();
    let reply = harness.call(ADD_HISTORY, Some(bearer)).await;
    assert_eq!(reply.seen.unwrap().identity, Some(Identity::new(7, "bob")));

    let reply = harness.call(ADD_HISTORY, raw(&token)).await;
    assert!(reply.is_unauthenticated());
}

#[tokio::test]
async fn test_identity_propagated_to_downstream_metadata() {
    let harness = Harness::new();
    let token = harness.token(42, "김 diver");

    let reply = harness.call(ADD_HISTORY, raw(&token)).await;

    let seen = reply.seen.unwrap();
    assert_eq!(seen.outbound, Some(Identity::new(42, "김 diver")));
    assert_eq!(seen.outbound, seen.identity);
}

#[tokio::test]
async fn test_gateway_forwards_caller_credential() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    // Gateway receives the client's metadata and forwards it unchanged
    let mut client = raw(&token).unwrap();
    let inbound = client.call(Request::new(())).unwrap();
    let forwarder = CredentialInterceptor::forward_from(inbound.metadata()).unwrap();

    let reply = harness.call(ADD_HISTORY, Some(forwarder)).await;

    assert_eq!(reply.seen.unwrap().identity, Some(Identity::new(42, "alice")));
}

#[tokio::test]
async fn test_identity_assertion_on_bypassed_method_is_internal() {
    let harness = Harness::new();

    let service = ServiceBuilder::new()
        .layer(RecoveryLayer::new())
        .layer(AuthLayer::new(harness.gate.clone()))
        .service(tower::service_fn(|req: http::Request<()>| {
            let request = Request::from_http(req);
            let _owner = request.expect_identity();
            future::ready(Ok::<_, Infallible>(http::Response::new(
                tonic::body::empty_body(),
            )))
        }));

    let reply = Reply::from(service.oneshot(wire_request(LOGIN, None)).await.unwrap());

    assert_eq!(reply.grpc_status.as_deref(), Some("13"));
}

#[tokio::test]
async fn test_concurrent_calls_keep_identities_apart() {
    let harness = Arc::new(Harness::new());
    let service = AuthLayer::new(harness.gate.clone()).layer(harness.handler());

    let mut tasks = Vec::new();
    for subject_id in 1..=32i64 {
        let token = harness.token(subject_id, &format!("diver-{}", subject_id));
        let service = service.clone();

        tasks.push(tokio::spawn(async move {
            let response = service
                .oneshot(wire_request(ADD_HISTORY, raw(&token)))
                .await
                .unwrap();
            (subject_id, Reply::from(response))
        }));
    }

    for task in tasks {
        let (subject_id, reply) = task.await.unwrap();
        let identity = reply.seen.unwrap().identity.unwrap();

        assert_eq!(identity.subject_id, subject_id);
        assert_eq!(identity.subject_name, format!("diver-{}", subject_id));
    }
    assert_eq!(harness.handler_calls(), 32);
}

#[tokio::test]
async fn test_rejected_call_does_not_disturb_concurrent_success() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    let (ok, denied) = tokio::join!(
        harness.call(ADD_HISTORY, raw(&token)),
        harness.call(ADD_HISTORY, raw("forged")),
    );

    assert_eq!(ok.seen.unwrap().identity, Some(Identity::new(42, "alice")));
    assert!(denied.is_unauthenticated());
    assert_eq!(harness.handler_calls(), 1);
}

#[test]
fn test_codec_shared_by_issuer_and_gate() {
    let harness = Harness::new();
    let token = harness.token(42, "alice");

    let claims = harness.codec.verify(&token, NOW).unwrap();

    assert_eq!(claims.subject_id, 42);
    assert_eq!(claims.expires_at, NOW + 3600);
}
