//! Bearer auth gate: tower middleware for HTTP-level credential validation.
//!
//! Provides [`BearerAuthLayer`] and [`BearerAuthService`], which extract a
//! bearer credential from the `Authorization` header, delegate verification
//! to an [`Introspect`] backend, and inject the resulting
//! [`VerifiedPrincipal`] into request extensions.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use tower::Layer;

use super::error::AuthError;
use super::introspect::Introspect;

/// Tower layer that wraps services with bearer token validation.
///
/// Every rejection is a 401 with a structured JSON body and a
/// `WWW-Authenticate` challenge whose `resource_metadata` parameter points
/// at the configured challenge metadata URL.
///
/// # Example
///
/// ```rust
/// use mcp_gatekeeper::auth::{BearerAuthLayer, StaticIntrospector};
///
/// let layer = BearerAuthLayer::new(
///     StaticIntrospector::default(),
///     "https://mcp.example.com/.well-known/oauth-protected-resource",
/// )
/// .public_path("/");
/// ```
#[derive(Clone)]
pub struct BearerAuthLayer<I: Introspect> {
    introspector: I,
    resource_metadata_url: String,
    public_paths: Vec<String>,
}

impl<I: Introspect> BearerAuthLayer<I> {
    /// Create a layer with the given introspection backend and the URL of
    /// the challenge metadata document.
    pub fn new(introspector: I, resource_metadata_url: impl Into<String>) -> Self {
        Self {
            introspector,
            resource_metadata_url: resource_metadata_url.into(),
            public_paths: Vec::new(),
        }
    }

    /// Add a path that does not require authentication (exact match).
    ///
    /// Paths containing `/.well-known/` are always public.
    pub fn public_path(mut self, path: impl Into<String>) -> Self {
        self.public_paths.push(path.into());
        self
    }
}

impl<S, I: Introspect> Layer<S> for BearerAuthLayer<I> {
    type Service = BearerAuthService<S, I>;

    fn layer(&self, inner: S) -> Self::Service {
        BearerAuthService {
            inner,
            introspector: self.introspector.clone(),
            resource_metadata_url: self.resource_metadata_url.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

/// Tower service that gates requests on a verified bearer credential.
///
/// Created by [`BearerAuthLayer`]. For each incoming request:
///
/// 1. Public and `/.well-known/` paths pass through unchanged
/// 2. A missing `Authorization` header is rejected as `unauthorized`
/// 3. Framing other than `Bearer <token>` is rejected as `invalid_request`
/// 4. The credential is introspected exactly once; any failure is rejected
///    as `invalid_token` (fail closed)
/// 5. On success the [`VerifiedPrincipal`] lands in request extensions and
///    the request continues to the inner service
///
/// [`VerifiedPrincipal`]: super::VerifiedPrincipal
#[derive(Clone)]
pub struct BearerAuthService<S, I: Introspect> {
    inner: S,
    introspector: I,
    resource_metadata_url: String,
    public_paths: Vec<String>,
}

impl<S, I> tower_service::Service<Request<Body>> for BearerAuthService<S, I>
where
    S: tower_service::Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    S::Error: Into<crate::BoxError> + Send,
    I: Introspect,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let path = req.uri().path().to_string();
        let introspector = self.introspector.clone();
        let resource_metadata_url = self.resource_metadata_url.clone();
        let public_paths = self.public_paths.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            // Discovery documents and registered public paths skip the gate
            if public_paths.iter().any(|p| p == &path) || path.contains("/.well-known/") {
                return inner.call(req).await;
            }

            let header_value = match req.headers().get(header::AUTHORIZATION) {
                Some(value) => value,
                None => {
                    return Ok(challenge_response(
                        &AuthError::MissingCredentials,
                        &resource_metadata_url,
                    ));
                }
            };

            let token = match parse_bearer(header_value.to_str().ok()) {
                Some(token) => token.to_string(),
                None => {
                    return Ok(challenge_response(
                        &AuthError::MalformedHeader,
                        &resource_metadata_url,
                    ));
                }
            };

            let principal = match introspector.introspect(&token).await {
                Ok(principal) => principal,
                Err(err) => {
                    tracing::debug!(error = %err, "bearer token rejected");
                    return Ok(challenge_response(
                        &AuthError::InvalidToken {
                            description: err.description(),
                        },
                        &resource_metadata_url,
                    ));
                }
            };

            tracing::debug!(subject = %principal.id, "bearer token verified");
            let mut req = req;
            req.extensions_mut().insert(principal);
            inner.call(req).await
        })
    }
}

/// Parse `<scheme> <credential>` framing: scheme must be `bearer`
/// case-insensitively and the credential must be non-empty.
fn parse_bearer(header: Option<&str>) -> Option<&str> {
    let header = header?;
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

/// Build the 401 challenge response for an auth failure.
fn challenge_response(error: &AuthError, resource_metadata_url: &str) -> Response {
    let www_authenticate = error.www_authenticate(resource_metadata_url);

    let mut response =
        (StatusCode::UNAUTHORIZED, axum::Json(error.body())).into_response();
    if let Ok(value) = www_authenticate.parse() {
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
    }
    response
}
