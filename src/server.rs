//! HTTP server assembly: discovery routes, health, and the gated MCP
//! endpoint, composed into one axum router.

use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::Value;

use crate::auth::{BearerAuthLayer, Introspect, VerifiedPrincipal};
use crate::config::ResolvedConfig;
use crate::error::{Error, JsonRpcError, Result};
use crate::metadata::ResourceMetadata;
use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::router::McpRouter;

/// Shared state for the MCP endpoint handler.
#[derive(Clone)]
struct AppState {
    router: McpRouter,
    service_name: String,
}

/// A configured resource server, ready to be turned into an axum router
/// or served directly.
///
/// Routes:
///
/// - `GET /` -- public health check
/// - `GET /.well-known/oauth-protected-resource` -- advertised discovery
///   document
/// - `GET /mcp/.well-known/oauth-protected-resource` -- challenge discovery
///   document (also registered under the resource URL's path when that
///   differs, so the URL in a 401 challenge always resolves)
/// - `POST /mcp` -- the protected MCP endpoint
///
/// # Example
///
/// ```rust,no_run
/// use mcp_gatekeeper::auth::StaticIntrospector;
/// use mcp_gatekeeper::config::{resolve, Settings};
/// use mcp_gatekeeper::{McpRouter, ResourceServer};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = resolve(&Settings::from_env())?;
/// let server = ResourceServer::new(config, StaticIntrospector::default())
///     .router(McpRouter::new());
/// let app = server.into_router();
/// # Ok(())
/// # }
/// ```
pub struct ResourceServer<I: Introspect> {
    config: ResolvedConfig,
    introspector: I,
    router: McpRouter,
}

impl<I: Introspect> ResourceServer<I> {
    /// Create a server from resolved configuration and an introspection
    /// backend.
    pub fn new(config: ResolvedConfig, introspector: I) -> Self {
        Self {
            config,
            introspector,
            router: McpRouter::new(),
        }
    }

    /// Set the tool router served behind the gate.
    pub fn router(mut self, router: McpRouter) -> Self {
        self.router = router;
        self
    }

    /// The URL a 401 challenge's `resource_metadata` parameter points at.
    ///
    /// Derived from the resource URL, except when the resource has no path
    /// component: there the derived URL would be the advertised document's
    /// well-known root, so the challenge document's nested location is used
    /// instead to keep the two discovery paths distinguishable.
    pub fn challenge_metadata_url(&self) -> String {
        let resource = self.config.resource.trim_end_matches('/');
        if path_of(resource) == "/" {
            format!("{}/mcp{}", resource, ResourceMetadata::well_known_path())
        } else {
            format!("{}{}", resource, ResourceMetadata::well_known_path())
        }
    }

    /// Build the axum router.
    pub fn into_router(self) -> axum::Router {
        let advertised = ResourceMetadata::new(&self.config.resource)
            .authorization_server(&self.config.authorization_server);
        let challenge = ResourceMetadata::new(&self.config.resource)
            .authorization_server(&self.config.challenge_authorization_server);

        let challenge_url = self.challenge_metadata_url();
        let layer = BearerAuthLayer::new(self.introspector, challenge_url).public_path("/");

        let state = AppState {
            router: self.router,
            service_name: self.config.service_name.clone(),
        };

        let challenge_doc = challenge.clone();
        let mut app = axum::Router::new()
            .route("/", get(health))
            .route(
                ResourceMetadata::well_known_path(),
                get(move || std::future::ready(Json(advertised.clone()))),
            )
            .route(
                "/mcp/.well-known/oauth-protected-resource",
                get(move || std::future::ready(Json(challenge_doc.clone()))),
            )
            .route("/mcp", post(handle_mcp));

        // The challenge URL derives from the resource URL, whose path is
        // deployment-dependent. Register the document there too so the URL
        // handed out in 401 responses resolves on this same router.
        let challenge_path = format!(
            "{}{}",
            path_of(&self.config.resource).trim_end_matches('/'),
            ResourceMetadata::well_known_path()
        );
        if challenge_path != "/mcp/.well-known/oauth-protected-resource"
            && challenge_path != ResourceMetadata::well_known_path()
        {
            app = app.route(
                &challenge_path,
                get(move || std::future::ready(Json(challenge.clone()))),
            );
        }

        app.layer(layer).with_state(state)
    }

    /// Bind and serve until the process is stopped.
    ///
    /// # Errors
    ///
    /// Fails when the listener cannot bind or the server loop errors.
    pub async fn serve(self, addr: &str) -> Result<()> {
        let addr = addr.to_string();
        let app = self.into_router();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Transport(format!("failed to bind {addr}: {e}")))?;
        tracing::info!(%addr, "resource server listening");
        axum::serve(listener, app)
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

/// Path portion of a URL, defaulting to `/`.
fn path_of(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "name": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "metadata": ResourceMetadata::well_known_path(),
            "challenge_metadata": "/mcp/.well-known/oauth-protected-resource",
            "mcp": "/mcp",
        },
    }))
}

/// The protected MCP endpoint. The bearer gate has already verified the
/// caller; the principal is read back out of request extensions.
async fn handle_mcp(
    State(state): State<AppState>,
    Extension(principal): Extension<VerifiedPrincipal>,
    body: String,
) -> Response {
    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, JsonRpcError::parse_error(e.to_string()));
            return (StatusCode::OK, Json(response)).into_response();
        }
    };

    // Notifications carry no id and get no response body
    if value.get("id").is_none() {
        tracing::debug!(
            method = value.get("method").and_then(serde_json::Value::as_str).unwrap_or(""),
            "acknowledged notification"
        );
        return StatusCode::ACCEPTED.into_response();
    }

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            let response =
                JsonRpcResponse::error(None, JsonRpcError::invalid_request(e.to_string()));
            return (StatusCode::OK, Json(response)).into_response();
        }
    };

    let response = state.router.dispatch(request, &principal).await;
    (StatusCode::OK, Json(response)).into_response()
}
