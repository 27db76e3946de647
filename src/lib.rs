//! An MCP tool server behind OAuth 2.1 resource discovery.
//!
//! This crate serves a small Model Context Protocol (MCP) endpoint whose
//! every request must carry a bearer token issued by an external
//! authorization server. Clients that arrive without credentials are told
//! where to get them via the standard discovery flow:
//!
//! 1. Client calls `POST /mcp` with no token and receives `401 Unauthorized`
//!    with a `WWW-Authenticate` challenge carrying a `resource_metadata` URL
//! 2. Client fetches that URL and reads the Protected Resource Metadata
//!    document (RFC 9728): the resource identifier and its authorization
//!    servers
//! 3. Client obtains a token from the authorization server and retries
//! 4. The bearer gate introspects the token against the identity service
//!    and, on success, hands the verified account record to tool handlers
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mcp_gatekeeper::auth::IdentityClient;
//! use mcp_gatekeeper::config::{resolve, Settings};
//! use mcp_gatekeeper::{CallToolResult, McpRouter, ResourceServer, ToolBuilder};
//! use schemars::JsonSchema;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize, JsonSchema)]
//! struct AddInput {
//!     a: i64,
//!     b: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = resolve(&Settings::from_env())?;
//!     let identity = IdentityClient::new(&config.authorization_server, &config.anon_key)?;
//!
//!     let add = ToolBuilder::new("add")
//!         .description("Add two numbers together")
//!         .handler(|input: AddInput, _principal| async move {
//!             Ok(CallToolResult::text(format!("{}", input.a + input.b)))
//!         })
//!         .build()?;
//!
//!     let router = McpRouter::new()
//!         .server_info("calculator", env!("CARGO_PKG_VERSION"))
//!         .tool(add);
//!
//!     ResourceServer::new(config, identity)
//!         .router(router)
//!         .serve("0.0.0.0:8080")
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod metadata;
pub mod protocol;
pub mod router;
pub mod server;

pub use auth::{BearerAuthLayer, IdentityClient, Introspect, StaticIntrospector, VerifiedPrincipal};
pub use config::{ResolvedConfig, Settings};
pub use error::{BoxError, Error, ErrorCode, JsonRpcError, Result};
pub use metadata::ResourceMetadata;
pub use protocol::{CallToolResult, Content, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use router::{McpRouter, Tool, ToolBuilder, ToolError, ToolRequest};
pub use server::ResourceServer;
