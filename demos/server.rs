//! MCP calculator server behind OAuth 2.1 resource discovery
//!
//! Demonstrates:
//! - Protected Resource Metadata at `/.well-known/oauth-protected-resource`
//! - Bearer token introspection against the platform identity service
//! - A `tools/call` handler that sees the verified account record
//!
//! Run with:
//!
//! ```bash
//! PLATFORM_URL=https://proj.example.co \
//! PLATFORM_ANON_KEY=<anon-key> \
//! MCP_SERVICE_NAME=calculator \
//! cargo run --example server
//! ```
//!
//! Test with curl:
//!
//! ```bash
//! # 1. Discover the authorization server (public endpoint)
//! curl http://localhost:3000/.well-known/oauth-protected-resource
//!
//! # 2. Attempt without token (returns 401 with WWW-Authenticate header)
//! curl -v -X POST http://localhost:3000/mcp \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"tools/list"}'
//!
//! # 3. Obtain an access token from the identity service, then retry
//! curl -X POST http://localhost:3000/mcp \
//!   -H "Content-Type: application/json" \
//!   -H "Authorization: Bearer <access-token>" \
//!   -d '{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add","arguments":{"a":19,"b":23}}}'
//! ```

use mcp_gatekeeper::auth::IdentityClient;
use mcp_gatekeeper::config::{resolve, Settings};
use mcp_gatekeeper::{CallToolResult, McpRouter, ResourceServer, ToolBuilder};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Debug, Deserialize, JsonSchema)]
struct AddInput {
    a: i64,
    b: i64,
}

#[tokio::main]
async fn main() -> Result<(), mcp_gatekeeper::BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mcp_gatekeeper=debug".parse()?)
                .add_directive("server=debug".parse()?),
        )
        .init();

    let config = resolve(&Settings::from_env())?;
    let identity = IdentityClient::new(&config.authorization_server, &config.anon_key)?;

    let add = ToolBuilder::new("add")
        .description("Add two numbers together")
        .handler(|input: AddInput, _principal| async move {
            Ok(CallToolResult::text(format!("{}", input.a + input.b)))
        })
        .build()?;

    let router = McpRouter::new()
        .server_info(&config.service_name, env!("CARGO_PKG_VERSION"))
        .instructions("A calculator protected by the platform identity service")
        .tool(add);

    let addr = std::env::var("MCP_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    tracing::info!(
        "Protected Resource Metadata: http://{addr}/.well-known/oauth-protected-resource"
    );

    ResourceServer::new(config, identity)
        .router(router)
        .serve(&addr)
        .await?;

    Ok(())
}
