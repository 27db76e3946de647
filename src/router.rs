//! Tool registry and JSON-RPC dispatch for the protected MCP endpoint.
//!
//! [`McpRouter`] holds the static set of tools and answers the four MCP
//! methods this server exposes. Tool handlers receive their deserialized
//! input together with the [`VerifiedPrincipal`] the bearer gate attached.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::VerifiedPrincipal;
use crate::error::{Error, JsonRpcError, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerInfo,
    ToolDescriptor, PROTOCOL_VERSION,
};

/// Everything a tool handler gets to see for one invocation.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    /// Raw `tools/call` arguments.
    pub arguments: Value,
    /// The verified identity of the caller, exactly as the identity
    /// service returned it.
    pub principal: VerifiedPrincipal,
}

/// A tool execution failure, surfaced in-band as an `isError` result.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ToolError(pub String);

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

type ToolFuture =
    Pin<Box<dyn Future<Output = std::result::Result<CallToolResult, JsonRpcError>> + Send>>;
type ToolHandlerFn = Arc<dyn Fn(ToolRequest) -> ToolFuture + Send + Sync>;

/// A registered tool: descriptor plus handler.
#[derive(Clone)]
pub struct Tool {
    descriptor: ToolDescriptor,
    handler: ToolHandlerFn,
}

impl Tool {
    /// The descriptor reported by `tools/list`.
    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
}

/// Builder for defining tools with typed handlers.
///
/// # Example
///
/// ```rust
/// use mcp_gatekeeper::{CallToolResult, ToolBuilder};
/// use schemars::JsonSchema;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize, JsonSchema)]
/// struct AddInput {
///     a: i64,
///     b: i64,
/// }
///
/// let add = ToolBuilder::new("add")
///     .description("Add two numbers together")
///     .handler(|input: AddInput, _principal| async move {
///         Ok(CallToolResult::text(format!("{}", input.a + input.b)))
///     })
///     .build()
///     .unwrap();
/// ```
pub struct ToolBuilder {
    name: String,
    description: Option<String>,
    handler: Option<(Value, ToolHandlerFn)>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            handler: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the handler. The input type's JSON Schema becomes the tool's
    /// `inputSchema`; arguments that do not deserialize into it are
    /// rejected as invalid params before the handler runs.
    pub fn handler<I, F, Fut>(mut self, handler: F) -> Self
    where
        I: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(I, VerifiedPrincipal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<CallToolResult, ToolError>> + Send + 'static,
    {
        let schema = serde_json::to_value(schemars::schema_for!(I))
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        let handler = Arc::new(handler);
        let wrapped: ToolHandlerFn = Arc::new(move |request: ToolRequest| {
            let handler = handler.clone();
            Box::pin(async move {
                let input: I = serde_json::from_value(request.arguments)
                    .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
                match handler(input, request.principal).await {
                    Ok(result) => Ok(result),
                    Err(err) => Ok(CallToolResult::error(err.to_string())),
                }
            })
        });
        self.handler = Some((schema, wrapped));
        self
    }

    /// # Errors
    ///
    /// Fails if no handler was set.
    pub fn build(self) -> Result<Tool> {
        let (input_schema, handler) = self
            .handler
            .ok_or_else(|| Error::Tool(format!("tool '{}' has no handler", self.name)))?;
        Ok(Tool {
            descriptor: ToolDescriptor {
                name: self.name,
                description: self.description,
                input_schema,
            },
            handler,
        })
    }
}

/// Routes MCP requests to registered tools.
#[derive(Clone)]
pub struct McpRouter {
    server_name: String,
    server_version: String,
    instructions: Option<String>,
    tools: Vec<Tool>,
}

impl Default for McpRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl McpRouter {
    pub fn new() -> Self {
        Self {
            server_name: "mcp-server".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            instructions: None,
            tools: Vec::new(),
        }
    }

    /// Set the server name and version reported during `initialize`.
    pub fn server_info(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.server_name = name.into();
        self.server_version = version.into();
        self
    }

    /// Set usage instructions reported during `initialize`.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Register a tool.
    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    /// The name reported during `initialize`.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    /// Dispatch a single JSON-RPC request on behalf of a verified caller.
    pub async fn dispatch(
        &self,
        request: JsonRpcRequest,
        principal: &VerifiedPrincipal,
    ) -> JsonRpcResponse {
        if let Err(err) = request.validate() {
            return JsonRpcResponse::error(Some(request.id), err);
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params, principal).await,
            other => Err(JsonRpcError::method_not_found(other)),
        };

        match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(Some(id), err),
        }
    }

    fn handle_initialize(&self) -> std::result::Result<Value, JsonRpcError> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: serde_json::json!({"tools": {}}),
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: self.server_version.clone(),
            },
            instructions: self.instructions.clone(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn handle_tools_list(&self) -> std::result::Result<Value, JsonRpcError> {
        let tools: Vec<&ToolDescriptor> = self.tools.iter().map(Tool::descriptor).collect();
        serde_json::to_value(serde_json::json!({ "tools": tools }))
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<Value>,
        principal: &VerifiedPrincipal,
    ) -> std::result::Result<Value, JsonRpcError> {
        let params: CallToolParams = match params {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            None => return Err(JsonRpcError::invalid_params("missing params")),
        };

        let tool = self
            .tools
            .iter()
            .find(|t| t.descriptor.name == params.name)
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name))
            })?;

        tracing::debug!(tool = %params.name, subject = %principal.id, "invoking tool");
        let result = (tool.handler)(ToolRequest {
            arguments: params.arguments,
            principal: principal.clone(),
        })
        .await?;

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    fn principal() -> VerifiedPrincipal {
        VerifiedPrincipal {
            id: "user-1".to_string(),
            email: Some("one@example.com".to_string()),
            extra: Default::default(),
        }
    }

    fn router() -> McpRouter {
        let add = ToolBuilder::new("add")
            .description("Add two numbers together")
            .handler(|input: AddInput, _principal| async move {
                Ok(CallToolResult::text(format!("{}", input.a + input.b)))
            })
            .build()
            .unwrap();

        McpRouter::new().server_info("calculator", "1.0.0").tool(add)
    }

    fn request(method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn initialize_reports_server_info() {
        let response = router()
            .dispatch(request("initialize", serde_json::json!({})), &principal())
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "calculator");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn tools_list_carries_schema() {
        let response = router()
            .dispatch(request("tools/list", serde_json::json!({})), &principal())
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["tools"][0]["name"], "add");
        assert!(result["tools"][0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn tools_call_add() {
        let response = router()
            .dispatch(
                request(
                    "tools/call",
                    serde_json::json!({"name": "add", "arguments": {"a": 19, "b": 23}}),
                ),
                &principal(),
            )
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["content"][0]["text"], "42");
    }

    #[tokio::test]
    async fn tools_call_bad_arguments_is_invalid_params() {
        let response = router()
            .dispatch(
                request(
                    "tools/call",
                    serde_json::json!({"name": "add", "arguments": {"a": "nope"}}),
                ),
                &principal(),
            )
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, crate::error::ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn unknown_tool_is_invalid_params() {
        let response = router()
            .dispatch(
                request("tools/call", serde_json::json!({"name": "subtract"})),
                &principal(),
            )
            .await;
        assert!(response.error.is_some());
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let response = router()
            .dispatch(request("resources/list", serde_json::json!({})), &principal())
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, crate::error::ErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn handler_observes_principal_unmodified() {
        #[derive(Debug, Deserialize, JsonSchema)]
        struct Empty {}

        let whoami = ToolBuilder::new("whoami")
            .handler(|_input: Empty, principal: VerifiedPrincipal| async move {
                Ok(CallToolResult::text(
                    serde_json::to_string(&principal).unwrap_or_default(),
                ))
            })
            .build()
            .unwrap();
        let router = McpRouter::new().tool(whoami);

        let response = router
            .dispatch(
                request(
                    "tools/call",
                    serde_json::json!({"name": "whoami", "arguments": {}}),
                ),
                &principal(),
            )
            .await;
        let result = response.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        let echoed: VerifiedPrincipal = serde_json::from_str(text).unwrap();
        assert_eq!(echoed.id, "user-1");
        assert_eq!(echoed.email.as_deref(), Some("one@example.com"));
    }

    #[tokio::test]
    async fn tool_failure_is_in_band_error_result() {
        #[derive(Debug, Deserialize, JsonSchema)]
        struct Empty {}

        let failing = ToolBuilder::new("fail")
            .handler(|_input: Empty, _principal| async move {
                Err::<CallToolResult, _>(ToolError::new("it broke"))
            })
            .build()
            .unwrap();
        let router = McpRouter::new().tool(failing);

        let response = router
            .dispatch(
                request(
                    "tools/call",
                    serde_json::json!({"name": "fail", "arguments": {}}),
                ),
                &principal(),
            )
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][0]["text"], "it broke");
    }

    #[test]
    fn builder_without_handler_fails() {
        assert!(ToolBuilder::new("empty").build().is_err());
    }
}
