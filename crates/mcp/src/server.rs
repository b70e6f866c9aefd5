// MCP server: transport-independent JSON-RPC dispatcher

use crate::executor::{ToolCallError, ToolExecutor};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability, JSONRPC_VERSION,
    PROTOCOL_VERSION,
};
use crate::tools::ToolRegistry;
use futures::FutureExt;
use serde_json::{json, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Where a transport wants the reply for one message to go.
///
/// Called at most once, and never for notifications.
pub trait ReplyChannel: Send {
    fn send(self, response: JsonRpcResponse);
}

impl<F> ReplyChannel for F
where
    F: FnOnce(JsonRpcResponse) + Send,
{
    fn send(self, response: JsonRpcResponse) {
        self(response)
    }
}

/// JSON-RPC dispatcher shared by every transport.
///
/// Holds no per-connection state; sessions live in the transports.
pub struct McpServer {
    executor: ToolExecutor,
    server_info: ServerInfo,
    initialize_result: Value,
    tools_list: Value,
}

impl McpServer {
    pub fn new(registry: ToolRegistry, server_info: ServerInfo, call_timeout: Duration) -> Self {
        let registry = Arc::new(registry);

        let initialize_result = json!(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: server_info.clone(),
        });
        let tools_list = json!(ListToolsResult {
            tools: registry.list_schemas(),
        });

        Self {
            executor: ToolExecutor::new(registry, call_timeout),
            server_info,
            initialize_result,
            tools_list,
        }
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Handle one raw message and hand any reply to `reply`.
    pub async fn handle<R: ReplyChannel>(&self, raw: &[u8], reply: R) {
        if let Some(response) = self.process(raw).await {
            reply.send(response);
        }
    }

    /// Handle one raw message; `None` means nothing must be written back.
    pub async fn process(&self, raw: &[u8]) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse JSON-RPC message");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error()));
            }
        };

        let request = match parse_envelope(value) {
            Ok(request) => request,
            Err(Rejected { id, error }) => {
                tracing::warn!(code = error.code, message = %error.message, "Rejected request");
                return id.map(|id| JsonRpcResponse::error(id, error));
            }
        };

        self.dispatch(request).await
    }

    /// Route an already-decoded request.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let notification = request.is_notification();
        tracing::debug!(method = %request.method, notification, "Dispatching request");

        let outcome = AssertUnwindSafe(self.route(&request.method, request.params))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                tracing::error!(method = %request.method, "Handler panicked");
                Err(JsonRpcError::internal_error("Internal error"))
            });

        if notification {
            if let Err(e) = &outcome {
                tracing::debug!(method = %request.method, error = %e.message, "Notification failed");
            }
            return None;
        }

        let id = request.id.unwrap_or(Value::Null);
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn route(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => Ok(self.handle_initialize(params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list.clone()),
            "tools/call" => self.handle_tools_call(params).await,
            "notifications/initialized" => {
                tracing::info!("Client initialized");
                Ok(json!({}))
            }
            m if m.starts_with("notifications/") => {
                tracing::debug!(method = %m, "Ignoring notification");
                Ok(json!({}))
            }
            _ => Err(JsonRpcError::method_not_found(method)),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> Value {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                protocol_version = params.protocol_version.as_deref().unwrap_or("unknown"),
                "Client connected"
            );
        }

        // Same value every time, independent of what the client sent
        self.initialize_result.clone()
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = match params {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(JsonRpcError::invalid_params("tools/call requires an object of params")
                    .with_data(json!({ "field": "params" })));
            }
        };

        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Err(JsonRpcError::invalid_params("Missing or invalid field `name`")
                .with_data(json!({ "field": "name" })));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.executor.execute(name, &arguments).await {
            Ok(result) => serde_json::to_value(result)
                .map_err(|e| JsonRpcError::internal_error(format!("Failed to encode result: {}", e))),
            Err(e @ ToolCallError::UnknownTool(_)) => Err(JsonRpcError {
                code: crate::protocol::METHOD_NOT_FOUND,
                message: e.to_string(),
                data: Some(json!({ "tool": name })),
            }),
            Err(ToolCallError::InvalidArguments(violation)) => Err(JsonRpcError::invalid_params(
                format!("Invalid params: {}", violation),
            )
            .with_data(json!({ "field": violation.field, "reason": violation.reason }))),
            Err(e @ ToolCallError::Internal(_)) => Err(JsonRpcError::internal_error(e.to_string())),
        }
    }
}

/// An envelope that failed validation. `id` is `None` when no reply may be sent.
struct Rejected {
    id: Option<Value>,
    error: JsonRpcError,
}

fn parse_envelope(value: Value) -> Result<JsonRpcRequest, Rejected> {
    let Value::Object(mut map) = value else {
        return Err(Rejected {
            id: Some(Value::Null),
            error: JsonRpcError::invalid_request("Request must be a JSON object"),
        });
    };

    let id = match map.remove("id") {
        None | Some(Value::Null) => None,
        Some(id @ (Value::String(_) | Value::Number(_))) => Some(id),
        Some(_) => {
            return Err(Rejected {
                id: Some(Value::Null),
                error: JsonRpcError::invalid_request("Request id must be a string or number"),
            });
        }
    };

    let reject = |message: &str| Rejected {
        id: id.clone(),
        error: JsonRpcError::invalid_request(message),
    };

    if map.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(reject("jsonrpc must be \"2.0\""));
    }

    let method = match map.remove("method") {
        Some(Value::String(method)) if !method.is_empty() => method,
        _ => return Err(reject("Missing or invalid method")),
    };

    Ok(JsonRpcRequest {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        method,
        params: map.remove("params").filter(|p| !p.is_null()),
    })
}
