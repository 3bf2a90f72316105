// AdsFlow - mcp/server
//! MCP server. Exposes the Google Ads tools as an MCP endpoint.
//!
//! JSON-RPC 2.0 over HTTP POST at `/mcp`.
//!
//! Supported methods:
//! - `initialize`: server info + capabilities
//! - `notifications/initialized`: client ack (no-op)
//! - `tools/list`: list all available tools
//! - `tools/call`: execute a tool
//! - `ping`: health check
//!
//! Tool failures are reported inside the result (`isError: true`) so the
//! agent can read the message; only protocol problems become JSON-RPC errors.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP JSON-RPC 2.0 endpoint handler.
pub async fn mcp_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    tracing::debug!(method = %method, "MCP server: incoming request");

    let result = match method {
        "initialize" => handle_initialize(&id),
        "notifications/initialized" => {
            return (StatusCode::OK, Json(json!({})));
        }
        "ping" => handle_ping(&id),
        "tools/list" => handle_tools_list(&id),
        "tools/call" => handle_tools_call(&state, &headers, &request, &id).await,
        "" => json_rpc_error(id, -32600, "Invalid request: missing 'method'"),
        _ => json_rpc_error(id, -32601, &format!("Method not found: {}", method)),
    };

    (StatusCode::OK, Json(result))
}

// ── initialize ──────────────────────────────────────────────────────────────

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": "AdsFlow",
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Google Ads tools with a guided write workflow. Write tools discover missing \
                parameters step by step, return a dry-run preview with a confirmationToken, and only \
                change anything when called again with that token."
        }
    })
}

// ── ping ────────────────────────────────────────────────────────────────────

fn handle_ping(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {}
    })
}

// ── tools/list ──────────────────────────────────────────────────────────────

fn handle_tools_list(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": tools::tool_definitions()
        }
    })
}

// ── tools/call ──────────────────────────────────────────────────────────────

async fn handle_tools_call(state: &AppState, headers: &HeaderMap, request: &Value, id: &Value) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    if tool_name.is_empty() {
        return json_rpc_error(id.clone(), -32602, "Missing 'name' in params");
    }

    tracing::info!(tool = %tool_name, "MCP server: tools/call");

    match tools::execute_tool(tool_name, &arguments, headers, state).await {
        Ok(response) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": response.text }],
                "structuredContent": response.to_value(),
                "isError": false
            }
        }),
        Err(e) => {
            tracing::warn!(tool = %tool_name, kind = e.kind(), "MCP server: tool call failed: {}", e);
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": format!("Error: {}", e) }],
                    "structuredContent": { "success": false, "error": e.to_string(), "errorKind": e.kind() },
                    "isError": true
                }
            })
        }
    }
}

// ── JSON-RPC error helper ───────────────────────────────────────────────────

fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
