// AdsFlow - mcp
//! MCP (Model Context Protocol) server.
//!
//! `mcp_handler` exposes the Google Ads tools to agents via JSON-RPC 2.0 over
//! HTTP. Protocol: <https://spec.modelcontextprotocol.io/2024-11-05/>

pub mod server;
