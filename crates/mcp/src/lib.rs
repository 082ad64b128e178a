//! MCP (Model Context Protocol) server support for nextcal.
//!
//! This crate provides:
//! - Protocol types for JSON-RPC 2.0 and the MCP tool methods (`types`)
//! - The [`ToolHandler`] seam tools are served through (`traits`)
//! - A line-delimited server loop over any async reader/writer (`server`)

pub mod error;
pub mod server;
pub mod traits;
pub mod types;

pub use {
    server::McpServer,
    traits::ToolHandler,
    types::{McpToolDef, ServerInfo, ToolsCallResult},
};
