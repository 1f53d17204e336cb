#![deny(missing_docs)]
//! MCP client and server bridging MCP tools with warden ToolRegistry.
//!
//! Two independent components:
//!
//! - [`McpClient`] connects to an MCP server, discovers its tools, and wraps
//!   each as a [`ToolDyn`](warden_tool::ToolDyn) for use in a
//!   [`ToolRegistry`](warden_tool::ToolRegistry).
//! - [`McpServer`] wraps a [`ToolRegistry`](warden_tool::ToolRegistry) and
//!   exposes its tools via the MCP protocol over stdio.

pub mod client;
pub mod error;
pub mod server;

pub use client::McpClient;
pub use error::McpError;
pub use server::McpServer;
