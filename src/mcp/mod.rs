//! MCP (Model Context Protocol) implementation.

mod handlers;
pub mod server;
mod tools;

pub use server::{McpServer, SERVER_NAME};
pub use tools::{Tool, ToolHandler, ToolRegistry};
