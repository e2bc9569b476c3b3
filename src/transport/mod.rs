//! Wire-level access to the two remote services.
//!
//! These are thin I/O wrappers. Everything above this module talks to the
//! traits, so tests can substitute in-memory fakes.

pub mod graphql_http;
pub mod mcp_http;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::TransportError;

pub use graphql_http::HttpGraphqlTransport;
pub use mcp_http::HttpToolTransport;

/// One content block of a tool result. Only text blocks carry data we use.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Result of an MCP `tools/call` request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutput {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolOutput {
    /// Text of the first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }
}

/// A tool-invocation session (MCP).
#[async_trait]
pub trait ToolTransport: Send {
    async fn connect(&mut self) -> Result<(), TransportError>;
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutput, TransportError>;
    /// Release the session. Failures are ignored.
    async fn disconnect(&mut self);
}

/// A GraphQL endpoint. Returns the `data` member of a successful response.
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, TransportError>;
}
