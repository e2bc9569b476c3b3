use async_trait::async_trait;
use serde_json::{json, Value};

use super::Backend;
use crate::config::ToolNames;
use crate::error::BackendError;
use crate::model::{IssueSpec, Record, ResolvedIdentifiers};
use crate::transport::{ToolOutput, ToolTransport};

/// Keys under which list payloads may be nested.
const LIST_KEYS: [&str; 4] = ["content", "items", "nodes", "data"];

/// Backend that talks to the tracker through MCP tool calls.
pub struct McpBackend<T> {
    transport: T,
    tools: ToolNames,
}

impl<T: ToolTransport> McpBackend<T> {
    pub fn new(transport: T, tools: ToolNames) -> Self {
        Self { transport, tools }
    }

    async fn call(&mut self, tool: &str, arguments: Value) -> Result<ToolOutput, BackendError> {
        tracing::debug!(tool, "calling MCP tool");
        self.transport
            .call_tool(tool, arguments)
            .await
            .map_err(|e| BackendError::Transport(format!("MCP tool '{tool}' failed: {e}")))
    }
}

/// Records from a bare array or an object nesting one under [`LIST_KEYS`].
/// Non-object entries are dropped.
fn list_payload(value: &Value) -> Option<Vec<Record>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => LIST_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))?,
        _ => return None,
    };
    let records: Vec<Record> = items.iter().cloned().filter_map(Record::from_json).collect();
    if records.is_empty() && !items.is_empty() {
        return None;
    }
    Some(records)
}

/// A single object, or the first object of an array.
fn record_payload(value: &Value) -> Option<Record> {
    match value {
        Value::Object(_) => Record::from_json(value.clone()),
        Value::Array(items) => items.first().cloned().and_then(Record::from_json),
        _ => None,
    }
}

/// Decode a tool result: `structuredContent` first, then the first text block as JSON.
fn decode<R>(output: &ToolOutput, extract: impl Fn(&Value) -> Option<R>) -> Option<R> {
    output
        .structured_content
        .as_ref()
        .and_then(&extract)
        .or_else(|| {
            output
                .first_text()
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .and_then(|value| extract(&value))
        })
}

pub(crate) fn extract_list(output: &ToolOutput, tool: &str) -> Result<Vec<Record>, BackendError> {
    decode(output, list_payload).ok_or_else(|| {
        BackendError::Transport(format!("Tool '{tool}' did not return a structured list payload"))
    })
}

pub(crate) fn extract_record(output: &ToolOutput, tool: &str) -> Result<Record, BackendError> {
    decode(output, record_payload).ok_or_else(|| {
        BackendError::Creation(format!("Tool '{tool}' did not return structured JSON data"))
    })
}

#[async_trait]
impl<T: ToolTransport> Backend for McpBackend<T> {
    fn name(&self) -> &str {
        "MCP"
    }

    async fn open(&mut self) -> Result<(), BackendError> {
        self.transport
            .connect()
            .await
            .map_err(|e| BackendError::Transport(format!("Failed to open MCP session: {e}")))
    }

    async fn close(&mut self) {
        self.transport.disconnect().await;
    }

    async fn list_teams(&mut self) -> Result<Vec<Record>, BackendError> {
        let tool = self.tools.list_teams.clone();
        let output = self.call(&tool, json!({})).await?;
        extract_list(&output, &tool)
    }

    async fn list_projects(&mut self, team_id: &str) -> Result<Vec<Record>, BackendError> {
        let tool = self.tools.list_projects.clone();
        let output = self.call(&tool, json!({ "team": team_id })).await?;
        extract_list(&output, &tool)
    }

    async fn create_project(
        &mut self,
        name: &str,
        team_id: &str,
        color: &str,
    ) -> Result<Record, BackendError> {
        let tool = self.tools.create_project.clone();
        let args = json!({ "name": name, "team": team_id, "color": color });
        let output = self.call(&tool, args).await?;
        extract_record(&output, &tool)
    }

    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<Record, BackendError> {
        if let Some(template) = spec.template() {
            tracing::debug!(template, "MCP backend does not attach templates");
        }

        let tool = self.tools.create_issue.clone();
        let args = json!({
            "team": identifiers.team_id(),
            "project": identifiers.project_id(),
            "title": spec.title(),
            "description": spec.summary(),
        });
        let output = self.call(&tool, args).await?;
        extract_record(&output, &tool)
    }
}
