//! MCP client over the streamable-HTTP transport (JSON-RPC 2.0).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Value};

use super::{ToolOutput, ToolTransport};
use crate::error::TransportError;

const SESSION_HEADER: &str = "Mcp-Session-Id";
const PROTOCOL_VERSION: &str = "2025-03-26";

pub struct HttpToolTransport {
    client: reqwest::Client,
    url: String,
    token: String,
    session_id: Option<String>,
    connected: bool,
    next_id: u64,
}

impl HttpToolTransport {
    pub fn new(
        url: String,
        token: String,
        user_agent: &str,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()?;
        Ok(Self {
            client,
            url,
            token,
            session_id: None,
            connected: false,
            next_id: 0,
        })
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, TransportError> {
        let mut req = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/json, text/event-stream")
            .json(body);
        if let Some(session) = &self.session_id {
            req = req.header(SESSION_HEADER, session);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http { status, body });
        }
        Ok(resp)
    }

    async fn request(&mut self, method: &str, params: Value) -> Result<Value, TransportError> {
        self.next_id += 1;
        let id = self.next_id;
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let resp = self.post(&body).await?;
        if let Some(session) = resp
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session.to_string());
        }
        let is_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));
        let text = resp.text().await?;

        let message = if is_stream {
            sse_messages(&text)
                .into_iter()
                .find(|msg| msg.get("id") == Some(&json!(id)))
                .ok_or_else(|| TransportError::NoData(format!("no response to {method} in event stream")))?
        } else {
            serde_json::from_str(&text).map_err(|_| TransportError::InvalidJson(text.clone()))?
        };
        rpc_result(message)
    }

    async fn notify(&self, method: &str) -> Result<(), TransportError> {
        let body = json!({ "jsonrpc": "2.0", "method": method });
        self.post(&body).await?;
        Ok(())
    }
}

/// Collect the JSON payloads of every `data:` event in an SSE body.
fn sse_messages(body: &str) -> Vec<Value> {
    let mut messages = Vec::new();
    let mut data = String::new();

    let mut flush = |data: &mut String| {
        if !data.is_empty() {
            if let Ok(value) = serde_json::from_str(data) {
                messages.push(value);
            }
            data.clear();
        }
    };

    for line in body.lines() {
        if line.is_empty() {
            flush(&mut data);
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }
    flush(&mut data);

    messages
}

/// Unwrap a JSON-RPC response into its `result`.
fn rpc_result(mut message: Value) -> Result<Value, TransportError> {
    if let Some(error) = message.get("error") {
        return Err(TransportError::Rpc {
            code: error.get("code").and_then(Value::as_i64).unwrap_or_default(),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    match message.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(TransportError::NoData(message.to_string())),
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.connected {
            return Ok(());
        }

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": { "name": "linear-issue-maker", "version": env!("CARGO_PKG_VERSION") },
        });
        let init = self.request("initialize", params).await?;
        tracing::debug!(
            server = ?init.get("serverInfo"),
            session = ?self.session_id,
            "MCP session initialized"
        );
        self.notify("notifications/initialized").await?;
        self.connected = true;
        Ok(())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutput, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        let result = self
            .request("tools/call", json!({ "name": name, "arguments": arguments }))
            .await?;
        let output: ToolOutput = serde_json::from_value(result)
            .map_err(|e| TransportError::InvalidJson(e.to_string()))?;
        if output.is_error {
            let message = output.first_text().unwrap_or("no details").to_string();
            return Err(TransportError::ToolFailed(message));
        }
        Ok(output)
    }

    async fn disconnect(&mut self) {
        if let Some(session) = self.session_id.take() {
            let result = self
                .client
                .delete(&self.url)
                .header("Authorization", format!("Bearer {}", self.token))
                .header(SESSION_HEADER, session)
                .send()
                .await;
            if let Err(e) = result {
                tracing::debug!(error = %e, "failed to close MCP session");
            }
        }
        self.connected = false;
    }
}
