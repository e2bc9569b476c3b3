use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::GraphqlTransport;
use crate::error::TransportError;

pub struct HttpGraphqlTransport {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl HttpGraphqlTransport {
    pub fn new(url: String, token: String, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url, token })
    }
}

/// Decode a GraphQL response body into its `data` member.
fn decode_response(body: &str) -> Result<Value, TransportError> {
    let mut payload: Value =
        serde_json::from_str(body).map_err(|_| TransportError::InvalidJson(body.to_string()))?;

    if let Some(errors) = payload.get("errors").and_then(Value::as_array) {
        if !errors.is_empty() {
            let messages = errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect();
            return Err(TransportError::Graphql(messages));
        }
    }

    match payload.get_mut("data") {
        Some(data) if !data.is_null() => Ok(data.take()),
        _ => Err(TransportError::NoData(body.to_string())),
    }
}

#[async_trait]
impl GraphqlTransport for HttpGraphqlTransport {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, TransportError> {
        let mut body = json!({ "query": query });
        if variables.as_object().is_some_and(|v| !v.is_empty()) {
            body["variables"] = variables;
        }

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: text,
            });
        }
        decode_response(&text)
    }
}
