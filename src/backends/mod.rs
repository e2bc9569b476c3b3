pub mod cache;
pub mod client;
pub mod graphql;
pub mod mcp;
pub mod resolver;

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::{ClientMode, Settings};
use crate::error::BackendError;
use crate::model::{CreatedIssue, IssueSpec, Record, ResolvedIdentifiers};
use crate::transport::{HttpGraphqlTransport, HttpToolTransport};

use client::CachingClient;
use graphql::GraphqlBackend;
use mcp::McpBackend;

/// Remote operations a tracker backend exposes.
#[async_trait]
pub trait Backend: Send {
    fn name(&self) -> &str;
    /// Establish the session. Called once before the first remote call.
    async fn open(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
    async fn close(&mut self) {}
    async fn list_teams(&mut self) -> Result<Vec<Record>, BackendError>;
    async fn list_projects(&mut self, team_id: &str) -> Result<Vec<Record>, BackendError>;
    async fn create_project(
        &mut self,
        name: &str,
        team_id: &str,
        color: &str,
    ) -> Result<Record, BackendError>;
    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<Record, BackendError>;
}

/// The client contract the batch runner drives, independent of backend.
#[async_trait]
pub trait IssueClient: Send {
    fn name(&self) -> &str;
    async fn open(&mut self) -> Result<(), BackendError>;
    async fn close(&mut self);
    async fn resolve_identifiers(
        &mut self,
        team: &str,
        project: &str,
        create_missing_projects: bool,
    ) -> Result<ResolvedIdentifiers, BackendError>;
    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<CreatedIssue, BackendError>;
}

#[cfg(test)]
pub mod tests;

/// API mode when any spec names a template (only the GraphQL backend can
/// attach one), MCP otherwise.
pub fn detect_mode(specs: &[IssueSpec]) -> ClientMode {
    if specs.iter().any(|spec| spec.template().is_some()) {
        ClientMode::Api
    } else {
        ClientMode::Mcp
    }
}

/// Resolve `Auto` against the parsed specs.
pub fn effective_mode(mode: ClientMode, specs: &[IssueSpec]) -> ClientMode {
    match mode {
        ClientMode::Auto => detect_mode(specs),
        other => other,
    }
}

pub fn create_client(
    mode: ClientMode,
    specs: &[IssueSpec],
    settings: &Settings,
) -> Result<Box<dyn IssueClient>> {
    match effective_mode(mode, specs) {
        ClientMode::Api => {
            let token = settings.api_token()?;
            let transport = HttpGraphqlTransport::new(
                settings.api.api_url.clone(),
                token,
                Duration::from_secs_f64(settings.api.http_timeout),
            )
            .context("Failed to build GraphQL HTTP client")?;
            Ok(Box::new(CachingClient::new(GraphqlBackend::new(transport))))
        }
        _ => {
            let token = settings.mcp_token()?;
            let transport = HttpToolTransport::new(
                settings.mcp.server_url.clone(),
                token,
                &settings.mcp.user_agent,
                Duration::from_secs_f64(settings.mcp.http_timeout),
                Duration::from_secs_f64(settings.mcp.sse_read_timeout),
            )
            .context("Failed to build MCP HTTP client")?;
            Ok(Box::new(CachingClient::new(McpBackend::new(
                transport,
                settings.mcp.tools.clone(),
            ))))
        }
    }
}
