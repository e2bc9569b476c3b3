use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which backend to create issues through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ClientMode {
    /// MCP server (tool calls)
    Mcp,
    /// GraphQL API, supports templates
    Api,
    /// API when any issue names a template, MCP otherwise
    #[default]
    Auto,
}

impl ClientMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientMode::Mcp => "MCP",
            ClientMode::Api => "API",
            ClientMode::Auto => "AUTO",
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub mcp: McpSettings,
    pub api: ApiSettings,
}

/// MCP tool names used for each remote operation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolNames {
    pub list_teams: String,
    pub list_projects: String,
    pub create_project: String,
    pub create_issue: String,
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            list_teams: "list_teams".into(),
            list_projects: "list_projects".into(),
            create_project: "create_project".into(),
            create_issue: "create_issue".into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct McpSettings {
    pub server_url: String,
    pub access_token: Option<String>,
    pub token_path: Option<PathBuf>,
    /// Connect timeout, seconds.
    pub http_timeout: f64,
    /// Per-request timeout while waiting on the event stream, seconds.
    pub sse_read_timeout: f64,
    pub user_agent: String,
    pub tools: ToolNames,
}

impl Default for McpSettings {
    fn default() -> Self {
        Self {
            server_url: "https://mcp.linear.app/mcp".into(),
            access_token: None,
            token_path: None,
            http_timeout: 15.0,
            sse_read_timeout: 300.0,
            user_agent: format!("linear-issue-maker/{}", env!("CARGO_PKG_VERSION")),
            tools: ToolNames::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub api_url: String,
    pub access_token: Option<String>,
    pub token_path: Option<PathBuf>,
    /// Request timeout, seconds.
    pub http_timeout: f64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.linear.app/graphql".into(),
            access_token: None,
            token_path: None,
            http_timeout: 30.0,
        }
    }
}

/// Values given on the command line. They win over file and environment.
#[derive(Debug, Default)]
pub struct Overrides {
    pub server_url: Option<String>,
    pub api_url: Option<String>,
    pub token: Option<String>,
    pub token_path: Option<PathBuf>,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".linear-issue-maker")
        .join("config.toml")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

fn read_token_file(path: &Path) -> Result<String> {
    let path = expand_home(path);
    let token = std::fs::read_to_string(&path)
        .with_context(|| format!("Token file '{}' not found", path.display()))?;
    Ok(token.trim().to_string())
}

fn token_from(access_token: &Option<String>, token_path: &Option<PathBuf>) -> Result<Option<String>> {
    if let Some(token) = non_empty(access_token.clone()) {
        return Ok(Some(token));
    }
    match token_path {
        Some(path) => Ok(non_empty(Some(read_token_file(path)?))),
        None => Ok(None),
    }
}

impl Settings {
    /// Load `~/.linear-issue-maker/config.toml` (if present), then apply
    /// environment variables and CLI overrides.
    pub fn load(overrides: Overrides) -> Result<Self> {
        let mut settings = Self::from_file(&config_path())?;
        settings.apply_env(|key| std::env::var(key).ok());
        settings.apply_overrides(overrides);
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let settings: Settings =
            toml::from_str(&contents).with_context(|| "Failed to parse config.toml")?;
        Ok(settings)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = non_empty(var("LINEAR_MCP_SERVER_URL")) {
            self.mcp.server_url = url;
        }
        if let Some(token) = non_empty(var("LINEAR_MCP_ACCESS_TOKEN")) {
            self.mcp.access_token = Some(token);
        }
        if let Some(path) = non_empty(var("LINEAR_MCP_TOKEN_PATH")) {
            self.mcp.token_path = Some(PathBuf::from(path));
        }
        if let Some(url) = non_empty(var("LINEAR_API_URL")) {
            self.api.api_url = url;
        }
        if let Some(token) = non_empty(var("LINEAR_API_ACCESS_TOKEN")) {
            self.api.access_token = Some(token);
        }
        if let Some(path) = non_empty(var("LINEAR_API_TOKEN_PATH")) {
            self.api.token_path = Some(PathBuf::from(path));
        }
    }

    /// A CLI token or token path applies to both backends.
    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(url) = overrides.server_url {
            self.mcp.server_url = url;
        }
        if let Some(url) = overrides.api_url {
            self.api.api_url = url;
        }
        if let Some(token) = non_empty(overrides.token) {
            self.mcp.access_token = Some(token.clone());
            self.api.access_token = Some(token);
        }
        if let Some(path) = overrides.token_path {
            self.mcp.token_path = Some(path.clone());
            self.api.token_path = Some(path);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("mcp.http_timeout", self.mcp.http_timeout),
            ("mcp.sse_read_timeout", self.mcp.sse_read_timeout),
            ("api.http_timeout", self.api.http_timeout),
        ] {
            if secs <= 0.0 || Duration::try_from_secs_f64(secs).is_err() {
                bail!("{name} must be a positive number of seconds, got {secs}");
            }
        }
        Ok(())
    }

    pub fn mcp_token(&self) -> Result<String> {
        token_from(&self.mcp.access_token, &self.mcp.token_path)?
            .context("Provide LINEAR_MCP_ACCESS_TOKEN or LINEAR_MCP_TOKEN_PATH")
    }

    /// The same token works for both backends, so API mode falls back to
    /// the MCP token.
    pub fn api_token(&self) -> Result<String> {
        if let Some(token) = token_from(&self.api.access_token, &self.api.token_path)? {
            return Ok(token);
        }
        self.mcp_token()
            .map_err(|_| anyhow::anyhow!("Provide LINEAR_API_ACCESS_TOKEN or LINEAR_API_TOKEN_PATH"))
    }
}
