use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::resolver::match_template;
use super::Backend;
use crate::error::BackendError;
use crate::model::{IssueSpec, Record, ResolvedIdentifiers};
use crate::transport::GraphqlTransport;

/// Backend that talks to the tracker's GraphQL API directly. Unlike MCP it
/// can attach issue templates.
pub struct GraphqlBackend<T> {
    transport: T,
}

impl<T: GraphqlTransport> GraphqlBackend<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

const TEAMS_QUERY: &str = r#"query Teams {
  teams {
    nodes { id name key }
  }
}"#;

const PROJECTS_QUERY: &str = r#"query Projects($teamId: String!) {
  team(id: $teamId) {
    projects {
      nodes { id name }
    }
  }
}"#;

const TEMPLATES_QUERY: &str = r#"query Templates {
  templates {
    id name type
    team { id }
  }
}"#;

const PROJECT_CREATE: &str = r#"mutation CreateProject($input: ProjectCreateInput!) {
  projectCreate(input: $input) {
    success
    project { id name }
  }
}"#;

const ISSUE_CREATE: &str = r#"mutation IssueCreate($input: IssueCreateInput!) {
  issueCreate(input: $input) {
    success
    issue { id identifier title description url createdAt }
  }
}"#;

#[derive(Deserialize)]
struct Connection {
    nodes: Vec<Record>,
}

#[derive(Deserialize)]
struct TeamsData {
    teams: Connection,
}

#[derive(Deserialize)]
struct ProjectsData {
    team: Option<TeamProjects>,
}

#[derive(Deserialize)]
struct TeamProjects {
    projects: Connection,
}

#[derive(Deserialize)]
struct TemplatesData {
    #[serde(default)]
    templates: Vec<Record>,
}

#[derive(Deserialize)]
struct ProjectCreateData {
    #[serde(rename = "projectCreate")]
    project_create: Option<ProjectPayload>,
}

#[derive(Deserialize)]
struct ProjectPayload {
    success: bool,
    project: Option<Record>,
}

#[derive(Deserialize)]
struct IssueCreateData {
    #[serde(rename = "issueCreate")]
    issue_create: Option<IssuePayload>,
}

#[derive(Deserialize)]
struct IssuePayload {
    success: bool,
    issue: Option<Record>,
}

impl<T: GraphqlTransport> GraphqlBackend<T> {
    async fn query<D: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<D, BackendError> {
        tracing::debug!(operation, "executing GraphQL request");
        let data = self
            .transport
            .execute(query, variables)
            .await
            .map_err(|e| BackendError::Transport(format!("GraphQL {operation} failed: {e}")))?;
        serde_json::from_value(data).map_err(|e| {
            BackendError::Transport(format!("Unexpected GraphQL {operation} response: {e}"))
        })
    }

    /// Best-effort template lookup. Never fails: any problem means no template.
    async fn resolve_template(&self, name: &str, team_id: &str) -> Option<String> {
        let data: TemplatesData = match self.query("templates", TEMPLATES_QUERY, json!({})).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(template = name, error = %e, "template lookup failed, creating issue without it");
                return None;
            }
        };

        let id = match_template(&data.templates, name, team_id).and_then(Record::id);
        if id.is_none() {
            tracing::warn!(template = name, "template not found, creating issue without it");
        }
        id
    }
}

#[async_trait]
impl<T: GraphqlTransport> Backend for GraphqlBackend<T> {
    fn name(&self) -> &str {
        "API"
    }

    async fn list_teams(&mut self) -> Result<Vec<Record>, BackendError> {
        let data: TeamsData = self.query("teams", TEAMS_QUERY, json!({})).await?;
        Ok(data.teams.nodes)
    }

    async fn list_projects(&mut self, team_id: &str) -> Result<Vec<Record>, BackendError> {
        let data: ProjectsData = self
            .query("projects", PROJECTS_QUERY, json!({ "teamId": team_id }))
            .await?;
        Ok(data.team.map(|t| t.projects.nodes).unwrap_or_default())
    }

    async fn create_project(
        &mut self,
        name: &str,
        team_id: &str,
        color: &str,
    ) -> Result<Record, BackendError> {
        let variables = json!({
            "input": { "name": name, "teamIds": [team_id], "color": color }
        });
        let data: ProjectCreateData = self
            .query("projectCreate", PROJECT_CREATE, variables)
            .await?;

        let payload = data
            .project_create
            .filter(|p| p.success)
            .ok_or_else(|| BackendError::Creation("Project creation was rejected".into()))?;
        payload
            .project
            .ok_or_else(|| BackendError::Creation("No project returned from creation".into()))
    }

    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<Record, BackendError> {
        let mut input = json!({
            "teamId": identifiers.team_id(),
            "projectId": identifiers.project_id(),
            "title": spec.title(),
            "description": spec.summary(),
        });

        if let Some(template) = spec.template() {
            if let Some(template_id) = self.resolve_template(template, identifiers.team_id()).await {
                input["templateId"] = json!(template_id);
            }
        }

        let data: IssueCreateData = self
            .query("issueCreate", ISSUE_CREATE, json!({ "input": input }))
            .await?;

        let payload = data
            .issue_create
            .filter(|p| p.success)
            .ok_or_else(|| BackendError::Creation("Issue creation failed".into()))?;
        payload
            .issue
            .ok_or_else(|| BackendError::Creation("No issue returned from creation".into()))
    }
}
