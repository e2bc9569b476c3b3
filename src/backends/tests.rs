use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::client::CachingClient;
use super::graphql::GraphqlBackend;
use super::mcp::{extract_list, extract_record, McpBackend};
use super::{detect_mode, Backend, IssueClient};
use crate::config::{ClientMode, ToolNames};
use crate::error::{BackendError, TransportError};
use crate::model::{IssueSpec, Record, ResolvedIdentifiers};
use crate::transport::{ContentBlock, GraphqlTransport, ToolOutput, ToolTransport};

pub fn spec(team: &str, project: &str, title: &str) -> IssueSpec {
    IssueSpec::new(team, project, title, "Body text", None).unwrap()
}

fn record(value: Value) -> Record {
    Record::from_json(value).unwrap()
}

/// In-memory backend that logs every call.
pub struct MockBackend {
    pub calls: Arc<Mutex<Vec<String>>>,
    teams: Vec<Record>,
    projects: HashMap<String, Vec<Record>>,
    fail_open: bool,
    reject_projects: bool,
    next_id: usize,
}

impl MockBackend {
    pub fn new() -> Self {
        let mut projects = HashMap::new();
        projects.insert(
            "t1".to_string(),
            vec![record(json!({ "id": "p1", "name": "Payments" }))],
        );
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            teams: vec![
                record(json!({ "id": "t1", "name": "Backend", "key": "BE" })),
                record(json!({ "id": "t2", "name": "Web" })),
            ],
            projects,
            fail_open: false,
            reject_projects: false,
            next_id: 0,
        }
    }

    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    fn rejecting_projects(mut self) -> Self {
        self.reject_projects = true;
        self
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn open(&mut self) -> Result<(), BackendError> {
        self.log("open".into());
        if self.fail_open {
            return Err(BackendError::Transport("connection refused".into()));
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.log("close".into());
    }

    async fn list_teams(&mut self) -> Result<Vec<Record>, BackendError> {
        self.log("list_teams".into());
        Ok(self.teams.clone())
    }

    async fn list_projects(&mut self, team_id: &str) -> Result<Vec<Record>, BackendError> {
        self.log(format!("list_projects:{team_id}"));
        Ok(self.projects.get(team_id).cloned().unwrap_or_default())
    }

    async fn create_project(
        &mut self,
        name: &str,
        team_id: &str,
        color: &str,
    ) -> Result<Record, BackendError> {
        self.log(format!("create_project:{name}:{team_id}:{color}"));
        if self.reject_projects {
            return Err(BackendError::Creation("Project creation was rejected".into()));
        }
        self.next_id += 1;
        Ok(record(json!({ "id": format!("new-{}", self.next_id), "name": name })))
    }

    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<Record, BackendError> {
        self.log(format!("create_issue:{}", spec.title()));
        self.next_id += 1;
        Ok(record(json!({
            "id": format!("issue-{}", self.next_id),
            "identifier": format!("ENG-{}", self.next_id),
            "title": spec.title(),
            "projectId": identifiers.project_id(),
            "url": format!("https://linear.app/acme/issue/ENG-{}", self.next_id),
        })))
    }
}

fn count(calls: &Arc<Mutex<Vec<String>>>, prefix: &str) -> usize {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.starts_with(prefix))
        .count()
}

#[tokio::test]
async fn resolves_team_and_project_case_insensitively() {
    let mut client = CachingClient::new(MockBackend::new());
    let ids = client
        .resolve_identifiers(" backend ", "PAYMENTS", false)
        .await
        .unwrap();
    assert_eq!(ids.team_id(), "t1");
    assert_eq!(ids.project_id(), "p1");
    assert!(!ids.project_created());
}

#[tokio::test]
async fn team_list_is_fetched_once_per_session() {
    let backend = MockBackend::new();
    let calls = backend.calls.clone();
    let mut client = CachingClient::new(backend);

    client.resolve_identifiers("Backend", "Payments", false).await.unwrap();
    client.resolve_identifiers("BE", "Payments", false).await.unwrap();
    let _ = client.resolve_identifiers("Web", "Anything", false).await;

    assert_eq!(count(&calls, "list_teams"), 1);
    assert_eq!(count(&calls, "list_projects:t1"), 1);
    assert_eq!(count(&calls, "list_projects:t2"), 1);
}

#[tokio::test]
async fn missing_project_without_auto_create_fails() {
    let backend = MockBackend::new();
    let calls = backend.calls.clone();
    let mut client = CachingClient::new(backend);

    let err = client
        .resolve_identifiers("Backend", "Roadmap", false)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not find project 'Roadmap'. Available options: Payments"
    );
    assert_eq!(count(&calls, "create_project"), 0);
}

#[tokio::test]
async fn missing_project_is_created_and_cached() {
    let backend = MockBackend::new();
    let calls = backend.calls.clone();
    let mut client = CachingClient::new(backend);

    let first = client
        .resolve_identifiers("Web", "Launch", true)
        .await
        .unwrap();
    assert!(first.project_created());
    assert_eq!(first.project_id(), "new-1");

    let second = client
        .resolve_identifiers("Web", "launch", true)
        .await
        .unwrap();
    assert!(!second.project_created());
    assert_eq!(second.project_id(), "new-1");

    assert_eq!(
        calls.lock().unwrap().iter().filter(|c| c.starts_with("create_project")).cloned().collect::<Vec<_>>(),
        vec!["create_project:Launch:t2:#bec2c8".to_string()]
    );
    assert_eq!(count(&calls, "list_projects:t2"), 1);
}

#[tokio::test]
async fn unknown_team_is_never_created() {
    let backend = MockBackend::new();
    let calls = backend.calls.clone();
    let mut client = CachingClient::new(backend);

    let err = client
        .resolve_identifiers("Mobile", "Payments", true)
        .await
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("Could not find team 'Mobile'"));
    assert!(msg.contains("BE, Backend, Web"));
    assert_eq!(count(&calls, "create_project"), 0);
}

#[tokio::test]
async fn rejected_project_creation_is_a_creation_error() {
    let mut client = CachingClient::new(MockBackend::new().rejecting_projects());
    let err = client
        .resolve_identifiers("Backend", "Roadmap", true)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Creation(_)));
    assert!(err.to_string().contains("Failed to create project 'Roadmap' in team 'Backend'"));
}

#[tokio::test]
async fn create_issue_wraps_backend_record() {
    let mut client = CachingClient::new(MockBackend::new());
    let ids = client
        .resolve_identifiers("Backend", "Payments", false)
        .await
        .unwrap();
    let issue = client
        .create_issue(&spec("Backend", "Payments", "Ship it"), &ids)
        .await
        .unwrap();
    assert_eq!(issue.display_id(), "ENG-1");
    assert_eq!(issue.title(), "Ship it");
    assert!(issue.url().is_some());
}

#[test]
fn detect_mode_uses_templates() {
    let plain = vec![spec("A", "B", "C")];
    assert_eq!(detect_mode(&plain), ClientMode::Mcp);

    let templated = vec![
        spec("A", "B", "C"),
        IssueSpec::new("A", "B", "D", "E", Some("Story")).unwrap(),
    ];
    assert_eq!(detect_mode(&templated), ClientMode::Api);
}

// MCP backend

fn text_output(text: &str) -> ToolOutput {
    ToolOutput {
        content: vec![ContentBlock::Text { text: text.into() }],
        ..Default::default()
    }
}

fn structured_output(value: Value) -> ToolOutput {
    ToolOutput {
        structured_content: Some(value),
        ..Default::default()
    }
}

/// Scripted tool transport: replies by tool name, logs arguments.
struct FakeTools {
    replies: HashMap<String, ToolOutput>,
    log: Arc<Mutex<Vec<(String, Value)>>>,
}

#[async_trait]
impl ToolTransport for FakeTools {
    async fn connect(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolOutput, TransportError> {
        self.log.lock().unwrap().push((name.to_string(), arguments));
        self.replies
            .get(name)
            .cloned()
            .ok_or_else(|| TransportError::Rpc {
                code: -32601,
                message: format!("unknown tool {name}"),
            })
    }

    async fn disconnect(&mut self) {}
}

#[test]
fn extract_list_reads_structured_and_text_payloads() {
    let bare = structured_output(json!([{ "id": "t1", "name": "Backend" }, "junk"]));
    assert_eq!(extract_list(&bare, "list_teams").unwrap().len(), 1);

    let nested = text_output(r#"{"nodes":[{"id":"t1"},{"id":"t2"}]}"#);
    assert_eq!(extract_list(&nested, "list_teams").unwrap().len(), 2);

    let content_key = text_output(r#"{"content":[{"id":"p1","name":"Payments"}]}"#);
    assert_eq!(
        extract_list(&content_key, "list_projects").unwrap()[0].get_str("name"),
        Some("Payments")
    );

    let empty = text_output("[]");
    assert!(extract_list(&empty, "list_projects").unwrap().is_empty());

    let err = extract_list(&text_output("not json"), "list_teams").unwrap_err();
    assert!(err.to_string().contains("did not return a structured list payload"));
}

#[test]
fn extract_record_accepts_object_or_first_of_array() {
    let obj = text_output(r#"{"id":"i1","identifier":"ENG-1"}"#);
    assert_eq!(extract_record(&obj, "create_issue").unwrap().get_str("id"), Some("i1"));

    let arr = structured_output(json!([{ "id": "i2" }, { "id": "i3" }]));
    assert_eq!(extract_record(&arr, "create_issue").unwrap().get_str("id"), Some("i2"));

    assert!(extract_record(&text_output(""), "create_issue").is_err());
}

#[tokio::test]
async fn mcp_backend_sends_expected_tool_arguments() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut replies = HashMap::new();
    replies.insert(
        "list_teams".to_string(),
        text_output(r#"[{"id":"t1","name":"Backend"}]"#),
    );
    replies.insert("list_projects".to_string(), text_output("[]"));
    replies.insert(
        "create_project".to_string(),
        text_output(r#"{"id":"p9","name":"Launch"}"#),
    );
    replies.insert(
        "create_issue".to_string(),
        structured_output(json!({ "id": "i1", "identifier": "ENG-1", "title": "Hello" })),
    );
    let transport = FakeTools {
        replies,
        log: log.clone(),
    };
    let mut client = CachingClient::new(McpBackend::new(transport, ToolNames::default()));

    client.open().await.unwrap();
    let ids = client
        .resolve_identifiers("Backend", "Launch", true)
        .await
        .unwrap();
    let issue = client
        .create_issue(&spec("Backend", "Launch", "Hello"), &ids)
        .await
        .unwrap();
    client.close().await;

    assert_eq!(issue.display_id(), "ENG-1");
    let log = log.lock().unwrap();
    let names: Vec<&str> = log.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["list_teams", "list_projects", "create_project", "create_issue"]);
    assert_eq!(log[1].1, json!({ "team": "t1" }));
    assert_eq!(log[2].1, json!({ "name": "Launch", "team": "t1", "color": "#bec2c8" }));
    assert_eq!(
        log[3].1,
        json!({ "team": "t1", "project": "p9", "title": "Hello", "description": "Body text" })
    );
}

#[tokio::test]
async fn mcp_transport_errors_become_backend_errors() {
    let transport = FakeTools {
        replies: HashMap::new(),
        log: Arc::new(Mutex::new(Vec::new())),
    };
    let mut client = CachingClient::new(McpBackend::new(transport, ToolNames::default()));
    let err = client
        .resolve_identifiers("Backend", "Payments", false)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Transport(_)));
    assert!(err.to_string().contains("MCP tool 'list_teams' failed"));
}

// GraphQL backend

/// Answers by operation name found in the query text.
struct FakeGraphql {
    templates: Result<Value, String>,
    issue_success: bool,
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

impl FakeGraphql {
    fn new(templates: Result<Value, String>) -> Self {
        Self {
            templates,
            issue_success: true,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl GraphqlTransport for FakeGraphql {
    async fn execute(&self, query: &str, variables: Value) -> Result<Value, TransportError> {
        let op = ["Teams", "Projects", "Templates", "CreateProject", "IssueCreate"]
            .into_iter()
            .find(|op| query.contains(&format!(" {op}")))
            .unwrap_or("unknown");
        self.requests
            .lock()
            .unwrap()
            .push((op.to_string(), variables.clone()));

        match op {
            "Teams" => Ok(json!({ "teams": { "nodes": [{ "id": "t1", "name": "Backend", "key": "BE" }] } })),
            "Projects" => Ok(json!({ "team": { "projects": { "nodes": [{ "id": "p1", "name": "Payments" }] } } })),
            "Templates" => match &self.templates {
                Ok(v) => Ok(json!({ "templates": v })),
                Err(msg) => Err(TransportError::Graphql(vec![msg.clone()])),
            },
            "CreateProject" => Ok(json!({ "projectCreate": { "success": true, "project": { "id": "p2", "name": "New" } } })),
            "IssueCreate" if self.issue_success => Ok(json!({
                "issueCreate": { "success": true, "issue": { "id": "i1", "identifier": "BE-1", "title": "T", "url": "https://linear.app/x" } }
            })),
            "IssueCreate" => Ok(json!({ "issueCreate": { "success": false, "issue": null } })),
            _ => Err(TransportError::NoData(query.to_string())),
        }
    }
}

fn issue_input(requests: &Arc<Mutex<Vec<(String, Value)>>>) -> Value {
    requests
        .lock()
        .unwrap()
        .iter()
        .find(|(op, _)| op == "IssueCreate")
        .map(|(_, vars)| vars["input"].clone())
        .unwrap()
}

async fn create_with_template(transport: FakeGraphql, template: Option<&str>) -> Result<(), BackendError> {
    let mut client = CachingClient::new(GraphqlBackend::new(transport));
    let ids = client.resolve_identifiers("Backend", "Payments", false).await?;
    let spec = IssueSpec::new("Backend", "Payments", "T", "Body", template).unwrap();
    client.create_issue(&spec, &ids).await.map(|_| ())
}

#[tokio::test]
async fn graphql_attaches_template_preferring_team() {
    let transport = FakeGraphql::new(Ok(json!([
        { "id": "tpl-any", "name": "Story", "team": null },
        { "id": "tpl-team", "name": "story", "team": { "id": "t1" } },
    ])));
    let requests = transport.requests.clone();
    create_with_template(transport, Some("Story")).await.unwrap();

    let input = issue_input(&requests);
    assert_eq!(input["templateId"], "tpl-team");
    assert_eq!(input["teamId"], "t1");
    assert_eq!(input["projectId"], "p1");
    assert_eq!(input["description"], "Body");
}

#[tokio::test]
async fn graphql_unknown_template_is_skipped() {
    let transport = FakeGraphql::new(Ok(json!([{ "id": "tpl-bug", "name": "Bug" }])));
    let requests = transport.requests.clone();
    create_with_template(transport, Some("Story")).await.unwrap();
    assert!(issue_input(&requests).get("templateId").is_none());
}

#[tokio::test]
async fn graphql_template_lookup_errors_never_block_creation() {
    let transport = FakeGraphql::new(Err("templates unavailable".into()));
    let requests = transport.requests.clone();
    create_with_template(transport, Some("Story")).await.unwrap();
    assert!(issue_input(&requests).get("templateId").is_none());
}

#[tokio::test]
async fn graphql_skips_template_query_without_template() {
    let transport = FakeGraphql::new(Ok(json!([])));
    let requests = transport.requests.clone();
    create_with_template(transport, None).await.unwrap();
    assert!(!requests.lock().unwrap().iter().any(|(op, _)| op == "Templates"));
}

#[tokio::test]
async fn graphql_unsuccessful_issue_create_fails() {
    let mut transport = FakeGraphql::new(Ok(json!([])));
    transport.issue_success = false;
    let err = create_with_template(transport, None).await.unwrap_err();
    assert!(matches!(err, BackendError::Creation(_)));
    assert_eq!(err.to_string(), "Issue creation failed");
}

#[tokio::test]
async fn graphql_project_creation_uses_team_ids() {
    let transport = FakeGraphql::new(Ok(json!([])));
    let requests = transport.requests.clone();
    let mut client = CachingClient::new(GraphqlBackend::new(transport));

    let ids = client.resolve_identifiers("BE", "Launch", true).await.unwrap();
    assert!(ids.project_created());
    assert_eq!(ids.project_id(), "p2");

    let requests = requests.lock().unwrap();
    let (_, vars) = requests.iter().find(|(op, _)| op == "CreateProject").unwrap();
    assert_eq!(
        vars["input"],
        json!({ "name": "Launch", "teamIds": ["t1"], "color": "#bec2c8" })
    );
}
