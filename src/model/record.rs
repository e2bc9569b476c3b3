use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::BackendError;

/// Fields that carry a human-readable label.
pub const LABEL_FIELDS: [&str; 4] = ["name", "title", "key", "slug"];

/// Fields that carry an identifier, in lookup order.
const ID_FIELDS: [&str; 5] = ["id", "teamId", "projectId", "templateId", "identifier"];

/// A JSON object returned by a backend: a team, project, template or issue.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Wrap a JSON value, returning `None` unless it is an object.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Non-empty label values in field order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        LABEL_FIELDS
            .iter()
            .filter_map(|field| self.get_str(field))
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    /// Case-insensitive, whitespace-trimmed comparison against every label field.
    pub fn matches(&self, expected: &str) -> bool {
        let needle = expected.trim().to_lowercase();
        self.labels().any(|label| label.to_lowercase() == needle)
    }

    /// First non-empty identifier field. Numeric ids are stringified.
    pub fn id(&self) -> Option<String> {
        ID_FIELDS.iter().find_map(|field| match self.0.get(*field)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn require_id(&self) -> Result<String, BackendError> {
        self.id()
            .ok_or_else(|| BackendError::MissingIdentifier(Value::Object(self.0.clone()).to_string()))
    }

    /// Best label to show for this record, falling back to its id.
    pub fn display_name(&self) -> String {
        self.labels()
            .next()
            .map(String::from)
            .or_else(|| self.id())
            .unwrap_or_default()
    }
}

/// Team and project records resolved for one spec.
#[derive(Debug, Clone)]
pub struct ResolvedIdentifiers {
    team: Record,
    project: Record,
    team_id: String,
    project_id: String,
    project_created: bool,
}

impl ResolvedIdentifiers {
    /// Fails when either record lacks an identifier field.
    pub fn new(team: Record, project: Record, project_created: bool) -> Result<Self, BackendError> {
        let team_id = team.require_id()?;
        let project_id = project.require_id()?;
        Ok(Self {
            team,
            project,
            team_id,
            project_id,
            project_created,
        })
    }

    pub fn team(&self) -> &Record {
        &self.team
    }

    pub fn project(&self) -> &Record {
        &self.project
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// True when the project was auto-created while resolving.
    pub fn project_created(&self) -> bool {
        self.project_created
    }
}
