use super::record::Record;
use crate::error::ValidationError;

/// One issue to create, as parsed from a text block or a CSV row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSpec {
    team: String,
    project: String,
    title: String,
    summary: String,
    template: Option<String>,
}

impl IssueSpec {
    /// Validate and build a spec. Required fields are trimmed and must be
    /// non-empty; a blank template is normalized to `None`.
    pub fn new(
        team: &str,
        project: &str,
        title: &str,
        summary: &str,
        template: Option<&str>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            team: required("team", team)?,
            project: required("project", project)?,
            title: required("title", title)?,
            summary: required("summary", summary)?,
            template: template
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from),
        })
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    /// Key used to track per-run project handling.
    pub fn project_key(&self) -> String {
        format!("{}/{}", self.team, self.project)
    }

    /// Render the spec in the `Header: value` text-block form.
    pub fn to_text_block(&self) -> String {
        let mut out = format!("Team: {}\nProject: {}\n", self.team, self.project);
        if let Some(template) = &self.template {
            out.push_str(&format!("Template: {template}\n"));
        }
        out.push_str(&format!("Title: {}\nSummary:\n{}\n", self.title, self.summary));
        out
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Issue record returned by a backend after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedIssue {
    record: Record,
}

impl CreatedIssue {
    pub fn new(record: Record) -> Self {
        Self { record }
    }

    /// Human-facing identifier such as `ENG-42`, falling back to the raw id.
    pub fn display_id(&self) -> String {
        self.record
            .get_str("identifier")
            .or_else(|| self.record.get_str("id"))
            .unwrap_or("unknown")
            .to_string()
    }

    pub fn title(&self) -> &str {
        self.record.get_str("title").unwrap_or("Untitled")
    }

    pub fn url(&self) -> Option<&str> {
        self.record.get_str("url").filter(|u| !u.is_empty())
    }
}
