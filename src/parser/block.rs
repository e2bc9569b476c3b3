//! Parser for the single-issue `Header: value` text form.
//!
//! ```text
//! Team: Backend
//! Project: Payments
//! Template: Story
//! Title: Upgrade checkout flow
//! Summary:
//! Everything after the Summary header is the body,
//! blank lines included.
//! ```

use crate::error::ParseError;
use crate::model::IssueSpec;

/// Header names accepted before `Summary:`, lowercase.
pub(crate) const HEADERS: [&str; 5] = ["team", "project", "template", "title", "summary"];

#[derive(Default)]
struct Headers {
    team: Option<String>,
    project: Option<String>,
    template: Option<String>,
    title: Option<String>,
}

impl Headers {
    fn slot(&mut self, header: &str) -> Option<&mut Option<String>> {
        match header {
            "team" => Some(&mut self.team),
            "project" => Some(&mut self.project),
            "template" => Some(&mut self.template),
            "title" => Some(&mut self.title),
            _ => None,
        }
    }
}

/// Parse one issue from the text-block form.
pub fn parse_issue_spec(text: &str) -> Result<IssueSpec, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput("Issue"));
    }

    let mut headers = Headers::default();
    let mut body: Option<Vec<&str>> = None;

    for (idx, line) in text.lines().enumerate() {
        if let Some(body) = body.as_mut() {
            body.push(line);
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(ParseError::UnexpectedContent {
                line: idx + 1,
                content: line.trim().to_string(),
            });
        };
        let name = name.trim();
        let header = name.to_lowercase();

        if header == "summary" {
            let mut lines = Vec::new();
            if !value.trim().is_empty() {
                lines.push(value.trim_start());
            }
            body = Some(lines);
            continue;
        }

        let Some(slot) = headers.slot(&header) else {
            return Err(ParseError::UnknownHeader(name.to_string()));
        };
        if slot.is_some() {
            return Err(ParseError::DuplicateHeader(name.to_string()));
        }
        *slot = Some(value.trim().to_string());
    }

    let Some(body) = body else {
        return Err(ParseError::MissingSummary);
    };
    let summary = body.join("\n");

    let missing: Vec<&'static str> = [
        ("team", &headers.team),
        ("project", &headers.project),
        ("title", &headers.title),
    ]
    .into_iter()
    .filter(|(_, value)| value.is_none())
    .map(|(field, _)| field)
    .collect();
    if !missing.is_empty() {
        return Err(ParseError::MissingHeaders(missing));
    }

    let spec = IssueSpec::new(
        headers.team.as_deref().unwrap_or_default(),
        headers.project.as_deref().unwrap_or_default(),
        headers.title.as_deref().unwrap_or_default(),
        &summary,
        headers.template.as_deref(),
    )?;
    Ok(spec)
}
