//! Matching human-readable names against backend records.

use std::collections::BTreeSet;

use crate::error::BackendError;
use crate::model::Record;

/// Find the first record whose name, title, key or slug equals `expected`,
/// ignoring case and surrounding whitespace.
pub fn match_record<'a>(
    records: &'a [Record],
    expected: &str,
    entity: &'static str,
) -> Result<&'a Record, BackendError> {
    records
        .iter()
        .find(|record| record.matches(expected))
        .ok_or_else(|| BackendError::NotFound {
            entity,
            name: expected.to_string(),
            available: available_labels(records),
        })
}

/// Every distinct non-empty label across `records`, sorted.
pub fn available_labels(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .flat_map(|record| record.labels())
        .map(String::from)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn template_team(template: &Record) -> Option<&str> {
    template
        .get_str("teamId")
        .or_else(|| template.get("team").and_then(|t| t.get("id")).and_then(|id| id.as_str()))
}

/// Pick a template by exact name, preferring one tied to `team_id`.
pub fn match_template<'a>(templates: &'a [Record], name: &str, team_id: &str) -> Option<&'a Record> {
    let needle = name.trim().to_lowercase();
    let named: Vec<&Record> = templates
        .iter()
        .filter(|t| {
            t.get_str("name")
                .is_some_and(|n| n.trim().to_lowercase() == needle)
        })
        .collect();

    named
        .iter()
        .find(|t| template_team(t) == Some(team_id))
        .or_else(|| named.first())
        .copied()
}
