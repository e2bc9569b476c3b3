//! CSV parser: one issue per data row.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::model::IssueSpec;

const REQUIRED_COLUMNS: [&str; 4] = ["team", "project", "title", "summary"];
const TEMPLATE_COLUMN: &str = "template";

/// Column positions resolved from the header row.
struct ColumnMap {
    team: usize,
    project: usize,
    title: usize,
    summary: usize,
    template: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ParseError> {
        // Normalized name -> position. A repeated name maps to its last column.
        let mut positions: BTreeMap<String, usize> = BTreeMap::new();
        for (idx, name) in headers.iter().enumerate() {
            let normalized = name.trim().to_lowercase();
            if !normalized.is_empty() {
                positions.insert(normalized, idx);
            }
        }

        let mut missing: Vec<&'static str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|col| !positions.contains_key(*col))
            .collect();
        missing.sort_unstable();
        if !missing.is_empty() {
            return Err(ParseError::MissingColumns {
                missing,
                available: positions.into_keys().collect(),
            });
        }

        Ok(Self {
            team: positions["team"],
            project: positions["project"],
            title: positions["title"],
            summary: positions["summary"],
            template: positions.get(TEMPLATE_COLUMN).copied(),
        })
    }
}

fn cell(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or_default().trim()
}

/// Parse CSV text into issue specs.
///
/// Rows whose four required cells are all empty are skipped. Validation
/// failures on the remaining rows are collected and reported together.
pub fn parse_csv_specs(csv_text: &str, delimiter: char) -> Result<Vec<IssueSpec>, ParseError> {
    if !delimiter.is_ascii() {
        return Err(ParseError::InvalidDelimiter(delimiter));
    }

    let text = csv_text.strip_prefix('\u{feff}').unwrap_or(csv_text);
    if text.trim().is_empty() {
        return Err(ParseError::EmptyInput("CSV"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ParseError::NoHeaderRow);
    }
    let columns = ColumnMap::from_headers(&headers)?;

    let mut specs = Vec::new();
    let mut errors = Vec::new();

    // Row 1 is the header.
    for (result, row_num) in reader.records().zip(2usize..) {
        let record = result?;
        let team = cell(&record, columns.team);
        let project = cell(&record, columns.project);
        let title = cell(&record, columns.title);
        let summary = cell(&record, columns.summary);

        if [team, project, title, summary].iter().all(|v| v.is_empty()) {
            tracing::debug!(row = row_num, "skipping blank CSV row");
            continue;
        }

        let template = columns.template.map(|idx| cell(&record, idx));
        match IssueSpec::new(team, project, title, summary, template) {
            Ok(spec) => specs.push(spec),
            Err(e) => errors.push(format!("Row {row_num}: {e}")),
        }
    }

    if !errors.is_empty() {
        return Err(ParseError::InvalidRows(errors));
    }
    if specs.is_empty() {
        return Err(ParseError::NoValidIssues);
    }

    tracing::debug!(count = specs.len(), "parsed CSV issues");
    Ok(specs)
}
