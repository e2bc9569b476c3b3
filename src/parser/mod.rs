//! Turn raw input into validated [`IssueSpec`]s.
//!
//! Two input shapes are supported: a single `Header: value` text block
//! ([`parse_issue_spec`]) and delimited CSV with one issue per row
//! ([`parse_csv_specs`]).

mod block;
mod table;

use std::path::Path;

use clap::ValueEnum;

use crate::error::ParseError;
use crate::model::IssueSpec;

pub use block::parse_issue_spec;
pub use table::parse_csv_specs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum InputFormat {
    /// Delimited rows with a header line
    Csv,
    /// A single `Header: value` block
    Text,
    /// Pick from the file extension, then from the content
    #[default]
    Auto,
}

impl InputFormat {
    /// Resolve `Auto` into a concrete format.
    pub fn detect(self, source: Option<&Path>, content: &str) -> InputFormat {
        if self != InputFormat::Auto {
            return self;
        }

        let ext = source
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_lowercase());
        match ext.as_deref() {
            Some("csv") | Some("tsv") => return InputFormat::Csv,
            Some("txt") | Some("md") => return InputFormat::Text,
            _ => {}
        }

        let first_line = content
            .trim_start_matches('\u{feff}')
            .lines()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default();
        let looks_like_header = first_line.split_once(':').is_some_and(|(name, _)| {
            block::HEADERS.contains(&name.trim().to_lowercase().as_str())
        });

        if looks_like_header {
            InputFormat::Text
        } else {
            InputFormat::Csv
        }
    }
}

/// Parse `content` in the given format. The text form yields a single spec.
pub fn parse_specs(
    content: &str,
    format: InputFormat,
    source: Option<&Path>,
    delimiter: char,
) -> Result<Vec<IssueSpec>, ParseError> {
    match format.detect(source, content) {
        InputFormat::Text => Ok(vec![parse_issue_spec(content)?]),
        _ => parse_csv_specs(content, delimiter),
    }
}
