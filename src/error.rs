use thiserror::Error;

/// A well-formed spec with an empty required field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{0}' cannot be empty")]
    EmptyField(&'static str),
}

/// Errors raised while turning raw input into issue specs.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{0} input is empty")]
    EmptyInput(&'static str),

    #[error("Unexpected content on line {line}: '{content}'")]
    UnexpectedContent { line: usize, content: String },

    #[error("Unknown header '{0}'. Expected one of: Team, Project, Template, Title, Summary")]
    UnknownHeader(String),

    #[error("Duplicate header '{0}'")]
    DuplicateHeader(String),

    #[error("Missing 'Summary:' section")]
    MissingSummary,

    #[error("Missing required headers: {}", .0.join(", "))]
    MissingHeaders(Vec<&'static str>),

    #[error("CSV has no header row")]
    NoHeaderRow,

    #[error("CSV is missing required columns: {}. Available columns: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        missing: Vec<&'static str>,
        available: Vec<String>,
    },

    /// One entry per failing row, already formatted as `Row N: message`.
    #[error("CSV parsing errors:\n  {}", .0.join("\n  "))]
    InvalidRows(Vec<String>),

    #[error("No valid issues found in CSV")]
    NoValidIssues,

    #[error("Invalid delimiter '{0}': must be a single ASCII character")]
    InvalidDelimiter(char),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Domain errors surfaced by issue clients.
///
/// Transport failures are flattened into [`BackendError::Transport`] at the
/// point of use so no transport-specific type crosses the client boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Could not find {entity} '{name}'. Available options: {}", .available.join(", "))]
    NotFound {
        entity: &'static str,
        name: String,
        available: Vec<String>,
    },

    #[error("Record is missing an identifier field: {0}")]
    MissingIdentifier(String),

    #[error("{0}")]
    Creation(String),

    #[error("{0}")]
    Transport(String),
}

/// Low-level failures of the HTTP transports.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("GraphQL errors: {}", .0.join(", "))]
    Graphql(Vec<String>),

    #[error("No data in response: {0}")]
    NoData(String),

    #[error("Tool reported an error: {0}")]
    ToolFailed(String),

    #[error("Session not connected")]
    NotConnected,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err.to_string())
        }
    }
}
