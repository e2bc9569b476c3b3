pub mod issue;
pub mod record;

pub use issue::{CreatedIssue, IssueSpec};
pub use record::{Record, ResolvedIdentifiers};
