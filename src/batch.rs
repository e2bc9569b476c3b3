//! Drive a list of issue specs through one client, in order.

use std::collections::HashSet;

use crate::backends::IssueClient;
use crate::error::BackendError;
use crate::model::{CreatedIssue, IssueSpec, ResolvedIdentifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the rest of the batch on the first failure.
    #[default]
    StopOnFirstError,
    /// Record the failure and move on to the next spec.
    ContinueOnError,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub create_missing_projects: bool,
    pub policy: FailurePolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            create_missing_projects: true,
            policy: FailurePolicy::default(),
        }
    }
}

/// Progress notifications emitted while the batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Started {
        index: usize,
        total: usize,
        spec: &'a IssueSpec,
    },
    ProjectCreated {
        spec: &'a IssueSpec,
    },
    Created {
        issue: &'a CreatedIssue,
    },
    Failed {
        spec: &'a IssueSpec,
        error: &'a str,
    },
}

#[derive(Debug, Clone)]
pub struct FailedSpec {
    pub spec: IssueSpec,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub created: Vec<CreatedIssue>,
    pub failed: Vec<FailedSpec>,
    /// Set when stop-on-first-error cut the batch short.
    pub aborted: bool,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run every spec through `client`.
///
/// The client session is opened first and closed on every exit path. An
/// `Err` is returned only when the session cannot be opened; per-spec
/// failures land in the report.
pub async fn run_batch(
    client: &mut dyn IssueClient,
    specs: &[IssueSpec],
    options: BatchOptions,
    mut on_event: impl FnMut(BatchEvent<'_>) + Send,
) -> Result<BatchReport, BackendError> {
    if let Err(e) = client.open().await {
        client.close().await;
        return Err(e);
    }

    tracing::info!(backend = client.name(), total = specs.len(), "starting batch");
    let report = process(client, specs, options, &mut on_event).await;
    client.close().await;

    tracing::info!(
        created = report.created.len(),
        failed = report.failed.len(),
        aborted = report.aborted,
        "batch finished"
    );
    Ok(report)
}

async fn process(
    client: &mut dyn IssueClient,
    specs: &[IssueSpec],
    options: BatchOptions,
    on_event: &mut (dyn FnMut(BatchEvent<'_>) + Send),
) -> BatchReport {
    let mut report = BatchReport::default();
    // team/project pairs already resolved with auto-creation this run.
    let mut handled: HashSet<String> = HashSet::new();

    for (i, spec) in specs.iter().enumerate() {
        on_event(BatchEvent::Started {
            index: i + 1,
            total: specs.len(),
            spec,
        });

        match create_one(client, spec, options, &mut handled).await {
            Ok((identifiers, issue)) => {
                if identifiers.project_created() {
                    on_event(BatchEvent::ProjectCreated { spec });
                }
                on_event(BatchEvent::Created { issue: &issue });
                report.created.push(issue);
            }
            Err(e) => {
                let error = e.to_string();
                tracing::debug!(error = %error, spec = %spec.to_text_block(), "issue failed");
                on_event(BatchEvent::Failed {
                    spec,
                    error: &error,
                });
                report.failed.push(FailedSpec {
                    spec: spec.clone(),
                    error,
                });
                if options.policy == FailurePolicy::StopOnFirstError {
                    report.aborted = i + 1 < specs.len();
                    break;
                }
            }
        }
    }

    report
}

async fn create_one(
    client: &mut dyn IssueClient,
    spec: &IssueSpec,
    options: BatchOptions,
    handled: &mut HashSet<String>,
) -> Result<(ResolvedIdentifiers, CreatedIssue), BackendError> {
    let key = spec.project_key();
    let allow_create = options.create_missing_projects && !handled.contains(&key);

    let identifiers = client
        .resolve_identifiers(spec.team(), spec.project(), allow_create)
        .await?;
    if allow_create {
        handled.insert(key);
    }
    tracing::debug!(
        team = %identifiers.team().display_name(),
        project = %identifiers.project().display_name(),
        "resolved identifiers"
    );

    let issue = client.create_issue(spec, &identifiers).await?;
    Ok((identifiers, issue))
}
