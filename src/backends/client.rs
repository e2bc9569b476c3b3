use async_trait::async_trait;

use super::cache::RecordCache;
use super::resolver::match_record;
use super::{Backend, IssueClient};
use crate::error::BackendError;
use crate::model::{CreatedIssue, IssueSpec, Record, ResolvedIdentifiers};

/// Colour given to auto-created projects (Linear's default grey).
pub const DEFAULT_PROJECT_COLOR: &str = "#bec2c8";

/// The shared client contract on top of any [`Backend`]: name resolution,
/// per-session caching and project auto-creation.
pub struct CachingClient<B> {
    backend: B,
    cache: RecordCache,
}

impl<B: Backend> CachingClient<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cache: RecordCache::default(),
        }
    }

    async fn teams(&mut self) -> Result<&[Record], BackendError> {
        if self.cache.teams().is_none() {
            tracing::debug!(backend = self.backend.name(), "fetching teams");
            let teams = self.backend.list_teams().await?;
            return Ok(self.cache.store_teams(teams));
        }
        Ok(self.cache.teams().unwrap_or_default())
    }

    async fn projects(&mut self, team_id: &str) -> Result<&[Record], BackendError> {
        if self.cache.projects(team_id).is_none() {
            tracing::debug!(backend = self.backend.name(), team_id, "fetching projects");
            let projects = self.backend.list_projects(team_id).await?;
            return Ok(self.cache.store_projects(team_id, projects));
        }
        Ok(self.cache.projects(team_id).unwrap_or_default())
    }

    async fn resolve_team(&mut self, name: &str) -> Result<Record, BackendError> {
        let teams = self.teams().await?;
        match_record(teams, name, "team").cloned()
    }

    /// Returns the project and whether it was created by this call.
    async fn resolve_project(
        &mut self,
        name: &str,
        team: &Record,
        create_if_missing: bool,
    ) -> Result<(Record, bool), BackendError> {
        let team_id = team.require_id()?;
        let projects = self.projects(&team_id).await?;

        let not_found = match match_record(projects, name, "project") {
            Ok(project) => return Ok((project.clone(), false)),
            Err(err) => err,
        };
        if !create_if_missing {
            return Err(not_found);
        }

        let team_name = team.display_name();
        tracing::info!(project = name, team = %team_name, "creating missing project");
        let project = self
            .backend
            .create_project(name.trim(), &team_id, DEFAULT_PROJECT_COLOR)
            .await
            .map_err(|e| {
                BackendError::Creation(format!(
                    "Failed to create project '{}' in team '{team_name}': {e}",
                    name.trim()
                ))
            })?;

        self.cache.append_project(&team_id, project.clone());
        Ok((project, true))
    }
}

#[async_trait]
impl<B: Backend> IssueClient for CachingClient<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    async fn open(&mut self) -> Result<(), BackendError> {
        self.backend.open().await
    }

    async fn close(&mut self) {
        self.backend.close().await;
    }

    async fn resolve_identifiers(
        &mut self,
        team: &str,
        project: &str,
        create_missing_projects: bool,
    ) -> Result<ResolvedIdentifiers, BackendError> {
        let team = self.resolve_team(team).await?;
        let (project, created) = self
            .resolve_project(project, &team, create_missing_projects)
            .await?;
        ResolvedIdentifiers::new(team, project, created)
    }

    async fn create_issue(
        &mut self,
        spec: &IssueSpec,
        identifiers: &ResolvedIdentifiers,
    ) -> Result<CreatedIssue, BackendError> {
        let record = self.backend.create_issue(spec, identifiers).await?;
        Ok(CreatedIssue::new(record))
    }
}
