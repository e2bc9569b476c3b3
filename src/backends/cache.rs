use std::collections::HashMap;

use crate::model::Record;

/// Per-session memo of team and project listings.
///
/// Owned by one client; never shared and never expired. The only mutation
/// besides population is [`RecordCache::append_project`] after a project is
/// created.
#[derive(Debug, Default)]
pub struct RecordCache {
    teams: Option<Vec<Record>>,
    projects: HashMap<String, Vec<Record>>,
}

impl RecordCache {
    pub fn teams(&self) -> Option<&[Record]> {
        self.teams.as_deref()
    }

    pub fn store_teams(&mut self, teams: Vec<Record>) -> &[Record] {
        self.teams.insert(teams)
    }

    pub fn projects(&self, team_id: &str) -> Option<&[Record]> {
        self.projects.get(team_id).map(Vec::as_slice)
    }

    pub fn store_projects(&mut self, team_id: &str, projects: Vec<Record>) -> &[Record] {
        let entry = self.projects.entry(team_id.to_string()).or_default();
        *entry = projects;
        entry
    }

    pub fn append_project(&mut self, team_id: &str, project: Record) {
        self.projects
            .entry(team_id.to_string())
            .or_default()
            .push(project);
    }
}
