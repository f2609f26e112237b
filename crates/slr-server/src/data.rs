//! JSON-file persistence for projects, papers and query history.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use slr_core::{DEFAULT_PROJECT_ID, Paper, Project, QueryHistoryEntry, ReviewStatus};
use thiserror::Error;

pub const DEFAULT_DATA_FILE: &str = "slr_extension_data.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionData {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub papers: Vec<Paper>,
    #[serde(default)]
    pub query_history: Vec<QueryHistoryEntry>,
}

impl Default for ExtensionData {
    fn default() -> Self {
        Self {
            projects: vec![Project::new(DEFAULT_PROJECT_ID, "Default Project")],
            papers: Vec::new(),
            query_history: Vec::new(),
        }
    }
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Project ID already exists")]
    DuplicateProject,
    #[error("Paper not found")]
    PaperNotFound,
    #[error("Failed to write data file: {0}")]
    Io(#[from] std::io::Error),
}

/// The data file. Every operation is a locked read-modify-write of the
/// whole document.
pub struct DataFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current contents. A missing or unreadable file reads as the seeded default.
    fn load(&self) -> ExtensionData {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return ExtensionData::default(),
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "data file unreadable, starting fresh");
            ExtensionData::default()
        })
    }

    fn save(&self, data: &ExtensionData) -> Result<(), DataError> {
        let content = serde_json::to_string_pretty(data).map_err(std::io::Error::from)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Run `f` against the current data and persist the result if it succeeds.
    fn update<T>(
        &self,
        f: impl FnOnce(&mut ExtensionData) -> Result<T, DataError>,
    ) -> Result<T, DataError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut data = self.load();
        let result = f(&mut data)?;
        self.save(&data)?;
        Ok(result)
    }

    /// Like [`update`](Self::update) for changes that cannot be rejected.
    fn mutate<T>(&self, f: impl FnOnce(&mut ExtensionData) -> T) -> Result<T, DataError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut data = self.load();
        let result = f(&mut data);
        self.save(&data)?;
        Ok(result)
    }

    fn read<T>(&self, f: impl FnOnce(ExtensionData) -> T) -> T {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        f(self.load())
    }

    pub fn projects(&self) -> Vec<Project> {
        self.read(|d| d.projects)
    }

    pub fn create_project(&self, project: Project) -> Result<Project, DataError> {
        self.update(|data| {
            if data.projects.iter().any(|p| p.id == project.id) {
                return Err(DataError::DuplicateProject);
            }
            data.projects.push(project.clone());
            Ok(project)
        })
    }

    pub fn papers(&self, project_id: &str) -> Vec<Paper> {
        self.read(|d| {
            d.papers
                .into_iter()
                .filter(|p| p.project_id == project_id)
                .collect()
        })
    }

    /// Insert, or replace the paper with the same id in place.
    pub fn upsert_paper(&self, paper: Paper) -> Result<Paper, DataError> {
        self.mutate(|data| {
            match data.papers.iter_mut().find(|p| p.id == paper.id) {
                Some(existing) => *existing = paper.clone(),
                None => data.papers.push(paper.clone()),
            }
            paper
        })
    }

    pub fn delete_paper(&self, paper_id: &str) -> Result<(), DataError> {
        self.update(|data| {
            let before = data.papers.len();
            data.papers.retain(|p| p.id != paper_id);
            if data.papers.len() == before {
                return Err(DataError::PaperNotFound);
            }
            Ok(())
        })
    }

    pub fn set_status(
        &self,
        paper_id: &str,
        status: ReviewStatus,
    ) -> Result<(), DataError> {
        self.update(|data| match data.papers.iter_mut().find(|p| p.id == paper_id) {
            Some(paper) => {
                paper.status = status;
                Ok(())
            }
            None => Err(DataError::PaperNotFound),
        })
    }

    pub fn log_query(&self, query: &str, project_id: &str) -> Result<QueryHistoryEntry, DataError> {
        let entry = QueryHistoryEntry {
            query: query.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            project_id: project_id.to_string(),
        };
        self.mutate(|data| {
            data.query_history.push(entry.clone());
            entry
        })
    }

    pub fn history(&self, project_id: &str) -> Vec<QueryHistoryEntry> {
        self.read(|d| {
            d.query_history
                .into_iter()
                .filter(|h| h.project_id == project_id)
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file() -> (tempfile::TempDir, DataFile) {
        let dir = tempfile::tempdir().unwrap();
        let file = DataFile::new(dir.path().join(DEFAULT_DATA_FILE));
        (dir, file)
    }

    #[test]
    fn fresh_file_is_seeded() {
        let (_dir, file) = temp_file();
        let projects = file.projects();
        assert_eq!(projects, vec![Project::new("default", "Default Project")]);
    }

    #[test]
    fn garbage_file_reads_as_seeded() {
        let (_dir, file) = temp_file();
        std::fs::write(file.path(), "{ not json").unwrap();
        assert_eq!(file.projects().len(), 1);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let (_dir, file) = temp_file();
        file.upsert_paper(Paper::new("a", "A")).unwrap();
        file.upsert_paper(Paper::new("b", "B")).unwrap();
        file.upsert_paper(Paper::new("a", "A, revised")).unwrap();

        let papers = file.papers("default");
        assert_eq!(papers.len(), 2);
        assert_eq!(papers[0].title, "A, revised");
    }

    #[test]
    fn duplicate_project_is_rejected() {
        let (_dir, file) = temp_file();
        let err = file
            .create_project(Project::new("default", "Again"))
            .unwrap_err();
        assert!(matches!(err, DataError::DuplicateProject));
        assert_eq!(err.to_string(), "Project ID already exists");
    }

    #[test]
    fn unknown_delete_is_not_found() {
        let (_dir, file) = temp_file();
        let err = file.delete_paper("nope").unwrap_err();
        assert!(matches!(err, DataError::PaperNotFound));
    }

    #[test]
    fn unwritable_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = DataFile::new(dir.path().join("missing").join(DEFAULT_DATA_FILE));
        let err = file.upsert_paper(Paper::new("a", "A")).unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
        assert!(err.to_string().starts_with("Failed to write data file"));
    }

    #[test]
    fn history_is_per_project() {
        let (_dir, file) = temp_file();
        file.log_query("q1", "default").unwrap();
        file.log_query("q2", "thesis").unwrap();
        let history = file.history("thesis");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].query, "q2");
    }
}
