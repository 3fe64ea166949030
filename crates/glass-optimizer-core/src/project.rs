//! Saved glass projects and the storage seam they go through.

use crate::orientation::PlateOrientation;
use crate::types::{CutRequest, OptimizationResult, OptimizerError, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// A saved job: the inputs, the chosen plan and how the operator views the plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlassProject {
    /// Assigned by the repository on first save when empty.
    #[serde(default)]
    pub id: String,
    pub project_name: String,
    pub plate_width: f64,
    pub plate_height: f64,
    pub cuts_requested: Vec<CutRequest>,
    #[serde(default)]
    pub optimization_result: Option<OptimizationResult>,
    #[serde(default)]
    pub plate_orientation: PlateOrientation,
    /// Milliseconds since the Unix epoch; stamped on first save when 0.
    #[serde(default)]
    pub created_at: u64,
}

impl GlassProject {
    pub fn new(
        project_name: impl Into<String>,
        plate_width: f64,
        plate_height: f64,
        cuts_requested: Vec<CutRequest>,
    ) -> Self {
        Self {
            id: String::new(),
            project_name: project_name.into(),
            plate_width,
            plate_height,
            cuts_requested,
            optimization_result: None,
            plate_orientation: PlateOrientation::default(),
            created_at: 0,
        }
    }

    pub fn with_result(mut self, result: OptimizationResult) -> Self {
        self.optimization_result = Some(result);
        self
    }

    pub fn with_orientation(mut self, orientation: PlateOrientation) -> Self {
        self.plate_orientation = orientation;
        self
    }
}

/// Storage for [`GlassProject`] records.
///
/// Ids are ASCII letters, digits, `-`, `_` and `.`, and never start with a
/// dot (see [`check_project_id`]). Every implementation accepts the same ids.
pub trait ProjectRepository {
    /// Stores `project`, replacing any record with the same id, and returns its id.
    /// An empty id is replaced with a fresh `project-N` one.
    fn save(&mut self, project: GlassProject) -> Result<String>;

    /// Fails with [`OptimizerError::ProjectNotFound`] for unknown ids.
    fn load(&self, id: &str) -> Result<GlassProject>;

    /// All projects, newest first.
    fn list(&self) -> Result<Vec<GlassProject>>;

    fn delete(&mut self, id: &str) -> Result<()>;
}

/// Rejects ids a repository cannot store, including anything path-like.
pub fn check_project_id(id: &str) -> Result<()> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if id.is_empty() || id.starts_with('.') || !id.chars().all(allowed) {
        return Err(OptimizerError::InvalidInput(format!(
            "Invalid project id '{}'",
            id
        )));
    }
    Ok(())
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Sorts newest first; records saved in the same millisecond keep reverse save order.
pub fn sort_newest_first(projects: &mut [GlassProject]) {
    projects.reverse();
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Process-local repository, used by the HTTP service and in tests.
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    projects: Vec<GlassProject>,
    next_id: u64,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    fn save(&mut self, mut project: GlassProject) -> Result<String> {
        if project.project_name.trim().is_empty() {
            return Err(OptimizerError::InvalidInput(
                "Project name must not be empty".to_string(),
            ));
        }

        if project.id.is_empty() {
            self.next_id += 1;
            project.id = format!("project-{}", self.next_id);
        }
        check_project_id(&project.id)?;
        if project.created_at == 0 {
            project.created_at = now_millis();
        }

        let id = project.id.clone();
        match self.projects.iter_mut().find(|p| p.id == id) {
            Some(existing) => *existing = project,
            None => self.projects.push(project),
        }
        Ok(id)
    }

    fn load(&self, id: &str) -> Result<GlassProject> {
        self.projects
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| OptimizerError::ProjectNotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<GlassProject>> {
        let mut projects = self.projects.clone();
        sort_newest_first(&mut projects);
        Ok(projects)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let before = self.projects.len();
        self.projects.retain(|p| p.id != id);
        if self.projects.len() == before {
            return Err(OptimizerError::ProjectNotFound(id.to_string()));
        }
        Ok(())
    }
}
