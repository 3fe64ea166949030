use glass_optimizer_core::project::{check_project_id, now_millis, sort_newest_first};
use glass_optimizer_core::{GlassProject, OptimizerError, ProjectRepository, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Keeps each project as `<id>.json` inside one directory.
pub struct FileProjectRepository {
    dir: PathBuf,
}

impl FileProjectRepository {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage(&dir, e))?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf> {
        check_project_id(id)?;
        Ok(self.dir.join(format!("{}.json", id)))
    }

    fn next_id(&self) -> Result<String> {
        let highest = self
            .list()?
            .iter()
            .filter_map(|p| p.id.strip_prefix("project-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Ok(format!("project-{}", highest + 1))
    }
}

fn storage(path: &Path, err: impl std::fmt::Display) -> OptimizerError {
    OptimizerError::Storage(format!("{}: {}", path.display(), err))
}

impl ProjectRepository for FileProjectRepository {
    fn save(&mut self, mut project: GlassProject) -> Result<String> {
        if project.project_name.trim().is_empty() {
            return Err(OptimizerError::InvalidInput(
                "Project name must not be empty".to_string(),
            ));
        }
        if project.id.is_empty() {
            project.id = self.next_id()?;
        }
        if project.created_at == 0 {
            project.created_at = now_millis();
        }

        let path = self.path_for(&project.id)?;
        let json = serde_json::to_string_pretty(&project).map_err(|e| storage(&path, e))?;
        fs::write(&path, json).map_err(|e| storage(&path, e))?;
        Ok(project.id)
    }

    fn load(&self, id: &str) -> Result<GlassProject> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(OptimizerError::ProjectNotFound(id.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|e| storage(&path, e))?;
        serde_json::from_str(&content).map_err(|e| storage(&path, e))
    }

    fn list(&self) -> Result<Vec<GlassProject>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| storage(&self.dir, e))?;

        let mut projects = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| storage(&self.dir, e))?.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read_to_string(&path).map_err(|e| storage(&path, e))?;
            match serde_json::from_str::<GlassProject>(&content) {
                Ok(project) => projects.push(project),
                Err(err) => tracing::warn!(path = %path.display(), %err, "skipping unreadable project"),
            }
        }

        projects.sort_by(|a, b| a.id.cmp(&b.id));
        sort_newest_first(&mut projects);
        Ok(projects)
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(OptimizerError::ProjectNotFound(id.to_string()));
        }
        fs::remove_file(&path).map_err(|e| storage(&path, e))
    }
}
