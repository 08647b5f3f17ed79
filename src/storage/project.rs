//! Project management
//!
//! Handles project initialization and provides access to the roadmap store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, PROJECT_DIR};
use super::roadmap_store::RoadmapStore;
use super::store::FileFragmentStore;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Not in a roadmap project. Run 'roadmap init' first.")]
    NotInProject,
}

const DEFAULT_CONFIG: &str = r#"# Roadmap CLI configuration

# Store directory, relative to .roadmap/
store_dir = "store"

# Largest outline or phase fragment the store accepts, in bytes
max_fragment_bytes = 1048576

# How 'roadmap store load' handles missing fragments: "degrade" or "fail"
reconstruct_policy = "degrade"
"#;

const GITIGNORE: &str = r#"# Ignore interrupted writes
*.tmp
"#;

/// A roadmap project rooted at a directory containing `.roadmap/`
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    /// Opens an existing project at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.join(PROJECT_DIR).is_dir() {
            return Err(ProjectError::NotInProject.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the project at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(ProjectError::NotInProject)?;

        Self::open(root)
    }

    /// Initializes a new project at the given path; existing files are kept
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let project_dir = root.join(PROJECT_DIR);

        fs::create_dir_all(&project_dir).with_context(|| {
            format!("Failed to create {} directory: {}", PROJECT_DIR, project_dir.display())
        })?;

        let config_path = project_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        let project = Self::open(root)?;

        let store_dir = project.store_dir();
        fs::create_dir_all(&store_dir).with_context(|| {
            format!("Failed to create store directory: {}", store_dir.display())
        })?;

        Ok(project)
    }

    /// Returns the project root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .roadmap directory path
    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the store directory
    pub fn store_dir(&self) -> PathBuf {
        self.project_dir().join(&self.config.project.store_dir)
    }

    /// Returns the file-backed roadmap store, limited per the project config
    pub fn roadmap_store(&self) -> RoadmapStore<FileFragmentStore> {
        RoadmapStore::new(FileFragmentStore::new(self.store_dir()))
            .with_limit(self.config.project.max_fragment_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert!(project.project_dir().is_dir());
        assert!(project.project_dir().join("config.toml").is_file());
        assert!(project.project_dir().join(".gitignore").is_file());
        assert!(project.store_dir().is_dir());
    }

    #[test]
    fn default_config_file_parses() {
        let dir = TempDir::new().unwrap();
        let project = Project::init(dir.path()).unwrap();

        assert_eq!(
            project.config().project,
            crate::storage::ProjectConfig::default()
        );
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();

        Project::init(dir.path()).unwrap();
        Project::init(dir.path()).unwrap();

        assert!(dir.path().join(PROJECT_DIR).is_dir());
    }

    #[test]
    fn open_non_project_fails() {
        let dir = TempDir::new().unwrap();
        let result = Project::open(dir.path());

        assert!(result.is_err());
    }

    #[test]
    fn store_honours_configured_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        fs::write(
            dir.path().join(PROJECT_DIR).join("config.toml"),
            "store_dir = \"fragments\"\n",
        )
        .unwrap();

        let project = Project::init(dir.path()).unwrap();
        let store = project.roadmap_store();

        assert!(store.backend().root().ends_with("fragments"));
        assert!(project.store_dir().is_dir());
    }
}
