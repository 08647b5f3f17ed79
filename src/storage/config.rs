//! Configuration handling for the roadmap CLI
//!
//! Configuration is stored in `.roadmap/config.toml` (project) and
//! `~/.config/roadmap-cli/config.toml` (global).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ReconstructPolicy, DEFAULT_MAX_FRAGMENT_BYTES};

/// Name of the per-project directory
pub const PROJECT_DIR: &str = ".roadmap";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Project-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Store directory, relative to `.roadmap/` unless absolute
    pub store_dir: PathBuf,

    /// Largest serialized outline or phase fragment the store accepts
    pub max_fragment_bytes: usize,

    /// How `store load` handles missing or mismatched fragments
    pub reconstruct_policy: ReconstructPolicy,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("store"),
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
            reconstruct_policy: ReconstructPolicy::Degrade,
        }
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_fragment_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_fragment_bytes must be greater than zero".to_string(),
            ));
        }
        if self.store_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GlobalConfig {
    /// Default output format (text or json)
    pub default_format: OutputFormat,
}

/// Output format for commands
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "roadmap", "roadmap-cli")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Loads global configuration
    pub fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(PROJECT_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")?;

        config
            .validate()
            .with_context(|| format!("Invalid project config: {}", config_path.display()))?;

        Ok(config)
    }

    /// Finds the project root by looking for `.roadmap/` from the current directory up
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_project_root_from(&current)
    }

    /// Finds the project root by looking for `.roadmap/` from `start` up
    pub fn find_project_root_from(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .find(|dir| dir.join(PROJECT_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Returns the project root, or an error if not in a project
    pub fn require_project_root(&self) -> Result<&Path> {
        self.project_root
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("Not in a roadmap project. Run 'roadmap init' first."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = ProjectConfig::default();

        assert_eq!(config.max_fragment_bytes, 1_048_576);
        assert_eq!(config.reconstruct_policy, ReconstructPolicy::Degrade);
        assert_eq!(config.store_dir, PathBuf::from("store"));
        assert_eq!(GlobalConfig::default().default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_config() {
        let toml = r#"
max_fragment_bytes = 4096
reconstruct_policy = "fail"
"#;

        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_fragment_bytes, 4096);
        assert_eq!(config.reconstruct_policy, ReconstructPolicy::Fail);
        assert_eq!(config.store_dir, PathBuf::from("store"));
    }

    #[test]
    fn parse_global_config() {
        let config: GlobalConfig = toml::from_str(r#"default_format = "json""#).unwrap();
        assert_eq!(config.default_format, OutputFormat::Json);
    }

    #[test]
    fn zero_limit_is_invalid() {
        let config = ProjectConfig {
            max_fragment_bytes: 0,
            ..ProjectConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_project_config_fails_to_load() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();
        fs::write(
            dir.path().join(PROJECT_DIR).join("config.toml"),
            "reconstruct_policy = \"sometimes\"\n",
        )
        .unwrap();

        assert!(Config::for_project(dir.path()).is_err());
    }

    #[test]
    fn find_project_root() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(PROJECT_DIR)).unwrap();

        let sub_dir = dir.path().join("sub").join("dir");
        fs::create_dir_all(&sub_dir).unwrap();

        let root = Config::find_project_root_from(&sub_dir);
        assert_eq!(root.as_deref(), Some(dir.path()));
    }

    #[test]
    fn config_not_in_project() {
        let config = Config {
            project: ProjectConfig::default(),
            global: GlobalConfig::default(),
            project_root: None,
        };

        assert!(config.require_project_root().is_err());
    }
}
