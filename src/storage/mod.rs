//! # Storage Layer
//!
//! Persistence for partitioned roadmaps with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Outline + manifest | JSON | `.roadmap/store/{roadmap_id}/outline.json` |
//! | Phase tasks | JSON | `.roadmap/store/{roadmap_id}/phases/{phase_id}.json` |
//! | Config | TOML | `.roadmap/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`FileFragmentStore`] uses file locking (`fs2`) for concurrent access
//! - All writes are atomic (temp file + rename)
//! - [`RoadmapStore::save`] writes phase fragments before the outline
//!
//! ## Key Types
//!
//! - [`Project`] - Entry point for accessing a roadmap project
//! - [`FragmentStore`] - Backend trait, with file and in-memory implementations
//! - [`RoadmapStore`] - Save, load, list, and recount whole roadmaps
//! - [`Config`] - Project and global configuration

mod config;
mod project;
mod roadmap_store;
mod store;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, PROJECT_DIR};
pub use project::{Project, ProjectError};
pub use roadmap_store::{Manifest, Recount, RoadmapStore, SaveSummary, StoreError, StoredRoadmap};
pub use store::{encode_component, FileFragmentStore, FragmentKey, FragmentStore, MemoryFragmentStore, Slot};
