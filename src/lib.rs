//! Roadmap CLI - validate, merge, and partition modular roadmap documents
//!
//! A roadmap is authored as a skeleton (phases without tasks), one task
//! fragment per phase, and one detail fragment per task. This crate checks
//! each fragment against its schema and against its parent, merges the set
//! into one canonical document, and splits that document again into pieces
//! small enough for a size-limited store.

pub mod domain;
pub mod schema;
pub mod storage;
pub mod cli;

pub use domain::{PhaseId, RoadmapDocument, RoadmapId, TaskId};
pub use schema::{ValidationIssue, ValidationReport};
