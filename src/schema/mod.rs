//! # Schema Validation
//!
//! Validation of roadmap documents and fragments before they are merged.
//!
//! | Stage | Function | Scope |
//! |-------|----------|-------|
//! | Structural | [`validate`] | one document against one [`SchemaKind`] |
//! | Reference | [`validate_references`] | one (parent, child) fragment pair |
//! | Reference | [`validate_fragment_set`] | every pair of one roadmap |
//!
//! Both stages return a [`ValidationReport`] listing every issue found;
//! neither fails on malformed input.

mod descriptor;
mod reference;
mod report;
mod structural;

pub use descriptor::{FieldKind, FieldSpec, ObjectSchema, SchemaKind};
pub use reference::{validate_fragment_set, validate_references, Labeled};
pub use report::{IssueCode, Severity, ValidationIssue, ValidationReport};
pub use structural::{json_type, validate};

/// Picks the schema kind a document declares, falling back to the final document
pub fn infer_kind(document: &serde_json::Value) -> SchemaKind {
    crate::domain::declared_schema_type(document)
        .map(SchemaKind::from)
        .unwrap_or(SchemaKind::Final)
}
