//! Validation reports
//!
//! Validators never fail; they return a report listing every issue found.
//! Each issue carries a stable [`IssueCode`] so callers can pick remediation
//! hints by code instead of matching on message text.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::domain::wire_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    /// Reported but does not make the document invalid
    Warning,
}

wire_enum!(
    IssueCode {
        /// The document itself is null or not an object
        InvalidDocument => "invalid_document",
        MissingRequired => "missing_required",
        InvalidType => "invalid_type",
        InvalidEnum => "invalid_enum",
        EmptyIdentifier => "empty_identifier",
        /// Identifier contains characters a join key may not hold
        InvalidIdentifier => "invalid_identifier",
        DuplicateId => "duplicate_id",
        /// A property is set under both its name and its alias
        DuplicateProperty => "duplicate_property",
        SchemaTypeMismatch => "schema_type_mismatch",
        MissingTarget => "missing_target",
        RoadmapIdMismatch => "roadmap_id_mismatch",
        TargetPhaseNotFound => "target_phase_not_found",
        TargetTaskNotFound => "target_task_not_found",
        TargetPhaseMismatch => "target_phase_mismatch",
        /// Two fragments of one set target the same phase or task
        DuplicateTarget => "duplicate_target",
        UnsupportedPairing => "unsupported_pairing",
        UnknownPhaseDependency => "unknown_phase_dependency",
        PhaseDependencyCycle => "phase_dependency_cycle",
    }
);

impl IssueCode {
    /// Remediation hint shown next to issues with this code
    pub fn hint(&self) -> &'static str {
        match self {
            IssueCode::InvalidDocument => "Make sure the file contains a single JSON object.",
            IssueCode::MissingRequired => "Add the missing property; the engine never fills it in.",
            IssueCode::InvalidType => "Change the value to the expected JSON type.",
            IssueCode::InvalidEnum => "Use one of the allowed values listed in the message.",
            IssueCode::EmptyIdentifier => "Give the item a non-empty identifier.",
            IssueCode::InvalidIdentifier => "Remove control characters from the identifier.",
            IssueCode::DuplicateId => "Rename one of the items so identifiers are unique.",
            IssueCode::DuplicateProperty => "Keep only one of the two property names.",
            IssueCode::SchemaTypeMismatch => {
                "Check schema_metadata.schema_type or validate the file as a different kind."
            }
            IssueCode::MissingTarget => {
                "Set the target_phase_id / target_task_id this fragment belongs to."
            }
            IssueCode::RoadmapIdMismatch => {
                "Use the same schema_metadata.roadmap_id in every fragment of one roadmap."
            }
            IssueCode::TargetPhaseNotFound => {
                "Point target_phase_id at a phase declared in the skeleton."
            }
            IssueCode::TargetTaskNotFound => {
                "Point target_task_id at a task listed in the phase tasks fragment."
            }
            IssueCode::TargetPhaseMismatch => {
                "A task details fragment must target the same phase as its phase tasks fragment."
            }
            IssueCode::DuplicateTarget => {
                "Drop or merge one of the fragments; each phase and task takes one fragment."
            }
            IssueCode::UnsupportedPairing => {
                "Pair skeleton with phase tasks, or phase tasks with task details."
            }
            IssueCode::UnknownPhaseDependency => {
                "Remove the dependency or declare the phase it refers to."
            }
            IssueCode::PhaseDependencyCycle => "Break the cycle between the listed phases.",
        }
    }
}

/// One structural or referential problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,

    /// JSON pointer to the offending value (e.g. `/phases/1/tasks/2/task_id`)
    pub path: String,

    /// Human-readable position (e.g. `Phase 2, Task 3`); empty at the root
    #[serde(skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Stable user-facing wording
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl ValidationIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            path: String::new(),
            location: String::new(),
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn at(mut self, path: impl Into<String>, location: impl Into<String>) -> Self {
        self.path = path.into();
        self.location = location.into();
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.location, self.message)
        }
    }
}

/// Outcome of validating one document or one fragment pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Appends another report's issues, prefixing their location with `label`
    pub fn absorb(&mut self, label: &str, other: ValidationReport) {
        for mut issue in other.issues {
            issue.location = if issue.location.is_empty() {
                label.to_string()
            } else {
                format!("{}, {}", label, issue.location)
            };
            self.issues.push(issue);
        }
    }

    /// True when no error-severity issue was found
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| !i.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    /// Error lines as shown to users, e.g. `Phase 2, Task 3: Missing required property 'task_id'`
    pub fn error_messages(&self) -> Vec<String> {
        self.errors().map(|i| i.to_string()).collect()
    }
}

impl Serialize for ValidationReport {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("ValidationReport", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("errors", &self.error_messages())?;
        state.serialize_field("issues", &self.issues)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_invalidate() {
        let mut report = ValidationReport::new();
        report.push(ValidationIssue::warning(
            IssueCode::UnknownPhaseDependency,
            "Phase 'P2' depends on unknown phase 'P0'",
        ));

        assert!(report.is_valid());
        assert_eq!(report.warnings().count(), 1);
        assert!(report.error_messages().is_empty());
    }

    #[test]
    fn display_prefixes_location() {
        let issue = ValidationIssue::error(
            IssueCode::MissingRequired,
            "Missing required property 'task_id'",
        )
        .at("/phases/1/tasks/2", "Phase 2, Task 3");

        assert_eq!(
            issue.to_string(),
            "Phase 2, Task 3: Missing required property 'task_id'"
        );
    }

    #[test]
    fn absorb_prefixes_label() {
        let mut inner = ValidationReport::new();
        inner.push(ValidationIssue::error(IssueCode::InvalidType, "bad").at("/x", "Phase 1"));
        inner.push(ValidationIssue::error(IssueCode::InvalidType, "worse"));

        let mut outer = ValidationReport::new();
        outer.absorb("tasks.json", inner);

        assert_eq!(
            outer.error_messages(),
            vec!["tasks.json, Phase 1: bad", "tasks.json: worse"]
        );
    }

    #[test]
    fn serializes_flat_error_list() {
        let mut report = ValidationReport::new();
        report.push(
            ValidationIssue::error(IssueCode::InvalidEnum, "Invalid value")
                .expected("a|b")
                .actual("c"),
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["is_valid"], false);
        assert_eq!(json["errors"][0], "Invalid value");
        assert_eq!(json["issues"][0]["code"], "invalid_enum");
        assert_eq!(json["issues"][0]["expected"], "a|b");
    }

    #[test]
    fn every_code_has_a_hint() {
        assert!(!IssueCode::PhaseDependencyCycle.hint().is_empty());
        assert_eq!(IssueCode::TargetPhaseNotFound.as_str(), "target_phase_not_found");
    }

    #[test]
    fn wire_names_match_serialized_codes() {
        for code in IssueCode::ALL {
            assert_eq!(serde_json::to_value(code).unwrap(), code.as_str());
            assert!(!code.hint().is_empty());
        }
    }
}
