//! Reference validation between a parent and a child fragment
//!
//! Checks are pairwise: roadmap IDs must match, a phase-tasks fragment must
//! target a phase declared in the skeleton, and a task-details fragment must
//! target a task listed in its phase-tasks fragment. Callers run this once
//! per (parent, child) pair after structural validation.

use std::collections::HashMap;

use serde_json::Value;

use super::report::{IssueCode, ValidationIssue, ValidationReport};
use crate::domain::{declared_schema_type, SchemaType};

const METADATA: &str = "schema_metadata";

fn metadata_str<'a>(fragment: &'a Value, key: &str) -> Option<&'a str> {
    fragment.get(METADATA)?.get(key)?.as_str()
}

fn ids_in<'a>(fragment: &'a Value, list: &str, key: &'a str) -> impl Iterator<Item = &'a str> {
    fragment
        .get(list)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(move |item| item.get(key).and_then(Value::as_str))
}

fn metadata_issue(code: IssueCode, key: &str, message: String) -> ValidationIssue {
    ValidationIssue::error(code, message).at(format!("/{}/{}", METADATA, key), METADATA)
}

/// Validates the references from `child` into `parent`
pub fn validate_references(parent: &Value, child: &Value) -> ValidationReport {
    let mut report = ValidationReport::new();

    let (Some(parent_type), Some(child_type)) =
        (declared_schema_type(parent), declared_schema_type(child))
    else {
        report.push(
            ValidationIssue::error(
                IssueCode::MissingRequired,
                format!("Missing required property '{}'", METADATA),
            )
            .at(format!("/{}", METADATA), "")
            .expected("object"),
        );
        return report;
    };

    let parent_id = metadata_str(parent, "roadmap_id");
    let child_id = metadata_str(child, "roadmap_id");
    if parent_id != child_id {
        let mut issue = metadata_issue(
            IssueCode::RoadmapIdMismatch,
            "roadmap_id",
            "Roadmap ID mismatch between schemas".to_string(),
        );
        if let Some(expected) = parent_id {
            issue = issue.expected(expected);
        }
        if let Some(actual) = child_id {
            issue = issue.actual(actual);
        }
        report.push(issue);
    }

    match (parent_type, child_type) {
        (SchemaType::Skeleton, SchemaType::PhaseTasks) => {
            if let Some(target) = metadata_str(child, "target_phase_id") {
                if !ids_in(parent, "phases", "phase_id").any(|id| id == target) {
                    report.push(
                        metadata_issue(
                            IssueCode::TargetPhaseNotFound,
                            "target_phase_id",
                            format!("Target phase '{}' not found in roadmap skeleton", target),
                        )
                        .actual(target),
                    );
                }
            }
        }
        (SchemaType::PhaseTasks, SchemaType::TaskDetails) => {
            let parent_phase = metadata_str(parent, "target_phase_id");
            let child_phase = metadata_str(child, "target_phase_id");
            if let (Some(parent_phase), Some(child_phase)) = (parent_phase, child_phase) {
                if parent_phase != child_phase {
                    report.push(
                        metadata_issue(
                            IssueCode::TargetPhaseMismatch,
                            "target_phase_id",
                            format!(
                                "Target phase '{}' does not match phase tasks fragment '{}'",
                                child_phase, parent_phase
                            ),
                        )
                        .expected(parent_phase)
                        .actual(child_phase),
                    );
                }
            }

            if let Some(target) = metadata_str(child, "target_task_id") {
                if !ids_in(parent, "tasks", "task_id").any(|id| id == target) {
                    report.push(
                        metadata_issue(
                            IssueCode::TargetTaskNotFound,
                            "target_task_id",
                            format!("Target task '{}' not found in phase tasks", target),
                        )
                        .actual(target),
                    );
                }
            }
        }
        (parent_type, child_type) => {
            report.push(
                ValidationIssue::error(
                    IssueCode::UnsupportedPairing,
                    format!(
                        "Unsupported schema pairing: {} -> {}",
                        parent_type, child_type
                    ),
                )
                .at(format!("/{}/schema_type", METADATA), METADATA),
            );
        }
    }

    report
}

/// A fragment together with the name it is reported under (usually its file name)
#[derive(Debug, Clone, Copy)]
pub struct Labeled<'a> {
    pub label: &'a str,
    pub value: &'a Value,
}

fn duplicate_issue(key: &str, target: &str, first: &str) -> ValidationIssue {
    metadata_issue(
        IssueCode::DuplicateTarget,
        key,
        format!("Target '{}' is already covered by {}", target, first),
    )
    .actual(target)
}

/// Runs the pairwise check for every fragment of one roadmap
///
/// Each task fragment is checked against the skeleton. Each detail fragment
/// is checked against the task fragment targeting the same phase; a detail
/// fragment whose phase has no task fragment is reported as not found.
/// Two task fragments for one phase, or two detail fragments for one task,
/// are reported on the later fragment.
pub fn validate_fragment_set(
    skeleton: &Value,
    task_fragments: &[Labeled<'_>],
    detail_fragments: &[Labeled<'_>],
) -> ValidationReport {
    let mut report = ValidationReport::new();

    // target -> label of the first fragment claiming it
    let mut phase_owners: HashMap<&str, &str> = HashMap::new();
    for fragment in task_fragments {
        let mut pair = validate_references(skeleton, fragment.value);
        if let Some(target) = metadata_str(fragment.value, "target_phase_id") {
            if let Some(first) = phase_owners.get(target) {
                pair.push(duplicate_issue("target_phase_id", target, first));
            } else {
                phase_owners.insert(target, fragment.label);
            }
        }
        report.absorb(fragment.label, pair);
    }

    let mut task_owners: HashMap<(&str, &str), &str> = HashMap::new();
    for fragment in detail_fragments {
        if let (Some(phase), Some(task)) = (
            metadata_str(fragment.value, "target_phase_id"),
            metadata_str(fragment.value, "target_task_id"),
        ) {
            if let Some(first) = task_owners.get(&(phase, task)) {
                let mut duplicate = ValidationReport::new();
                duplicate.push(duplicate_issue(
                    "target_task_id",
                    &format!("{}/{}", phase, task),
                    first,
                ));
                report.absorb(fragment.label, duplicate);
            } else {
                task_owners.insert((phase, task), fragment.label);
            }
        }
    }

    for fragment in detail_fragments {
        let target = metadata_str(fragment.value, "target_phase_id");
        let parent = task_fragments
            .iter()
            .rev()
            .find(|f| target.is_some() && metadata_str(f.value, "target_phase_id") == target);

        match (parent, target) {
            (Some(parent), _) => {
                report.absorb(fragment.label, validate_references(parent.value, fragment.value));
            }
            (None, Some(target)) => {
                let mut missing = ValidationReport::new();
                missing.push(
                    metadata_issue(
                        IssueCode::TargetPhaseNotFound,
                        "target_phase_id",
                        format!("Target phase '{}' not found in phase tasks", target),
                    )
                    .actual(target),
                );
                report.absorb(fragment.label, missing);
            }
            // No target at all is a structural error, reported there
            (None, None) => {}
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn skeleton(roadmap_id: &str) -> Value {
        json!({
            "schema_metadata": {"schema_type": "skeleton", "roadmap_id": roadmap_id},
            "phases": [{"phase_id": "P1"}, {"phase_id": "P2"}]
        })
    }

    fn phase_tasks(roadmap_id: &str, phase: &str) -> Value {
        json!({
            "schema_metadata": {
                "schema_type": "phase_tasks",
                "roadmap_id": roadmap_id,
                "target_phase_id": phase
            },
            "tasks": [{"task_id": "T1"}, {"task_id": "T2"}]
        })
    }

    fn task_details(roadmap_id: &str, phase: &str, task: &str) -> Value {
        json!({
            "schema_metadata": {
                "schema_type": "task_details",
                "roadmap_id": roadmap_id,
                "target_phase_id": phase,
                "target_task_id": task
            },
            "task_detail": {}
        })
    }

    #[test]
    fn matching_references_pass() {
        assert!(validate_references(&skeleton("rm"), &phase_tasks("rm", "P2")).is_valid());
        assert!(
            validate_references(&phase_tasks("rm", "P2"), &task_details("rm", "P2", "T1"))
                .is_valid()
        );
    }

    #[test]
    fn dangling_target_phase_yields_exactly_one_error() {
        let report = validate_references(&skeleton("rm"), &phase_tasks("rm", "P9"));

        assert_eq!(
            report.error_messages(),
            vec!["schema_metadata: Target phase 'P9' not found in roadmap skeleton"]
        );
        assert_eq!(report.issues()[0].code, IssueCode::TargetPhaseNotFound);
    }

    #[test]
    fn roadmap_id_mismatch() {
        let report = validate_references(&skeleton("rm-a"), &phase_tasks("rm-b", "P1"));

        assert_eq!(report.error_count(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.message, "Roadmap ID mismatch between schemas");
        assert_eq!(issue.expected.as_deref(), Some("rm-a"));
        assert_eq!(issue.actual.as_deref(), Some("rm-b"));
    }

    #[test]
    fn dangling_target_task() {
        let report =
            validate_references(&phase_tasks("rm", "P1"), &task_details("rm", "P1", "T7"));

        assert_eq!(
            report.error_messages(),
            vec!["schema_metadata: Target task 'T7' not found in phase tasks"]
        );
    }

    #[test]
    fn detail_targeting_other_phase() {
        let report =
            validate_references(&phase_tasks("rm", "P1"), &task_details("rm", "P2", "T1"));

        let codes: Vec<_> = report.errors().map(|i| i.code).collect();
        assert_eq!(codes, vec![IssueCode::TargetPhaseMismatch]);
    }

    #[test]
    fn unsupported_pairing() {
        let report = validate_references(&skeleton("rm"), &task_details("rm", "P1", "T1"));

        assert_eq!(
            report.error_messages(),
            vec!["schema_metadata: Unsupported schema pairing: skeleton -> task_details"]
        );
    }

    #[test]
    fn missing_metadata() {
        let report = validate_references(&json!({}), &phase_tasks("rm", "P1"));

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues()[0].code, IssueCode::MissingRequired);
    }

    #[test]
    fn fragment_set_labels_each_fragment() {
        let skeleton = skeleton("rm");
        let p1 = phase_tasks("rm", "P1");
        let p9 = phase_tasks("rm", "P9");
        let d1 = task_details("rm", "P1", "T2");
        let d2 = task_details("rm", "P2", "T1");

        let report = validate_fragment_set(
            &skeleton,
            &[
                Labeled { label: "p1.json", value: &p1 },
                Labeled { label: "p9.json", value: &p9 },
            ],
            &[
                Labeled { label: "d1.json", value: &d1 },
                Labeled { label: "d2.json", value: &d2 },
            ],
        );

        assert_eq!(
            report.error_messages(),
            vec![
                "p9.json, schema_metadata: Target phase 'P9' not found in roadmap skeleton",
                "d2.json, schema_metadata: Target phase 'P2' not found in phase tasks",
            ]
        );
    }

    #[test]
    fn fragment_set_rejects_second_task_fragment_for_phase() {
        let skeleton = skeleton("rm");
        let first = phase_tasks("rm", "P1");
        let second = phase_tasks("rm", "P1");

        let report = validate_fragment_set(
            &skeleton,
            &[
                Labeled { label: "a.json", value: &first },
                Labeled { label: "b.json", value: &second },
            ],
            &[],
        );

        assert_eq!(
            report.error_messages(),
            vec!["b.json, schema_metadata: Target 'P1' is already covered by a.json"]
        );
        assert_eq!(report.issues()[0].code, IssueCode::DuplicateTarget);
    }

    #[test]
    fn fragment_set_rejects_second_detail_fragment_for_task() {
        let skeleton = skeleton("rm");
        let tasks = phase_tasks("rm", "P1");
        let first = task_details("rm", "P1", "T1");
        let second = task_details("rm", "P1", "T1");

        let report = validate_fragment_set(
            &skeleton,
            &[Labeled { label: "p1.json", value: &tasks }],
            &[
                Labeled { label: "t1.json", value: &first },
                Labeled { label: "t1-again.json", value: &second },
            ],
        );

        assert_eq!(
            report.error_messages(),
            vec!["t1-again.json, schema_metadata: Target 'P1/T1' is already covered by t1.json"]
        );
    }
}
