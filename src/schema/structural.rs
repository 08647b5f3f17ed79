//! Structural validation of a single document
//!
//! Checks one JSON document against one [`SchemaKind`] descriptor: required
//! properties, JSON types, enumerated values, identifier uniqueness, and the
//! fragment's `schema_metadata`. Every violation in the document is
//! collected in one pass; nothing here panics on malformed input.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::descriptor::{FieldKind, FieldSpec, ObjectSchema, SchemaKind};
use super::report::{IssueCode, ValidationIssue, ValidationReport};
use crate::domain::{check_identifier, IdError, PhaseGraph, PhaseId, SchemaType};

/// Validates `document` as a `kind` document
pub fn validate(document: &Value, kind: SchemaKind) -> ValidationReport {
    let mut walker = Walker::default();

    let object = match document.as_object() {
        Some(object) => object,
        None => {
            walker.report.push(
                ValidationIssue::error(
                    IssueCode::InvalidDocument,
                    format!(
                        "Invalid document: expected a JSON object, got {}",
                        json_type(document)
                    ),
                )
                .expected("object")
                .actual(json_type(document)),
            );
            return walker.report;
        }
    };

    walker.check_object(object, kind.descriptor());

    if let Some(expected) = kind.schema_type() {
        walker.check_metadata(object, expected);
    }

    if matches!(kind, SchemaKind::Skeleton | SchemaKind::Final) {
        walker.check_phase_dependencies(object);
    }

    walker.report
}

/// Returns the JSON type name of a value
pub fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

enum Segment {
    Field(&'static str),
    Item {
        field: &'static str,
        label: &'static str,
        index: usize,
    },
}

#[derive(Default)]
struct Walker {
    path: Vec<Segment>,
    report: ValidationReport,
}

impl Walker {
    /// JSON pointer of the current position
    fn pointer(&self) -> String {
        let mut pointer = String::new();
        for segment in &self.path {
            match segment {
                Segment::Field(name) => {
                    pointer.push('/');
                    pointer.push_str(name);
                }
                Segment::Item { field, index, .. } => {
                    pointer.push_str(&format!("/{}/{}", field, index));
                }
            }
        }
        pointer
    }

    fn pointer_to(&self, name: &str) -> String {
        format!("{}/{}", self.pointer(), name)
    }

    /// Human-readable position, e.g. `Phase 2, Task 3, task_detail.est_time`
    fn location(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut dotted: Vec<&str> = Vec::new();

        for segment in &self.path {
            match segment {
                Segment::Field(name) => dotted.push(name),
                Segment::Item { label, index, .. } => {
                    if !dotted.is_empty() {
                        parts.push(dotted.join("."));
                        dotted.clear();
                    }
                    parts.push(format!("{} {}", label, index + 1));
                }
            }
        }
        if !dotted.is_empty() {
            parts.push(dotted.join("."));
        }

        parts.join(", ")
    }

    fn error(&mut self, name: &str, issue: ValidationIssue) {
        let issue = issue.at(self.pointer_to(name), self.location());
        self.report.push(issue);
    }

    fn type_error(&mut self, name: &str, expected: &str, value: &Value) {
        let actual = json_type(value);
        self.error(
            name,
            ValidationIssue::error(
                IssueCode::InvalidType,
                format!(
                    "Invalid type for '{}': expected {}, got {}",
                    name, expected, actual
                ),
            )
            .expected(expected)
            .actual(actual),
        );
    }

    fn check_object(&mut self, object: &Map<String, Value>, schema: &'static ObjectSchema) {
        for field in schema.all_fields() {
            let name = match field.alias {
                Some(alias) if object.contains_key(alias) => {
                    if object.contains_key(field.name) {
                        self.error(
                            alias,
                            ValidationIssue::error(
                                IssueCode::DuplicateProperty,
                                format!(
                                    "Properties '{}' and '{}' are both set; keep only '{}'",
                                    field.name, alias, field.name
                                ),
                            ),
                        );
                        continue;
                    }
                    alias
                }
                _ => field.name,
            };

            match object.get(name) {
                None | Some(Value::Null) if field.required => {
                    self.error(
                        name,
                        ValidationIssue::error(
                            IssueCode::MissingRequired,
                            format!("Missing required property '{}'", name),
                        )
                        .expected(field.kind.type_name()),
                    );
                }
                None | Some(Value::Null) => {}
                Some(value) => self.check_field(name, field, value),
            }
        }
    }

    fn check_field(&mut self, name: &'static str, field: &'static FieldSpec, value: &Value) {
        match field.kind {
            FieldKind::String => {
                if !value.is_string() {
                    self.type_error(name, "string", value);
                }
            }
            FieldKind::Identifier => self.check_identifier(name, value),
            FieldKind::Number => {
                if !value.is_number() {
                    self.type_error(name, "number", value);
                }
            }
            FieldKind::Boolean => {
                if !value.is_boolean() {
                    self.type_error(name, "boolean", value);
                }
            }
            FieldKind::Enum(allowed) => self.check_enum(name, allowed, value),
            FieldKind::StringArray | FieldKind::IdentifierArray => {
                let Some(items) = value.as_array() else {
                    self.type_error(name, "array", value);
                    return;
                };
                let identifiers = matches!(field.kind, FieldKind::IdentifierArray);
                for (index, item) in items.iter().enumerate() {
                    let item_name = format!("{}[{}]", name, index);
                    if identifiers {
                        self.check_identifier(&item_name, item);
                    } else if !item.is_string() {
                        self.type_error(&item_name, "string", item);
                    }
                }
            }
            FieldKind::Object(schema) => {
                let Some(object) = value.as_object() else {
                    self.type_error(name, "object", value);
                    return;
                };
                self.path.push(Segment::Field(name));
                self.check_object(object, schema);
                self.path.pop();
            }
            FieldKind::ObjectArray(schema) => {
                let Some(items) = value.as_array() else {
                    self.type_error(name, "array", value);
                    return;
                };
                self.check_items(name, items, schema);
            }
        }
    }

    fn check_items(&mut self, field: &'static str, items: &[Value], schema: &'static ObjectSchema) {
        // id -> first 1-based position, for duplicate detection
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for (index, item) in items.iter().enumerate() {
            let Some(object) = item.as_object() else {
                self.type_error(&format!("{}[{}]", field, index), "object", item);
                continue;
            };

            self.path.push(Segment::Item {
                field,
                label: schema.label,
                index,
            });
            self.check_object(object, schema);

            if let Some(key) = schema.unique_key {
                if let Some(id) = object.get(key).and_then(Value::as_str) {
                    if !id.trim().is_empty() {
                        if let Some(first) = seen.get(id) {
                            let message = format!(
                                "Duplicate {} '{}' (first used by {} {})",
                                key, id, schema.label, first
                            );
                            self.error(
                                key,
                                ValidationIssue::error(IssueCode::DuplicateId, message)
                                    .actual(id),
                            );
                        } else {
                            seen.insert(id, index + 1);
                        }
                    }
                }
            }

            self.path.pop();
        }
    }

    /// Applies the same rules the typed IDs enforce on deserialization
    fn check_identifier(&mut self, name: &str, value: &Value) {
        let Some(id) = value.as_str() else {
            self.type_error(name, "string", value);
            return;
        };
        match check_identifier("identifier", id) {
            Ok(()) => {}
            Err(IdError::Empty { .. }) => self.error(
                name,
                ValidationIssue::error(
                    IssueCode::EmptyIdentifier,
                    format!("Invalid value for '{}': identifier must not be empty", name),
                )
                .expected("non-empty string")
                .actual(id),
            ),
            Err(IdError::ControlCharacter { .. }) => self.error(
                name,
                ValidationIssue::error(
                    IssueCode::InvalidIdentifier,
                    format!(
                        "Invalid value for '{}': identifier must not contain control characters",
                        name
                    ),
                )
                .expected("string without control characters")
                .actual(id.escape_debug().to_string()),
            ),
        }
    }

    fn check_enum(&mut self, name: &str, allowed: &[&str], value: &Value) {
        let Some(actual) = value.as_str() else {
            self.type_error(name, "string", value);
            return;
        };
        if !allowed.contains(&actual) {
            let expected = allowed.join(", ");
            self.error(
                name,
                ValidationIssue::error(
                    IssueCode::InvalidEnum,
                    format!(
                        "Invalid value '{}' for '{}': expected one of [{}]",
                        actual, name, expected
                    ),
                )
                .expected(expected)
                .actual(actual),
            );
        }
    }

    /// Fragment-specific metadata rules beyond the generic shape
    fn check_metadata(&mut self, object: &Map<String, Value>, expected: SchemaType) {
        let Some(metadata) = object.get("schema_metadata").and_then(Value::as_object) else {
            return;
        };
        self.path.push(Segment::Field("schema_metadata"));

        if let Some(declared) = metadata.get("schema_type").and_then(Value::as_str) {
            if SchemaType::VALUES.contains(&declared) && declared != expected.as_str() {
                self.error(
                    "schema_type",
                    ValidationIssue::error(
                        IssueCode::SchemaTypeMismatch,
                        format!(
                            "Invalid schema_type '{}': expected '{}'",
                            declared, expected
                        ),
                    )
                    .expected(expected.as_str())
                    .actual(declared),
                );
            }
        }

        let targets: &[&str] = match expected {
            SchemaType::Skeleton => &[],
            SchemaType::PhaseTasks => &["target_phase_id"],
            SchemaType::TaskDetails => &["target_phase_id", "target_task_id"],
        };
        for target in targets {
            if metadata.get(*target).map_or(true, Value::is_null) {
                self.error(
                    target,
                    ValidationIssue::error(
                        IssueCode::MissingTarget,
                        format!("Missing required property '{}'", target),
                    )
                    .expected("string"),
                );
            }
        }

        self.path.pop();
    }

    /// Warns about dependencies on undeclared phases and dependency cycles
    fn check_phase_dependencies(&mut self, object: &Map<String, Value>) {
        let Some(phases) = object.get("phases").and_then(Value::as_array) else {
            return;
        };

        let mut declared: Vec<(usize, PhaseId, Vec<PhaseId>)> = Vec::new();
        for (index, phase) in phases.iter().enumerate() {
            let Some(id) = phase
                .get("phase_id")
                .and_then(Value::as_str)
                .and_then(|id| PhaseId::new(id).ok())
            else {
                continue;
            };
            let deps = phase
                .get("phase_dependencies")
                .and_then(Value::as_array)
                .map(|deps| {
                    deps.iter()
                        .filter_map(Value::as_str)
                        .filter_map(|d| PhaseId::new(d).ok())
                        .collect()
                })
                .unwrap_or_default();
            declared.push((index, id, deps));
        }

        let graph = PhaseGraph::new(declared.iter().map(|(_, id, deps)| (id, deps.iter())));

        let positions: HashMap<&PhaseId, usize> =
            declared.iter().map(|(index, id, _)| (id, *index)).collect();
        for (phase, missing) in graph.unknown_dependencies() {
            let index = positions.get(phase).copied().unwrap_or_default();
            self.path.push(Segment::Item {
                field: "phases",
                label: "Phase",
                index,
            });
            self.error(
                "phase_dependencies",
                ValidationIssue::warning(
                    IssueCode::UnknownPhaseDependency,
                    format!("Phase '{}' depends on unknown phase '{}'", phase, missing),
                )
                .actual(missing.as_str()),
            );
            self.path.pop();
        }

        for cycle in graph.cycles() {
            let members: Vec<&str> = cycle.iter().map(PhaseId::as_str).collect();
            self.error(
                "phases",
                ValidationIssue::warning(
                    IssueCode::PhaseDependencyCycle,
                    format!("Phase dependencies form a cycle: {}", members.join(", ")),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phase(id: &str) -> Value {
        json!({
            "phase_id": id,
            "phase_title": format!("Phase {}", id),
            "phase_summary": "summary",
            "phase_details": ["detail"],
            "phase_dependencies": [],
            "key_milestones": [],
            "success_indicators": []
        })
    }

    fn task(id: &str) -> Value {
        json!({
            "task_id": id,
            "task_title": "Title",
            "task_summary": "Summary",
            "task_priority": "high",
            "task_tags": ["tag"],
            "task_dependencies": [
                {"phase_id": "P1", "task_id": "T0", "dependency_type": "required"}
            ]
        })
    }

    fn task_detail() -> Value {
        json!({
            "explanation": {"content": "Because", "format": "markdown"},
            "difficulty": {"level": "normal", "reason": "Some setup", "prerequisites": []},
            "est_time": {
                "min_time": {"amount": 2, "unit": "hours"},
                "max_time": {"amount": 1.5, "unit": "days"},
                "factors": ["experience"]
            },
            "resource_links": [
                {"name": "The Book", "url": "https://doc.rust-lang.org/book/", "type": "book"}
            ],
            "code_blocks": [{"code": "fn main() {}", "language": "rust"}],
            "outcomes": ["Can compile"],
            "subtasks": [{"title": "Install", "completed": false}]
        })
    }

    fn skeleton() -> Value {
        json!({
            "schema_metadata": {"schema_type": "skeleton", "roadmap_id": "rm-1"},
            "title": "Rust",
            "description": "Learn Rust",
            "tags": ["rust"],
            "project_level": "beginner",
            "phases": [phase("P1"), phase("P2")]
        })
    }

    fn final_document() -> Value {
        let mut p1 = phase("P1");
        p1["tasks"] = json!([task("T1"), task("T2")]);
        p1["tasks"][0]["task_detail"] = task_detail();
        let mut p2 = phase("P2");
        p2["tasks"] = json!([]);
        json!({
            "title": "Rust",
            "description": "Learn Rust",
            "tags": [],
            "project_level": "expert",
            "phases": [p1, p2]
        })
    }

    fn task_details_fragment(detail: Value) -> Value {
        json!({
            "schema_metadata": {
                "schema_type": "task_details",
                "roadmap_id": "rm-1",
                "target_phase_id": "P1",
                "target_task_id": "T1"
            },
            "task_detail": detail
        })
    }

    #[test]
    fn valid_documents_pass() {
        assert!(validate(&skeleton(), SchemaKind::Skeleton).issues().is_empty());
        assert!(validate(&final_document(), SchemaKind::Final).issues().is_empty());
        assert!(validate(&task_details_fragment(task_detail()), SchemaKind::TaskDetails).is_valid());

        let tasks = json!({
            "schema_metadata": {"schema_type": "phase_tasks", "roadmap_id": "rm-1", "target_phase_id": "P1"},
            "tasks": [task("T1")]
        });
        assert!(validate(&tasks, SchemaKind::PhaseTasks).is_valid());
    }

    #[test]
    fn null_document_yields_single_error() {
        let report = validate(&Value::Null, SchemaKind::Final);

        assert!(!report.is_valid());
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues()[0].code, IssueCode::InvalidDocument);

        assert_eq!(validate(&json!([1, 2]), SchemaKind::Skeleton).error_count(), 1);
    }

    #[test]
    fn missing_task_id_is_prefixed_with_position() {
        let mut doc = final_document();
        doc["phases"][1]["tasks"] = json!([task("A"), task("B"), task("C")]);
        doc["phases"][1]["tasks"][2]
            .as_object_mut()
            .unwrap()
            .remove("task_id");

        let report = validate(&doc, SchemaKind::Final);

        assert_eq!(
            report.error_messages(),
            vec!["Phase 2, Task 3: Missing required property 'task_id'"]
        );
        assert_eq!(report.issues()[0].path, "/phases/1/tasks/2/task_id");
    }

    #[test]
    fn collects_errors_at_every_level() {
        let mut doc = final_document();
        doc.as_object_mut().unwrap().remove("title");
        doc["phases"][0].as_object_mut().unwrap().remove("phase_summary");
        doc["phases"][0]["tasks"][1]
            .as_object_mut()
            .unwrap()
            .remove("task_title");
        doc["phases"][0]["tasks"][0]["task_detail"]["est_time"]["min_time"]
            .as_object_mut()
            .unwrap()
            .remove("amount");

        let report = validate(&doc, SchemaKind::Final);

        assert_eq!(
            report.error_messages(),
            vec![
                "Missing required property 'title'",
                "Phase 1: Missing required property 'phase_summary'",
                "Phase 1, Task 1, task_detail.est_time.min_time: Missing required property 'amount'",
                "Phase 1, Task 2: Missing required property 'task_title'",
            ]
        );
    }

    #[test]
    fn validation_is_idempotent() {
        let mut doc = final_document();
        doc["project_level"] = json!("guru");
        doc["phases"][0]["tasks"][0]["task_tags"] = json!([1]);

        let first = validate(&doc, SchemaKind::Final);
        let second = validate(&doc, SchemaKind::Final);

        assert_eq!(first, second);
        assert_eq!(first.error_count(), 2);
    }

    #[test]
    fn invalid_difficulty_names_allowed_set() {
        let mut detail = task_detail();
        detail["difficulty"]["level"] = json!("impossible");

        let report = validate(&task_details_fragment(detail), SchemaKind::TaskDetails);

        assert_eq!(report.error_count(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.code, IssueCode::InvalidEnum);
        assert_eq!(
            issue.to_string(),
            "task_detail.difficulty: Invalid value 'impossible' for 'level': \
             expected one of [very_easy, easy, normal, difficult, challenging]"
        );
        assert_eq!(issue.actual.as_deref(), Some("impossible"));
    }

    #[test]
    fn type_errors_name_expected_and_actual() {
        let mut doc = skeleton();
        doc["tags"] = json!("rust");
        doc["phases"][0]["phase_title"] = json!(7);

        let report = validate(&doc, SchemaKind::Skeleton);

        assert_eq!(
            report.error_messages(),
            vec![
                "Invalid type for 'tags': expected array, got string",
                "Phase 1: Invalid type for 'phase_title': expected string, got number",
            ]
        );
    }

    #[test]
    fn enum_fields_are_checked_in_nested_collections() {
        let mut doc = final_document();
        doc["phases"][0]["tasks"][1]["task_priority"] = json!("urgent");
        doc["phases"][0]["tasks"][1]["task_dependencies"][0]["dependency_type"] = json!("soft");
        doc["phases"][0]["tasks"][0]["task_detail"]["resource_links"][0]["type"] = json!("podcast");
        doc["phases"][0]["tasks"][0]["task_detail"]["est_time"]["min_time"]["unit"] = json!("years");

        let report = validate(&doc, SchemaKind::Final);
        let codes: Vec<_> = report.errors().map(|i| i.code).collect();

        assert_eq!(codes, vec![IssueCode::InvalidEnum; 4]);
        assert!(report.error_messages()[0].starts_with(
            "Phase 1, Task 1, task_detail.est_time.min_time: Invalid value 'years'"
        ));
        assert!(report.error_messages()[1].starts_with(
            "Phase 1, Task 1, task_detail, Resource link 1: Invalid value 'podcast'"
        ));
        assert!(report.error_messages()[3].starts_with("Phase 1, Task 2, Dependency 1:"));
    }

    #[test]
    fn reports_duplicate_identifiers() {
        let mut doc = skeleton();
        doc["phases"] = json!([phase("P1"), phase("P2"), phase("P1")]);

        let report = validate(&doc, SchemaKind::Skeleton);

        assert_eq!(
            report.error_messages(),
            vec!["Phase 3: Duplicate phase_id 'P1' (first used by Phase 1)"]
        );
    }

    #[test]
    fn empty_identifier_is_rejected() {
        let mut doc = skeleton();
        doc["phases"][1]["phase_id"] = json!("  ");

        let report = validate(&doc, SchemaKind::Skeleton);

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues()[0].code, IssueCode::EmptyIdentifier);
    }

    #[test]
    fn control_character_identifier_is_rejected() {
        let mut doc = skeleton();
        doc["phases"][0]["phase_id"] = json!("P\u{1}1");

        let report = validate(&doc, SchemaKind::Skeleton);

        assert_eq!(report.error_count(), 1);
        let issue = &report.issues()[0];
        assert_eq!(issue.code, IssueCode::InvalidIdentifier);
        assert_eq!(issue.path, "/phases/0/phase_id");
        assert_eq!(
            issue.to_string(),
            "Phase 1: Invalid value for 'phase_id': identifier must not contain control characters"
        );
    }

    #[test]
    fn detail_alias_is_validated_like_task_detail() {
        let mut doc = final_document();
        doc["phases"][0]["tasks"][1]["detail"] = json!("garbage");

        let report = validate(&doc, SchemaKind::Final);

        assert_eq!(
            report.error_messages(),
            vec!["Phase 1, Task 2: Invalid type for 'detail': expected object, got string"]
        );
        assert_eq!(report.issues()[0].path, "/phases/0/tasks/1/detail");

        doc["phases"][0]["tasks"][1]["detail"] = task_detail();
        doc["phases"][0]["tasks"][1]["detail"]["difficulty"]["level"] = json!("impossible");
        let report = validate(&doc, SchemaKind::Final);
        assert!(report.error_messages()[0]
            .starts_with("Phase 1, Task 2, detail.difficulty: Invalid value 'impossible'"));
    }

    #[test]
    fn detail_alias_and_task_detail_together_are_rejected() {
        let mut doc = final_document();
        doc["phases"][0]["tasks"][0]["detail"] = task_detail();

        let report = validate(&doc, SchemaKind::Final);

        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues()[0].code, IssueCode::DuplicateProperty);
        assert!(serde_json::from_value::<crate::domain::RoadmapDocument>(doc).is_err());
    }

    #[test]
    fn documents_that_pass_also_deserialize() {
        let mut doc = final_document();
        doc["phases"][0]["tasks"][1]["detail"] = task_detail();

        assert!(validate(&doc, SchemaKind::Final).issues().is_empty());
        let typed: crate::domain::RoadmapDocument = serde_json::from_value(doc).unwrap();
        assert_eq!(typed.detail_count(), 2);

        let skeleton = skeleton();
        assert!(validate(&skeleton, SchemaKind::Skeleton).is_valid());
        assert!(crate::domain::Fragment::from_value(skeleton).is_ok());
    }

    #[test]
    fn fragment_metadata_must_match_kind() {
        let tasks = json!({
            "schema_metadata": {"schema_type": "skeleton", "roadmap_id": "rm-1"},
            "tasks": []
        });

        let report = validate(&tasks, SchemaKind::PhaseTasks);
        let codes: Vec<_> = report.errors().map(|i| i.code).collect();

        assert_eq!(codes, vec![IssueCode::SchemaTypeMismatch, IssueCode::MissingTarget]);
        assert_eq!(
            report.error_messages()[1],
            "schema_metadata: Missing required property 'target_phase_id'"
        );
    }

    #[test]
    fn phase_dependency_problems_are_warnings() {
        let mut doc = skeleton();
        doc["phases"][0]["phase_dependencies"] = json!(["P2"]);
        doc["phases"][1]["phase_dependencies"] = json!(["P1", "P0"]);

        let report = validate(&doc, SchemaKind::Skeleton);

        assert!(report.is_valid());
        let warnings: Vec<_> = report.warnings().map(|i| i.to_string()).collect();
        assert_eq!(
            warnings,
            vec![
                "Phase 2: Phase 'P2' depends on unknown phase 'P0'",
                "Phase dependencies form a cycle: P1, P2",
            ]
        );
    }
}
