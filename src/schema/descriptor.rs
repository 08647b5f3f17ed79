//! Static schema descriptors
//!
//! One descriptor per document kind: skeleton, phase tasks, task details, and
//! the final (canonical) roadmap. Descriptors are plain lookup tables; all
//! checking logic lives in the structural validator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{
    ContentFormat, DependencyType, DifficultyLevel, ProjectLevel, ResourceType, SchemaType,
    TaskPriority, TimeUnit,
};

/// The kind of document being validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    Skeleton,
    PhaseTasks,
    TaskDetails,
    /// The merged canonical roadmap
    Final,
}

impl SchemaKind {
    /// Fragment kinds carry `schema_metadata`; the final document does not
    pub fn schema_type(&self) -> Option<SchemaType> {
        match self {
            SchemaKind::Skeleton => Some(SchemaType::Skeleton),
            SchemaKind::PhaseTasks => Some(SchemaType::PhaseTasks),
            SchemaKind::TaskDetails => Some(SchemaType::TaskDetails),
            SchemaKind::Final => None,
        }
    }

    pub fn descriptor(&self) -> &'static ObjectSchema {
        match self {
            SchemaKind::Skeleton => &SKELETON,
            SchemaKind::PhaseTasks => &PHASE_TASKS,
            SchemaKind::TaskDetails => &TASK_DETAILS,
            SchemaKind::Final => &FINAL,
        }
    }
}

impl From<SchemaType> for SchemaKind {
    fn from(schema_type: SchemaType) -> Self {
        match schema_type {
            SchemaType::Skeleton => SchemaKind::Skeleton,
            SchemaType::PhaseTasks => SchemaKind::PhaseTasks,
            SchemaType::TaskDetails => SchemaKind::TaskDetails,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Skeleton => f.write_str("skeleton"),
            SchemaKind::PhaseTasks => f.write_str("phase_tasks"),
            SchemaKind::TaskDetails => f.write_str("task_details"),
            SchemaKind::Final => f.write_str("final"),
        }
    }
}

/// Expected shape of one property
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    String,
    /// Non-empty string used as a join key
    Identifier,
    Number,
    Boolean,
    Enum(&'static [&'static str]),
    StringArray,
    IdentifierArray,
    Object(&'static ObjectSchema),
    ObjectArray(&'static ObjectSchema),
}

impl FieldKind {
    /// JSON type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::String | FieldKind::Identifier | FieldKind::Enum(_) => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::StringArray | FieldKind::IdentifierArray | FieldKind::ObjectArray(_) => {
                "array"
            }
            FieldKind::Object(_) => "object",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,

    /// Second accepted name; setting both is an error
    pub alias: Option<&'static str>,
}

impl FieldSpec {
    const fn with_alias(self, alias: &'static str) -> Self {
        FieldSpec {
            alias: Some(alias),
            ..self
        }
    }
}

const fn required(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: true,
        alias: None,
    }
}

const fn optional(name: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required: false,
        alias: None,
    }
}

/// Properties of one JSON object
#[derive(Debug)]
pub struct ObjectSchema {
    /// Positional label for items of an array of this schema (`Phase`, `Task`)
    pub label: &'static str,

    /// Fields checked before this schema's own
    pub extends: Option<&'static ObjectSchema>,

    pub fields: &'static [FieldSpec],

    /// Identifier property that must be unique across sibling items
    pub unique_key: Option<&'static str>,
}

impl ObjectSchema {
    /// Every field, inherited ones first
    pub fn all_fields(&self) -> Vec<&'static FieldSpec> {
        let mut fields = match self.extends {
            Some(parent) => parent.all_fields(),
            None => Vec::new(),
        };
        fields.extend(self.fields.iter());
        fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.all_fields().into_iter().find(|f| f.name == name)
    }
}

pub static SCHEMA_METADATA: ObjectSchema = ObjectSchema {
    label: "Schema metadata",
    extends: None,
    fields: &[
        required("schema_type", FieldKind::Enum(SchemaType::VALUES)),
        required("roadmap_id", FieldKind::Identifier),
        optional("target_phase_id", FieldKind::Identifier),
        optional("target_task_id", FieldKind::Identifier),
    ],
    unique_key: None,
};

pub static DEPENDENCY: ObjectSchema = ObjectSchema {
    label: "Dependency",
    extends: None,
    fields: &[
        required("phase_id", FieldKind::Identifier),
        required("task_id", FieldKind::Identifier),
        required("dependency_type", FieldKind::Enum(DependencyType::VALUES)),
    ],
    unique_key: None,
};

pub static EXPLANATION: ObjectSchema = ObjectSchema {
    label: "Explanation",
    extends: None,
    fields: &[
        required("content", FieldKind::String),
        required("format", FieldKind::Enum(ContentFormat::VALUES)),
    ],
    unique_key: None,
};

pub static DIFFICULTY: ObjectSchema = ObjectSchema {
    label: "Difficulty",
    extends: None,
    fields: &[
        required("level", FieldKind::Enum(DifficultyLevel::VALUES)),
        required("reason", FieldKind::String),
        required("prerequisites", FieldKind::StringArray),
    ],
    unique_key: None,
};

pub static TIME_VALUE: ObjectSchema = ObjectSchema {
    label: "Time",
    extends: None,
    fields: &[
        required("amount", FieldKind::Number),
        required("unit", FieldKind::Enum(TimeUnit::VALUES)),
    ],
    unique_key: None,
};

pub static EST_TIME: ObjectSchema = ObjectSchema {
    label: "Estimated time",
    extends: None,
    fields: &[
        required("min_time", FieldKind::Object(&TIME_VALUE)),
        optional("max_time", FieldKind::Object(&TIME_VALUE)),
        required("factors", FieldKind::StringArray),
    ],
    unique_key: None,
};

pub static RESOURCE_LINK: ObjectSchema = ObjectSchema {
    label: "Resource link",
    extends: None,
    fields: &[
        required("name", FieldKind::String),
        required("url", FieldKind::String),
        required("type", FieldKind::Enum(ResourceType::VALUES)),
    ],
    unique_key: None,
};

pub static CODE_BLOCK: ObjectSchema = ObjectSchema {
    label: "Code block",
    extends: None,
    fields: &[
        required("code", FieldKind::String),
        optional("language", FieldKind::String),
        optional("explanation", FieldKind::String),
    ],
    unique_key: None,
};

pub static SUBTASK: ObjectSchema = ObjectSchema {
    label: "Subtask",
    extends: None,
    fields: &[
        required("title", FieldKind::String),
        optional("subtask_id", FieldKind::String),
        optional("completed", FieldKind::Boolean),
    ],
    unique_key: None,
};

pub static TASK_DETAIL: ObjectSchema = ObjectSchema {
    label: "Task detail",
    extends: None,
    fields: &[
        required("explanation", FieldKind::Object(&EXPLANATION)),
        required("difficulty", FieldKind::Object(&DIFFICULTY)),
        required("est_time", FieldKind::Object(&EST_TIME)),
        required("resource_links", FieldKind::ObjectArray(&RESOURCE_LINK)),
        required("code_blocks", FieldKind::ObjectArray(&CODE_BLOCK)),
        required("outcomes", FieldKind::StringArray),
        required("subtasks", FieldKind::ObjectArray(&SUBTASK)),
    ],
    unique_key: None,
};

pub static TASK: ObjectSchema = ObjectSchema {
    label: "Task",
    extends: None,
    fields: &[
        required("task_id", FieldKind::Identifier),
        required("task_title", FieldKind::String),
        required("task_summary", FieldKind::String),
        required("task_priority", FieldKind::Enum(TaskPriority::VALUES)),
        required("task_tags", FieldKind::StringArray),
        required("task_dependencies", FieldKind::ObjectArray(&DEPENDENCY)),
        optional("task_detail", FieldKind::Object(&TASK_DETAIL)).with_alias("detail"),
    ],
    unique_key: Some("task_id"),
};

/// A phase as declared in the skeleton (no tasks)
pub static PHASE_HEADER: ObjectSchema = ObjectSchema {
    label: "Phase",
    extends: None,
    fields: &[
        required("phase_id", FieldKind::Identifier),
        required("phase_title", FieldKind::String),
        required("phase_summary", FieldKind::String),
        required("phase_details", FieldKind::StringArray),
        required("phase_dependencies", FieldKind::IdentifierArray),
        required("key_milestones", FieldKind::StringArray),
        required("success_indicators", FieldKind::StringArray),
    ],
    unique_key: Some("phase_id"),
};

/// A phase of the final document (tasks attached)
pub static PHASE: ObjectSchema = ObjectSchema {
    label: "Phase",
    extends: Some(&PHASE_HEADER),
    fields: &[required("tasks", FieldKind::ObjectArray(&TASK))],
    unique_key: Some("phase_id"),
};

static ROADMAP_HEADER: ObjectSchema = ObjectSchema {
    label: "Roadmap",
    extends: None,
    fields: &[
        required("title", FieldKind::String),
        required("description", FieldKind::String),
        required("tags", FieldKind::StringArray),
        required("project_level", FieldKind::Enum(ProjectLevel::VALUES)),
    ],
    unique_key: None,
};

pub static SKELETON: ObjectSchema = ObjectSchema {
    label: "Skeleton",
    extends: Some(&ROADMAP_HEADER),
    fields: &[
        required("schema_metadata", FieldKind::Object(&SCHEMA_METADATA)),
        required("phases", FieldKind::ObjectArray(&PHASE_HEADER)),
    ],
    unique_key: None,
};

pub static PHASE_TASKS: ObjectSchema = ObjectSchema {
    label: "Phase tasks",
    extends: None,
    fields: &[
        required("schema_metadata", FieldKind::Object(&SCHEMA_METADATA)),
        required("tasks", FieldKind::ObjectArray(&TASK)),
    ],
    unique_key: None,
};

pub static TASK_DETAILS: ObjectSchema = ObjectSchema {
    label: "Task details",
    extends: None,
    fields: &[
        required("schema_metadata", FieldKind::Object(&SCHEMA_METADATA)),
        required("task_detail", FieldKind::Object(&TASK_DETAIL)),
    ],
    unique_key: None,
};

pub static FINAL: ObjectSchema = ObjectSchema {
    label: "Roadmap",
    extends: Some(&ROADMAP_HEADER),
    fields: &[required("phases", FieldKind::ObjectArray(&PHASE))],
    unique_key: None,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_phase_inherits_header_fields() {
        let names: Vec<_> = PHASE.all_fields().iter().map(|f| f.name).collect();

        assert_eq!(names.first(), Some(&"phase_id"));
        assert_eq!(names.last(), Some(&"tasks"));
        assert_eq!(names.len(), PHASE_HEADER.fields.len() + 1);
    }

    #[test]
    fn enum_fields_share_domain_values() {
        match DIFFICULTY.field("level").map(|f| f.kind) {
            Some(FieldKind::Enum(values)) => assert_eq!(values.len(), 5),
            other => panic!("unexpected field kind: {:?}", other),
        }
    }

    #[test]
    fn kinds_map_to_schema_types() {
        assert_eq!(SchemaKind::from(SchemaType::PhaseTasks), SchemaKind::PhaseTasks);
        assert_eq!(SchemaKind::Final.schema_type(), None);
        assert_eq!(SchemaKind::TaskDetails.to_string(), "task_details");
    }
}
