//! Authoring fragments
//!
//! A roadmap can be authored as one skeleton plus phase-tasks files plus
//! task-details files. Each fragment carries `schema_metadata`, the join key
//! that ties it to its parent.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::id::{PhaseId, RoadmapId, TaskId};
use super::roadmap::{wire_enum, PhaseHeader, RoadmapHeader, Task, TaskDetail};

wire_enum!(
    /// Which fragment kind a document declares itself to be
    SchemaType {
        Skeleton => "skeleton",
        PhaseTasks => "phase_tasks",
        TaskDetails => "task_details",
    }
);

#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("Fragment has no schema_metadata object")]
    MissingMetadata,

    #[error("Expected a {expected} fragment, found {found}")]
    WrongType {
        expected: SchemaType,
        found: SchemaType,
    },

    #[error("{schema_type} fragment is missing {field}")]
    MissingTarget {
        schema_type: SchemaType,
        field: &'static str,
    },

    #[error("Malformed fragment: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Join metadata carried by every fragment (never by the canonical document)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaMetadata {
    pub schema_type: SchemaType,
    pub roadmap_id: RoadmapId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_phase_id: Option<PhaseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_task_id: Option<TaskId>,
}

/// Top-level roadmap declaring phases but not task bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonFragment {
    pub schema_metadata: SchemaMetadata,
    #[serde(flatten)]
    pub header: RoadmapHeader,
    #[serde(default)]
    pub phases: Vec<PhaseHeader>,
}

/// The task list of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTasksFragment {
    pub schema_metadata: SchemaMetadata,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl PhaseTasksFragment {
    pub fn target_phase_id(&self) -> Option<&PhaseId> {
        self.schema_metadata.target_phase_id.as_ref()
    }
}

/// The detail of one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetailsFragment {
    pub schema_metadata: SchemaMetadata,
    pub task_detail: TaskDetail,
}

impl TaskDetailsFragment {
    pub fn target_phase_id(&self) -> Option<&PhaseId> {
        self.schema_metadata.target_phase_id.as_ref()
    }

    pub fn target_task_id(&self) -> Option<&TaskId> {
        self.schema_metadata.target_task_id.as_ref()
    }
}

/// Any fragment, dispatched on `schema_metadata.schema_type`
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Skeleton(SkeletonFragment),
    PhaseTasks(PhaseTasksFragment),
    TaskDetails(TaskDetailsFragment),
}

impl Fragment {
    /// Converts already-validated JSON into a typed fragment
    pub fn from_value(value: serde_json::Value) -> Result<Self, FragmentError> {
        let schema_type = declared_schema_type(&value).ok_or(FragmentError::MissingMetadata)?;

        let fragment = match schema_type {
            SchemaType::Skeleton => Fragment::Skeleton(serde_json::from_value(value)?),
            SchemaType::PhaseTasks => {
                let fragment: PhaseTasksFragment = serde_json::from_value(value)?;
                if fragment.target_phase_id().is_none() {
                    return Err(FragmentError::MissingTarget {
                        schema_type,
                        field: "target_phase_id",
                    });
                }
                Fragment::PhaseTasks(fragment)
            }
            SchemaType::TaskDetails => {
                let fragment: TaskDetailsFragment = serde_json::from_value(value)?;
                if fragment.target_phase_id().is_none() {
                    return Err(FragmentError::MissingTarget {
                        schema_type,
                        field: "target_phase_id",
                    });
                }
                if fragment.target_task_id().is_none() {
                    return Err(FragmentError::MissingTarget {
                        schema_type,
                        field: "target_task_id",
                    });
                }
                Fragment::TaskDetails(fragment)
            }
        };

        Ok(fragment)
    }

    pub fn metadata(&self) -> &SchemaMetadata {
        match self {
            Fragment::Skeleton(f) => &f.schema_metadata,
            Fragment::PhaseTasks(f) => &f.schema_metadata,
            Fragment::TaskDetails(f) => &f.schema_metadata,
        }
    }

    pub fn schema_type(&self) -> SchemaType {
        self.metadata().schema_type
    }

    pub fn into_skeleton(self) -> Result<SkeletonFragment, FragmentError> {
        match self {
            Fragment::Skeleton(f) => Ok(f),
            other => Err(FragmentError::WrongType {
                expected: SchemaType::Skeleton,
                found: other.schema_type(),
            }),
        }
    }

    pub fn into_phase_tasks(self) -> Result<PhaseTasksFragment, FragmentError> {
        match self {
            Fragment::PhaseTasks(f) => Ok(f),
            other => Err(FragmentError::WrongType {
                expected: SchemaType::PhaseTasks,
                found: other.schema_type(),
            }),
        }
    }

    pub fn into_task_details(self) -> Result<TaskDetailsFragment, FragmentError> {
        match self {
            Fragment::TaskDetails(f) => Ok(f),
            other => Err(FragmentError::WrongType {
                expected: SchemaType::TaskDetails,
                found: other.schema_type(),
            }),
        }
    }
}

/// Reads `schema_metadata.schema_type` from raw JSON without validating the rest
pub fn declared_schema_type(value: &serde_json::Value) -> Option<SchemaType> {
    let raw = value.get("schema_metadata")?.get("schema_type")?.clone();
    serde_json::from_value(raw).ok()
}
