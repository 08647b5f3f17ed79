//! Canonical roadmap model
//!
//! A roadmap is an ordered list of phases, each holding an ordered list of
//! tasks, each optionally carrying a task detail. Field names match the JSON
//! wire format used by every fragment.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::id::{PhaseId, TaskId};

/// Declares a closed enumeration whose wire names are also exposed as a
/// static list, so schema descriptors and error messages share one source.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident {
        $($(#[$vmeta:meta])* $variant:ident => $wire:literal),+ $(,)?
    }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire names of every variant, in declaration order
            pub const VALUES: &'static [&'static str] = &[$($wire),+];

            /// Returns the wire name
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use wire_enum;

wire_enum!(
    /// Intended audience level of a roadmap
    ProjectLevel {
        Beginner => "beginner",
        Intermediate => "intermediate",
        Advanced => "advanced",
        Expert => "expert",
    }
);

wire_enum!(
    /// Priority of a task
    TaskPriority {
        Low => "low",
        Mid => "mid",
        High => "high",
        Critical => "critical",
    }
);

wire_enum!(
    /// Strength of a dependency between tasks
    DependencyType {
        Required => "required",
        Recommended => "recommended",
        Optional => "optional",
    }
);

wire_enum!(
    /// Markup used by an explanation body
    ContentFormat {
        Plaintext => "plaintext",
        Markdown => "markdown",
        Html => "html",
    }
);

wire_enum!(
    /// Difficulty rating of a task
    DifficultyLevel {
        VeryEasy => "very_easy",
        Easy => "easy",
        Normal => "normal",
        Difficult => "difficult",
        Challenging => "challenging",
    }
);

wire_enum!(
    /// Unit of a time estimate
    TimeUnit {
        Minutes => "minutes",
        Hours => "hours",
        Days => "days",
        Weeks => "weeks",
        Months => "months",
    }
);

wire_enum!(
    /// Kind of an external learning resource
    ResourceType {
        Documentation => "documentation",
        Tutorial => "tutorial",
        Video => "video",
        Article => "article",
        Tool => "tool",
        Book => "book",
        Course => "course",
        Other => "other",
    }
);

/// Top-level roadmap fields shared by the skeleton, outline, and canonical document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapHeader {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_level: ProjectLevel,
}

/// Every phase field except the task list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseHeader {
    pub phase_id: PhaseId,
    pub phase_title: String,
    pub phase_summary: String,
    #[serde(default)]
    pub phase_details: Vec<String>,
    /// Phases that should be completed first (set semantics, authored order kept)
    #[serde(default)]
    pub phase_dependencies: Vec<PhaseId>,
    #[serde(default)]
    pub key_milestones: Vec<String>,
    #[serde(default)]
    pub success_indicators: Vec<String>,
}

/// A reference to another task; the target may not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub phase_id: PhaseId,
    pub task_id: TaskId,
    pub dependency_type: DependencyType,
}

/// A unit of work within a phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_title: String,
    pub task_summary: String,
    pub task_priority: TaskPriority,
    #[serde(default)]
    pub task_tags: Vec<String>,
    #[serde(default)]
    pub task_dependencies: Vec<Dependency>,
    #[serde(
        rename = "task_detail",
        alias = "detail",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub detail: Option<TaskDetail>,
}

impl Task {
    /// Returns a copy of this task with the given detail attached
    pub fn with_detail(&self, detail: Option<TaskDetail>) -> Self {
        Self {
            detail,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub content: String,
    pub format: ContentFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    pub level: DifficultyLevel,
    pub reason: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// An amount of time in a given unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeValue {
    pub amount: f64,
    pub unit: TimeUnit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatedTime {
    pub min_time: TimeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_time: Option<TimeValue>,
    #[serde(default)]
    pub factors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLink {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// A checklist entry under a task; unknown authored fields are preserved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Long-form detail for a single task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub explanation: Explanation,
    pub difficulty: Difficulty,
    pub est_time: EstimatedTime,
    #[serde(default)]
    pub resource_links: Vec<ResourceLink>,
    #[serde(default)]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default)]
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// A phase with its tasks attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(flatten)]
    pub header: PhaseHeader,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Phase {
    pub fn phase_id(&self) -> &PhaseId {
        &self.header.phase_id
    }

    /// Looks up a task by ID
    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }
}

/// The fully merged roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapDocument {
    #[serde(flatten)]
    pub header: RoadmapHeader,
    #[serde(default)]
    pub phases: Vec<Phase>,
}

impl RoadmapDocument {
    /// Looks up a phase by ID
    pub fn phase(&self, phase_id: &PhaseId) -> Option<&Phase> {
        self.phases.iter().find(|p| p.phase_id() == phase_id)
    }

    /// Total number of tasks across all phases
    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.tasks.len()).sum()
    }

    /// Number of tasks carrying a detail
    pub fn detail_count(&self) -> usize {
        self.phases
            .iter()
            .flat_map(|p| &p.tasks)
            .filter(|t| t.detail.is_some())
            .count()
    }
}
