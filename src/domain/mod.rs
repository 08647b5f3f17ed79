//! Domain models for roadmaps
//!
//! Contains the core merge and partition logic without any I/O concerns.

mod id;
mod roadmap;
mod fragment;
mod graph;
mod merge;
mod partition;

pub use id::{check_identifier, IdError, PhaseId, RoadmapId, TaskId};
pub use roadmap::{
    CodeBlock, ContentFormat, Dependency, DependencyType, Difficulty, DifficultyLevel,
    EstimatedTime, Explanation, Phase, PhaseHeader, ProjectLevel, ResourceLink, ResourceType,
    RoadmapDocument, RoadmapHeader, Subtask, Task, TaskDetail, TaskPriority, TimeUnit, TimeValue,
};
pub use fragment::{
    declared_schema_type, Fragment, FragmentError, PhaseTasksFragment, SchemaMetadata,
    SchemaType, SkeletonFragment, TaskDetailsFragment,
};
pub(crate) use roadmap::wire_enum;
pub use graph::PhaseGraph;
pub use merge::{
    build_complete_roadmap, build_complete_roadmap_with_stats, merge, merge_with_stats,
    MergeOutcome, MergeStats,
};
pub use partition::{
    index_fragments, reconstruct, reconstruct_checked, split, Outline, OutlinePhase,
    OversizedPiece, Partition, PartitionConsistencyError, PartitionError, PhaseFragment,
    PhaseTaskState, ReconstructPolicy, Reconstruction, DEFAULT_MAX_FRAGMENT_BYTES,
};
