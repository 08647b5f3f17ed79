//! Keyed merge of fragments into a canonical roadmap
//!
//! The skeleton fixes phase order. Task fragments attach by
//! `target_phase_id`, detail fragments attach by
//! (`target_phase_id`, `target_task_id`). A phase or task with no matching
//! fragment gets an empty task list or no detail; that is a valid
//! "not yet authored" state, not an error.
//!
//! Merge assumes its inputs were validated first and never re-sorts.
//! Inputs are borrowed and every output record is built fresh.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::fragment::{PhaseTasksFragment, SkeletonFragment, TaskDetailsFragment};
use super::id::{PhaseId, TaskId};
use super::roadmap::{Phase, RoadmapDocument, Task, TaskDetail};

/// Counts and leftovers from a merge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub phase_count: usize,
    pub task_count: usize,
    pub detail_count: usize,

    /// Skeleton phases that received no task fragment
    pub phases_without_tasks: Vec<PhaseId>,

    /// Task fragments whose phase is not in the skeleton
    pub unused_task_fragments: Vec<PhaseId>,

    /// Task fragments replaced by a later fragment for the same phase
    pub superseded_task_fragments: Vec<PhaseId>,

    /// Detail fragments whose phase or task was not found
    pub unused_detail_fragments: Vec<(PhaseId, TaskId)>,

    /// Detail fragments replaced by a later fragment for the same task
    pub superseded_detail_fragments: Vec<(PhaseId, TaskId)>,

    /// Fragments that declared no target and could not be keyed
    pub untargeted_fragments: usize,
}

/// Result of a merge: the canonical document plus statistics
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub document: RoadmapDocument,
    pub stats: MergeStats,
}

/// Merges a skeleton with per-phase task fragments
pub fn merge(skeleton: &SkeletonFragment, task_fragments: &[PhaseTasksFragment]) -> RoadmapDocument {
    merge_with_stats(skeleton, task_fragments).document
}

/// Merges a skeleton with task fragments, reporting what was attached
pub fn merge_with_stats(
    skeleton: &SkeletonFragment,
    task_fragments: &[PhaseTasksFragment],
) -> MergeOutcome {
    build_complete_roadmap_with_stats(skeleton, task_fragments, &[])
}

/// Two-level merge: skeleton + task fragments + per-task detail fragments
pub fn build_complete_roadmap(
    skeleton: &SkeletonFragment,
    task_fragments: &[PhaseTasksFragment],
    detail_fragments: &[TaskDetailsFragment],
) -> RoadmapDocument {
    build_complete_roadmap_with_stats(skeleton, task_fragments, detail_fragments).document
}

/// Two-level merge, reporting what was attached
pub fn build_complete_roadmap_with_stats(
    skeleton: &SkeletonFragment,
    task_fragments: &[PhaseTasksFragment],
    detail_fragments: &[TaskDetailsFragment],
) -> MergeOutcome {
    let mut stats = MergeStats::default();
    let skeleton_ids: HashSet<&PhaseId> = skeleton.phases.iter().map(|p| &p.phase_id).collect();

    // phase_id -> tasks; a later fragment for the same phase replaces an earlier one
    let mut tasks_by_phase: HashMap<&PhaseId, &[Task]> = HashMap::new();
    for fragment in task_fragments {
        match fragment.target_phase_id() {
            Some(phase_id) if !skeleton_ids.contains(phase_id) => {
                stats.unused_task_fragments.push(phase_id.clone());
            }
            Some(phase_id) => {
                if tasks_by_phase.insert(phase_id, &fragment.tasks).is_some() {
                    stats.superseded_task_fragments.push(phase_id.clone());
                }
            }
            None => stats.untargeted_fragments += 1,
        }
    }

    // phase_id -> task_id -> (fragment index, detail)
    let mut details_by_phase: HashMap<&PhaseId, HashMap<&TaskId, (usize, &TaskDetail)>> =
        HashMap::new();
    let mut superseded_details: HashSet<usize> = HashSet::new();
    for (index, fragment) in detail_fragments.iter().enumerate() {
        match (fragment.target_phase_id(), fragment.target_task_id()) {
            (Some(phase_id), Some(task_id)) => {
                let previous = details_by_phase
                    .entry(phase_id)
                    .or_default()
                    .insert(task_id, (index, &fragment.task_detail));
                if let Some((earlier, _)) = previous {
                    superseded_details.insert(earlier);
                    stats
                        .superseded_detail_fragments
                        .push((phase_id.clone(), task_id.clone()));
                }
            }
            _ => stats.untargeted_fragments += 1,
        }
    }

    let mut attached_details: HashSet<(&PhaseId, &TaskId)> = HashSet::new();
    let mut phases = Vec::with_capacity(skeleton.phases.len());

    for header in &skeleton.phases {
        let phase_id = &header.phase_id;
        let source_tasks: &[Task] = match tasks_by_phase.get(phase_id) {
            Some(tasks) => *tasks,
            None => {
                stats.phases_without_tasks.push(phase_id.clone());
                &[]
            }
        };

        let phase_details = details_by_phase.get(phase_id);
        let tasks: Vec<Task> = source_tasks
            .iter()
            .map(|task| {
                match phase_details.and_then(|d| d.get(&task.task_id)) {
                    Some((_, detail)) => {
                        attached_details.insert((phase_id, &task.task_id));
                        task.with_detail(Some((*detail).clone()))
                    }
                    None => task.clone(),
                }
            })
            .collect();

        stats.task_count += tasks.len();
        stats.detail_count += tasks.iter().filter(|t| t.detail.is_some()).count();

        phases.push(Phase {
            header: header.clone(),
            tasks,
        });
    }
    stats.phase_count = phases.len();

    for (index, fragment) in detail_fragments.iter().enumerate() {
        if superseded_details.contains(&index) {
            continue;
        }
        if let (Some(phase_id), Some(task_id)) =
            (fragment.target_phase_id(), fragment.target_task_id())
        {
            if !attached_details.contains(&(phase_id, task_id)) {
                stats
                    .unused_detail_fragments
                    .push((phase_id.clone(), task_id.clone()));
            }
        }
    }

    MergeOutcome {
        document: RoadmapDocument {
            header: skeleton.header.clone(),
            phases,
        },
        stats,
    }
}
