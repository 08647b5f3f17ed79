//! Partitioning a canonical roadmap for size-limited storage
//!
//! A roadmap is stored as one outline (every field except task bodies, plus a
//! per-phase `task_count`) and one fragment per phase that has tasks. The
//! outline grows with the number of phases and each fragment with the tasks
//! of one phase, so every piece stays under the backend's document limit.
//!
//! Round-trip: `reconstruct(split(d))` equals `d` for any valid document.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::PhaseId;
use super::roadmap::{Phase, PhaseHeader, RoadmapDocument, RoadmapHeader, Task};

/// Default per-document size limit of the storage backend (1 MiB)
pub const DEFAULT_MAX_FRAGMENT_BYTES: usize = 1_048_576;

/// An outline entry: every phase field except `tasks`, plus the task count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlinePhase {
    #[serde(flatten)]
    pub header: PhaseHeader,
    pub task_count: usize,
}

/// The storage-oriented skeleton of a roadmap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    #[serde(flatten)]
    pub header: RoadmapHeader,
    #[serde(default)]
    pub phases: Vec<OutlinePhase>,
}

impl Outline {
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Total tasks recorded by the outline
    pub fn task_count(&self) -> usize {
        self.phases.iter().map(|p| p.task_count).sum()
    }
}

/// The full task array of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseFragment {
    pub phase_id: PhaseId,
    pub tasks: Vec<Task>,
}

/// Output of [`split`]
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub outline: Outline,
    pub phase_fragments: Vec<PhaseFragment>,
}

/// A partition piece whose serialized form exceeds the size limit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OversizedPiece {
    /// `outline` or the phase ID of a fragment
    pub key: String,
    pub size: usize,
    pub limit: usize,
}

impl Partition {
    /// Looks up fragments by phase ID
    pub fn fragments_by_key(&self) -> HashMap<PhaseId, PhaseFragment> {
        index_fragments(self.phase_fragments.iter().cloned())
    }

    /// Serializes every piece and reports the ones larger than `limit` bytes
    pub fn oversized(&self, limit: usize) -> Result<Vec<OversizedPiece>, serde_json::Error> {
        let mut pieces = Vec::new();

        let size = serde_json::to_vec(&self.outline)?.len();
        if size > limit {
            pieces.push(OversizedPiece {
                key: "outline".to_string(),
                size,
                limit,
            });
        }

        for fragment in &self.phase_fragments {
            let size = serde_json::to_vec(fragment)?.len();
            if size > limit {
                pieces.push(OversizedPiece {
                    key: fragment.phase_id.to_string(),
                    size,
                    limit,
                });
            }
        }

        Ok(pieces)
    }
}

/// What to do when the outline and the available fragments disagree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructPolicy {
    /// Best effort: substitute empty task lists and report the issues
    #[default]
    Degrade,
    /// Refuse to produce a document when any issue is found
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PartitionConsistencyError {
    #[error("Phase '{phase_id}' expects {expected} task(s) but its fragment is missing")]
    MissingFragment { phase_id: PhaseId, expected: usize },

    #[error("Phase '{phase_id}' expects {expected} task(s) but its fragment holds {actual}")]
    TaskCountMismatch {
        phase_id: PhaseId,
        expected: usize,
        actual: usize,
    },

    #[error("Fragment for phase '{phase_id}' is not referenced by the outline")]
    OrphanFragment { phase_id: PhaseId },

    #[error("Fragment for phase '{phase_id}' does not match the digest recorded at save time")]
    StaleFragment { phase_id: PhaseId },

    #[error("Fragment stored as phase '{stored_as}' holds phase '{phase_id}'")]
    MisfiledFragment { stored_as: PhaseId, phase_id: PhaseId },
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("Roadmap is inconsistent: {}", format_issues(.0))]
    Inconsistent(Vec<PartitionConsistencyError>),
}

fn format_issues(issues: &[PartitionConsistencyError]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Load state of one phase's tasks after reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "tasks", rename_all = "snake_case")]
pub enum PhaseTaskState {
    /// The fragment was found and attached
    Loaded(usize),
    /// The outline records zero tasks; no fragment is expected
    Empty,
    /// Tasks were expected but no fragment was available
    NotLoaded,
}

/// Output of [`reconstruct_checked`]
#[derive(Debug, Clone)]
pub struct Reconstruction {
    pub document: RoadmapDocument,
    /// Load state per phase, in outline order
    pub phase_states: Vec<(PhaseId, PhaseTaskState)>,
    pub issues: Vec<PartitionConsistencyError>,
}

impl Reconstruction {
    /// True when every expected fragment was found and matched
    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Splits a canonical document into an outline and per-phase task fragments
///
/// Phases without tasks get no fragment.
pub fn split(document: &RoadmapDocument) -> Partition {
    let outline = Outline {
        header: document.header.clone(),
        phases: document
            .phases
            .iter()
            .map(|phase| OutlinePhase {
                header: phase.header.clone(),
                task_count: phase.tasks.len(),
            })
            .collect(),
    };

    let phase_fragments = document
        .phases
        .iter()
        .filter(|phase| !phase.tasks.is_empty())
        .map(|phase| PhaseFragment {
            phase_id: phase.header.phase_id.clone(),
            tasks: phase.tasks.clone(),
        })
        .collect();

    Partition {
        outline,
        phase_fragments,
    }
}

/// Keys fragments by phase ID; a later fragment for the same phase wins
pub fn index_fragments(
    fragments: impl IntoIterator<Item = PhaseFragment>,
) -> HashMap<PhaseId, PhaseFragment> {
    fragments
        .into_iter()
        .map(|f| (f.phase_id.clone(), f))
        .collect()
}

/// Rebuilds a canonical document, substituting empty task lists for missing fragments
pub fn reconstruct(outline: &Outline, fragments: &HashMap<PhaseId, PhaseFragment>) -> RoadmapDocument {
    RoadmapDocument {
        header: outline.header.clone(),
        phases: outline
            .phases
            .iter()
            .map(|entry| Phase {
                header: entry.header.clone(),
                tasks: fragments
                    .get(&entry.header.phase_id)
                    .map(|f| f.tasks.clone())
                    .unwrap_or_default(),
            })
            .collect(),
    }
}

/// Rebuilds a canonical document and reports every outline/fragment disagreement
///
/// Under [`ReconstructPolicy::Fail`] any disagreement is an error. Under
/// [`ReconstructPolicy::Degrade`] the best-effort document is returned with
/// the issues attached.
pub fn reconstruct_checked(
    outline: &Outline,
    fragments: &HashMap<PhaseId, PhaseFragment>,
    policy: ReconstructPolicy,
) -> Result<Reconstruction, PartitionError> {
    let mut issues = Vec::new();
    let mut phase_states = Vec::with_capacity(outline.phases.len());

    for entry in &outline.phases {
        let phase_id = &entry.header.phase_id;
        let state = match fragments.get(phase_id) {
            Some(fragment) => {
                if fragment.tasks.len() != entry.task_count {
                    issues.push(PartitionConsistencyError::TaskCountMismatch {
                        phase_id: phase_id.clone(),
                        expected: entry.task_count,
                        actual: fragment.tasks.len(),
                    });
                }
                PhaseTaskState::Loaded(fragment.tasks.len())
            }
            None if entry.task_count == 0 => PhaseTaskState::Empty,
            None => {
                issues.push(PartitionConsistencyError::MissingFragment {
                    phase_id: phase_id.clone(),
                    expected: entry.task_count,
                });
                PhaseTaskState::NotLoaded
            }
        };
        phase_states.push((phase_id.clone(), state));
    }

    let known: HashSet<&PhaseId> = outline.phases.iter().map(|p| &p.header.phase_id).collect();
    let mut orphans: Vec<&PhaseId> = fragments.keys().filter(|id| !known.contains(id)).collect();
    orphans.sort();
    issues.extend(
        orphans
            .into_iter()
            .map(|id| PartitionConsistencyError::OrphanFragment { phase_id: id.clone() }),
    );

    if policy == ReconstructPolicy::Fail && !issues.is_empty() {
        return Err(PartitionError::Inconsistent(issues));
    }

    Ok(Reconstruction {
        document: reconstruct(outline, fragments),
        phase_states,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::TaskId;
    use crate::domain::roadmap::{ProjectLevel, TaskPriority};

    fn task(id: String) -> Task {
        Task {
            task_id: TaskId::new(id.clone()).unwrap(),
            task_title: format!("Task {}", id),
            task_summary: "summary".to_string(),
            task_priority: TaskPriority::Low,
            task_tags: vec![],
            task_dependencies: vec![],
            detail: None,
        }
    }

    fn document(tasks_per_phase: &[usize]) -> RoadmapDocument {
        RoadmapDocument {
            header: RoadmapHeader {
                title: "Roadmap".to_string(),
                description: "desc".to_string(),
                tags: vec![],
                project_level: ProjectLevel::Advanced,
            },
            phases: tasks_per_phase
                .iter()
                .enumerate()
                .map(|(i, &count)| Phase {
                    header: PhaseHeader {
                        phase_id: PhaseId::new(format!("P{}", i + 1)).unwrap(),
                        phase_title: format!("Phase {}", i + 1),
                        phase_summary: String::new(),
                        phase_details: vec!["detail".to_string()],
                        phase_dependencies: vec![],
                        key_milestones: vec![],
                        success_indicators: vec![],
                    },
                    tasks: (0..count).map(|t| task(format!("P{}-T{}", i + 1, t))).collect(),
                })
                .collect(),
        }
    }

    fn task_ids(phase: &Phase) -> HashSet<&str> {
        phase.tasks.iter().map(|t| t.task_id.as_str()).collect()
    }

    #[test]
    fn split_large_document_into_outline_and_fragments() {
        let doc = document(&[50, 50, 50]);
        let partition = split(&doc);

        assert_eq!(partition.outline.phase_count(), 3);
        assert_eq!(partition.phase_fragments.len(), 3);
        for fragment in &partition.phase_fragments {
            assert_eq!(fragment.tasks.len(), 50);
        }
        assert!(partition.outline.phases.iter().all(|p| p.task_count == 50));

        let rebuilt = reconstruct(&partition.outline, &partition.fragments_by_key());
        for (original, rebuilt) in doc.phases.iter().zip(&rebuilt.phases) {
            assert_eq!(task_ids(original), task_ids(rebuilt));
        }
        assert_eq!(rebuilt, doc);
    }

    #[test]
    fn empty_phase_gets_no_fragment() {
        let doc = document(&[2, 0, 1]);
        let partition = split(&doc);

        assert_eq!(partition.phase_fragments.len(), 2);
        assert_eq!(partition.outline.phases[1].task_count, 0);
        assert_eq!(reconstruct(&partition.outline, &partition.fragments_by_key()), doc);
    }

    #[test]
    fn outline_json_has_no_tasks() {
        let partition = split(&document(&[3]));
        let json = serde_json::to_value(&partition.outline).unwrap();

        assert!(json["phases"][0].get("tasks").is_none());
        assert_eq!(json["phases"][0]["task_count"], 3);
        assert_eq!(json["title"], "Roadmap");
    }

    #[test]
    fn missing_fragment_degrades_to_empty_tasks() {
        let doc = document(&[2, 2]);
        let partition = split(&doc);
        let mut fragments = partition.fragments_by_key();
        fragments.remove("P2");

        let rebuilt = reconstruct(&partition.outline, &fragments);
        assert_eq!(rebuilt.phases[0].tasks.len(), 2);
        assert!(rebuilt.phases[1].tasks.is_empty());

        let checked =
            reconstruct_checked(&partition.outline, &fragments, ReconstructPolicy::Degrade).unwrap();
        assert!(!checked.is_complete());
        assert_eq!(
            checked.issues,
            vec![PartitionConsistencyError::MissingFragment {
                phase_id: PhaseId::new("P2").unwrap(),
                expected: 2,
            }]
        );
        assert_eq!(checked.phase_states[1].1, PhaseTaskState::NotLoaded);
        assert_eq!(checked.document, rebuilt);
    }

    #[test]
    fn missing_fragment_fails_under_fail_policy() {
        let partition = split(&document(&[1, 1]));
        let mut fragments = partition.fragments_by_key();
        fragments.remove("P1");

        let err = reconstruct_checked(&partition.outline, &fragments, ReconstructPolicy::Fail)
            .unwrap_err();
        assert!(err.to_string().contains("Phase 'P1' expects 1 task(s)"));
    }

    #[test]
    fn empty_phase_is_distinguished_from_unloaded() {
        let partition = split(&document(&[0, 3]));
        let fragments = HashMap::new();

        let checked =
            reconstruct_checked(&partition.outline, &fragments, ReconstructPolicy::Degrade).unwrap();
        assert_eq!(checked.phase_states[0].1, PhaseTaskState::Empty);
        assert_eq!(checked.phase_states[1].1, PhaseTaskState::NotLoaded);
        assert_eq!(checked.issues.len(), 1);
    }

    #[test]
    fn reports_count_mismatch_and_orphans() {
        let partition = split(&document(&[2]));
        let mut fragments = partition.fragments_by_key();
        if let Some(fragment) = fragments.get_mut("P1") {
            fragment.tasks.pop();
        }
        fragments.insert(
            PhaseId::new("P7").unwrap(),
            PhaseFragment {
                phase_id: PhaseId::new("P7").unwrap(),
                tasks: vec![],
            },
        );

        let checked =
            reconstruct_checked(&partition.outline, &fragments, ReconstructPolicy::Degrade).unwrap();
        assert_eq!(checked.issues.len(), 2);
        assert!(matches!(
            checked.issues[0],
            PartitionConsistencyError::TaskCountMismatch { expected: 2, actual: 1, .. }
        ));
        assert!(matches!(
            checked.issues[1],
            PartitionConsistencyError::OrphanFragment { .. }
        ));
    }

    #[test]
    fn oversized_pieces_are_reported() {
        let partition = split(&document(&[40, 1]));

        assert!(partition.oversized(DEFAULT_MAX_FRAGMENT_BYTES).unwrap().is_empty());

        let pieces = partition.oversized(2_000).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].key, "P1");
        assert!(pieces[0].size > 2_000);
    }
}
