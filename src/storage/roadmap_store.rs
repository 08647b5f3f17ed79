//! Roadmap persistence on top of a [`FragmentStore`]
//!
//! Saving splits the canonical document, checks every body against the size
//! limit, and writes the phase bodies before the outline. The outline body is
//! a manifest: the outline itself plus save time, counts, and a blake3 digest
//! of every phase body, so a phase rewritten behind the store's back is
//! detected on load.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::store::{FragmentKey, FragmentStore, Slot};
use crate::domain::{
    index_fragments, reconstruct_checked, split, Outline, PartitionConsistencyError,
    PartitionError, PhaseFragment, PhaseId, ReconstructPolicy, Reconstruction, RoadmapDocument,
    RoadmapId, DEFAULT_MAX_FRAGMENT_BYTES,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Roadmap '{0}' not found")]
    NotFound(RoadmapId),

    #[error("{key} is {size} bytes, over the {limit} byte limit")]
    FragmentTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },
}

/// The stored outline body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(flatten)]
    pub outline: Outline,
    pub saved_at: DateTime<Utc>,
    pub phase_count: usize,
    pub task_count: usize,
    /// blake3 hex digest of each phase body, keyed by phase ID
    #[serde(default)]
    pub digests: BTreeMap<PhaseId, String>,
}

impl Manifest {
    fn counts_match(&self) -> bool {
        self.phase_count == self.outline.phase_count()
            && self.task_count == self.outline.task_count()
    }
}

fn digest(body: &str) -> String {
    blake3::hash(body.as_bytes()).to_hex().to_string()
}

/// Result of [`RoadmapStore::save`]
#[derive(Debug, Clone, Serialize)]
pub struct SaveSummary {
    pub roadmap_id: RoadmapId,
    pub phase_count: usize,
    pub task_count: usize,
    /// Phase bodies written
    pub fragment_count: usize,
    /// Phase bodies left over from an earlier save and removed
    pub removed: Vec<PhaseId>,
}

/// One line of [`RoadmapStore::list`]
#[derive(Debug, Clone, Serialize)]
pub struct StoredRoadmap {
    pub roadmap_id: RoadmapId,
    pub title: String,
    pub phase_count: usize,
    pub task_count: usize,
    pub saved_at: DateTime<Utc>,
}

/// One line of [`RoadmapStore::recount`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recount {
    pub roadmap_id: RoadmapId,
    pub phase_count: usize,
    pub task_count: usize,
    /// True when the stored counts were wrong and have been rewritten
    pub changed: bool,
}

pub struct RoadmapStore<S> {
    backend: S,
    max_fragment_bytes: usize,
}

impl<S: FragmentStore> RoadmapStore<S> {
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            max_fragment_bytes: DEFAULT_MAX_FRAGMENT_BYTES,
        }
    }

    pub fn with_limit(mut self, max_fragment_bytes: usize) -> Self {
        self.max_fragment_bytes = max_fragment_bytes;
        self
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    fn check_size(&self, key: &FragmentKey, body: &str) -> Result<()> {
        if body.len() > self.max_fragment_bytes {
            return Err(StoreError::FragmentTooLarge {
                key: key.to_string(),
                size: body.len(),
                limit: self.max_fragment_bytes,
            }
            .into());
        }
        Ok(())
    }

    /// Splits and writes `document`, replacing any earlier save under `roadmap_id`
    ///
    /// Nothing is written when any body is over the size limit.
    pub fn save(&mut self, roadmap_id: &RoadmapId, document: &RoadmapDocument) -> Result<SaveSummary> {
        let partition = split(document);

        let mut bodies = Vec::with_capacity(partition.phase_fragments.len());
        let mut digests = BTreeMap::new();
        for fragment in &partition.phase_fragments {
            let key = FragmentKey::phase(roadmap_id, &fragment.phase_id);
            let body = serde_json::to_string(fragment)
                .with_context(|| format!("Failed to serialize {}", key))?;
            self.check_size(&key, &body)?;
            digests.insert(fragment.phase_id.clone(), digest(&body));
            bodies.push((key, body));
        }

        let manifest = Manifest {
            phase_count: partition.outline.phase_count(),
            task_count: partition.outline.task_count(),
            outline: partition.outline,
            saved_at: Utc::now(),
            digests,
        };
        let outline_key = FragmentKey::outline(roadmap_id);
        let outline_body =
            serde_json::to_string(&manifest).context("Failed to serialize outline")?;
        self.check_size(&outline_key, &outline_body)?;

        let previous: Vec<FragmentKey> = self
            .backend
            .list_fragments(roadmap_id)?
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        // Phases first so a reader never sees an outline whose fragments are missing
        for (key, body) in &bodies {
            self.backend.write_fragment(key, body)?;
        }
        self.backend.write_fragment(&outline_key, &outline_body)?;

        let written: HashSet<&FragmentKey> = bodies.iter().map(|(key, _)| key).collect();
        let mut removed = Vec::new();
        for key in previous {
            if written.contains(&key) {
                continue;
            }
            if self.backend.remove_fragment(&key)? {
                if let Slot::Phase(phase_id) = key.slot {
                    removed.push(phase_id);
                }
            }
        }

        Ok(SaveSummary {
            roadmap_id: roadmap_id.clone(),
            phase_count: manifest.phase_count,
            task_count: manifest.task_count,
            fragment_count: bodies.len(),
            removed,
        })
    }

    /// Reads the manifest of one roadmap
    pub fn manifest(&self, roadmap_id: &RoadmapId) -> Result<Manifest> {
        let key = FragmentKey::outline(roadmap_id);
        let body = self
            .backend
            .read_fragment(&key)?
            .ok_or_else(|| StoreError::NotFound(roadmap_id.clone()))?;

        serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", key))
    }

    /// Reads and reconstructs one roadmap
    ///
    /// Missing, orphaned, miscounted, and stale phase bodies are handled per
    /// `policy`, the same way [`reconstruct_checked`] handles them.
    pub fn load(&self, roadmap_id: &RoadmapId, policy: ReconstructPolicy) -> Result<Reconstruction> {
        let manifest = self.manifest(roadmap_id)?;

        // Bodies are trusted only under the key they were saved to
        let mut misfiled = Vec::new();
        let mut stale = Vec::new();
        let mut fragments = Vec::new();
        for (key, body) in self.backend.list_fragments(roadmap_id)? {
            let fragment: PhaseFragment =
                serde_json::from_str(&body).with_context(|| format!("Failed to parse {}", key))?;

            if let Slot::Phase(stored_as) = &key.slot {
                if *stored_as != fragment.phase_id {
                    misfiled.push(PartitionConsistencyError::MisfiledFragment {
                        stored_as: stored_as.clone(),
                        phase_id: fragment.phase_id,
                    });
                    continue;
                }
            }

            if let Some(expected) = manifest.digests.get(&fragment.phase_id) {
                if *expected != digest(&body) {
                    stale.push(PartitionConsistencyError::StaleFragment {
                        phase_id: fragment.phase_id.clone(),
                    });
                }
            }
            fragments.push(fragment);
        }

        let fragments = index_fragments(fragments);
        let mut reconstruction =
            reconstruct_checked(&manifest.outline, &fragments, ReconstructPolicy::Degrade)?;
        reconstruction.issues.extend(misfiled);
        reconstruction.issues.extend(stale);

        if policy == ReconstructPolicy::Fail && !reconstruction.is_complete() {
            return Err(PartitionError::Inconsistent(reconstruction.issues).into());
        }

        Ok(reconstruction)
    }

    /// Summaries of every stored roadmap, sorted by ID
    pub fn list(&self) -> Result<Vec<StoredRoadmap>> {
        self.backend
            .list_roadmaps()?
            .into_iter()
            .map(|roadmap_id| -> Result<StoredRoadmap> {
                let manifest = self.manifest(&roadmap_id)?;
                Ok(StoredRoadmap {
                    title: manifest.outline.header.title,
                    phase_count: manifest.phase_count,
                    task_count: manifest.task_count,
                    saved_at: manifest.saved_at,
                    roadmap_id,
                })
            })
            .collect()
    }

    /// Recomputes stored phase and task counts from each outline
    ///
    /// Only manifests whose counts disagree are rewritten, so running it twice
    /// changes nothing the second time.
    pub fn recount(&mut self) -> Result<Vec<Recount>> {
        let mut results = Vec::new();

        for roadmap_id in self.backend.list_roadmaps()? {
            let mut manifest = self.manifest(&roadmap_id)?;
            let changed = !manifest.counts_match();

            if changed {
                manifest.phase_count = manifest.outline.phase_count();
                manifest.task_count = manifest.outline.task_count();
                let body = serde_json::to_string(&manifest)
                    .with_context(|| format!("Failed to serialize outline of {}", roadmap_id))?;
                self.backend
                    .write_fragment(&FragmentKey::outline(&roadmap_id), &body)?;
            }

            results.push(Recount {
                roadmap_id,
                phase_count: manifest.phase_count,
                task_count: manifest.task_count,
                changed,
            });
        }

        Ok(results)
    }
}
