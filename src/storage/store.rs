//! Key/value persistence for partition pieces
//!
//! A roadmap is stored as one outline body plus one body per phase that has
//! tasks. Bodies are serialized JSON text; the store never parses them.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{PhaseId, RoadmapId};

/// Which piece of a roadmap a body holds
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Outline,
    Phase(PhaseId),
}

/// Addresses one stored body
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentKey {
    pub roadmap_id: RoadmapId,
    pub slot: Slot,
}

impl FragmentKey {
    pub fn outline(roadmap_id: &RoadmapId) -> Self {
        Self {
            roadmap_id: roadmap_id.clone(),
            slot: Slot::Outline,
        }
    }

    pub fn phase(roadmap_id: &RoadmapId, phase_id: &PhaseId) -> Self {
        Self {
            roadmap_id: roadmap_id.clone(),
            slot: Slot::Phase(phase_id.clone()),
        }
    }
}

impl fmt::Display for FragmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Outline => write!(f, "{}/outline", self.roadmap_id),
            Slot::Phase(phase_id) => write!(f, "{}/phases/{}", self.roadmap_id, phase_id),
        }
    }
}

/// Storage backend for roadmap pieces
pub trait FragmentStore {
    fn write_fragment(&mut self, key: &FragmentKey, body: &str) -> Result<()>;

    fn read_fragment(&self, key: &FragmentKey) -> Result<Option<String>>;

    /// Every phase body stored under `roadmap_id`, sorted by key
    fn list_fragments(&self, roadmap_id: &RoadmapId) -> Result<Vec<(FragmentKey, String)>>;

    /// Returns false when nothing was stored under `key`
    fn remove_fragment(&mut self, key: &FragmentKey) -> Result<bool>;

    /// Roadmaps with a stored outline, sorted
    fn list_roadmaps(&self) -> Result<Vec<RoadmapId>>;
}

/// In-process store, used for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryFragmentStore {
    bodies: BTreeMap<FragmentKey, String>,
}

impl MemoryFragmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl FragmentStore for MemoryFragmentStore {
    fn write_fragment(&mut self, key: &FragmentKey, body: &str) -> Result<()> {
        self.bodies.insert(key.clone(), body.to_string());
        Ok(())
    }

    fn read_fragment(&self, key: &FragmentKey) -> Result<Option<String>> {
        Ok(self.bodies.get(key).cloned())
    }

    fn list_fragments(&self, roadmap_id: &RoadmapId) -> Result<Vec<(FragmentKey, String)>> {
        Ok(self
            .bodies
            .iter()
            .filter(|(key, _)| &key.roadmap_id == roadmap_id && key.slot != Slot::Outline)
            .map(|(key, body)| (key.clone(), body.clone()))
            .collect())
    }

    fn remove_fragment(&mut self, key: &FragmentKey) -> Result<bool> {
        Ok(self.bodies.remove(key).is_some())
    }

    fn list_roadmaps(&self) -> Result<Vec<RoadmapId>> {
        Ok(self
            .bodies
            .keys()
            .filter(|key| key.slot == Slot::Outline)
            .map(|key| key.roadmap_id.clone())
            .collect())
    }
}

const OUTLINE_FILE: &str = "outline.json";
const PHASES_DIR: &str = "phases";

/// Makes an identifier safe to use as a file name
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte becomes `%XX`.
pub fn encode_component(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

fn decode_component(name: &str) -> Option<String> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = name.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// One JSON file per key under a root directory
///
/// ```text
/// <root>/
/// └── <roadmap_id>/
///     ├── outline.json
///     └── phases/
///         └── <phase_id>.json
/// ```
pub struct FileFragmentStore {
    root: PathBuf,
}

impl FileFragmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn roadmap_dir(&self, roadmap_id: &RoadmapId) -> PathBuf {
        self.root.join(encode_component(roadmap_id.as_str()))
    }

    /// Returns the file backing `key`
    pub fn path_for(&self, key: &FragmentKey) -> PathBuf {
        let dir = self.roadmap_dir(&key.roadmap_id);
        match &key.slot {
            Slot::Outline => dir.join(OUTLINE_FILE),
            Slot::Phase(phase_id) => dir
                .join(PHASES_DIR)
                .join(format!("{}.json", encode_component(phase_id.as_str()))),
        }
    }

    fn read_locked(path: &Path) -> Result<String> {
        let mut file = File::open(path)
            .with_context(|| format!("Failed to open fragment: {}", path.display()))?;

        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock: {}", path.display()))?;

        let mut body = String::new();
        file.read_to_string(&mut body)
            .with_context(|| format!("Failed to read fragment: {}", path.display()))?;

        // Lock is released when file is dropped
        Ok(body)
    }
}

impl FragmentStore for FileFragmentStore {
    fn write_fragment(&mut self, key: &FragmentKey, body: &str) -> Result<()> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let temp_path = path.with_extension("json.tmp");
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            file.lock_exclusive()
                .with_context(|| format!("Failed to acquire write lock: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);
            writer
                .write_all(body.as_bytes())
                .with_context(|| format!("Failed to write fragment {}", key))?;
            writer.flush().context("Failed to flush fragment")?;
        }

        fs::rename(&temp_path, &path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }

    fn read_fragment(&self, key: &FragmentKey) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_locked(&path).map(Some)
    }

    fn list_fragments(&self, roadmap_id: &RoadmapId) -> Result<Vec<(FragmentKey, String)>> {
        let dir = self.roadmap_dir(roadmap_id).join(PHASES_DIR);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        let mut fragments = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            // Files whose names do not decode to an ID were not written by this store
            let Some(phase_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_component)
                .and_then(|s| PhaseId::new(s).ok())
            else {
                continue;
            };

            let body = Self::read_locked(&path)?;
            fragments.push((FragmentKey::phase(roadmap_id, &phase_id), body));
        }

        fragments.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(fragments)
    }

    fn remove_fragment(&mut self, key: &FragmentKey) -> Result<bool> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove fragment: {}", path.display()))?;
        Ok(true)
    }

    fn list_roadmaps(&self) -> Result<Vec<RoadmapId>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read store: {}", self.root.display()))?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.join(OUTLINE_FILE).is_file() {
                continue;
            }
            let id = path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(decode_component)
                .and_then(|s| RoadmapId::new(s).ok());
            if let Some(id) = id {
                ids.push(id);
            }
        }

        ids.sort();
        Ok(ids)
    }
}
