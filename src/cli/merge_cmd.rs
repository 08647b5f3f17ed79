//! Merge and split commands

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use super::output::Output;
use super::validate::{read_json, FragmentFiles};
use crate::domain::{
    build_complete_roadmap_with_stats, split as split_document, Fragment, MergeStats,
    PhaseTasksFragment, RoadmapDocument, TaskDetailsFragment, DEFAULT_MAX_FRAGMENT_BYTES,
};
use crate::schema::{self, SchemaKind};
use crate::storage::{encode_component, Config, Project};

/// Writes `value` as pretty JSON to `path`, or prints it when no path is given
pub(super) fn emit_json<T: Serialize>(output: &Output, value: &T, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
            fs::write(path, json + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            output.data(value);
            Ok(())
        }
    }
}

fn warn_unused(output: &Output, stats: &MergeStats) {
    for phase_id in &stats.unused_task_fragments {
        output.warning(&format!(
            "Task fragment for phase '{}' matches no skeleton phase",
            phase_id
        ));
    }
    for phase_id in &stats.superseded_task_fragments {
        output.warning(&format!(
            "Task fragment for phase '{}' was replaced by a later fragment for the same phase",
            phase_id
        ));
    }
    for (phase_id, task_id) in &stats.unused_detail_fragments {
        output.warning(&format!(
            "Detail fragment for task '{}' in phase '{}' matches no task",
            task_id, phase_id
        ));
    }
    for (phase_id, task_id) in &stats.superseded_detail_fragments {
        output.warning(&format!(
            "Detail fragment for task '{}' in phase '{}' was replaced by a later fragment",
            task_id, phase_id
        ));
    }
}

pub fn merge(
    output: &Output,
    skeleton: &Path,
    tasks: &[PathBuf],
    details: &[PathBuf],
    destination: Option<&Path>,
) -> Result<()> {
    let files = FragmentFiles::read(skeleton, tasks, details)?;

    let report = files.validate(output);
    if !report.is_valid() {
        output.report("Fragment set", &report);
        bail!(
            "Refusing to merge: fragment set has {} error(s)",
            report.error_count()
        );
    }

    let skeleton = Fragment::from_value(files.skeleton.value)?.into_skeleton()?;
    let task_fragments: Vec<PhaseTasksFragment> = files
        .tasks
        .into_iter()
        .map(|f| -> Result<PhaseTasksFragment> {
            Ok(Fragment::from_value(f.value)?.into_phase_tasks()?)
        })
        .collect::<Result<_>>()?;
    let detail_fragments: Vec<TaskDetailsFragment> = files
        .details
        .into_iter()
        .map(|f| -> Result<TaskDetailsFragment> {
            Ok(Fragment::from_value(f.value)?.into_task_details()?)
        })
        .collect::<Result<_>>()?;

    let outcome = build_complete_roadmap_with_stats(&skeleton, &task_fragments, &detail_fragments);
    let stats = &outcome.stats;
    output.verbose_ctx(
        "merge",
        &format!(
            "{} phase(s), {} task(s), {} detail(s)",
            stats.phase_count, stats.task_count, stats.detail_count
        ),
    );
    for phase_id in &stats.phases_without_tasks {
        output.verbose_ctx("merge", &format!("Phase '{}' has no tasks", phase_id));
    }
    warn_unused(output, stats);

    emit_json(output, &outcome.document, destination)?;

    if let Some(destination) = destination {
        if output.is_json() {
            output.data(&serde_json::json!({
                "output": destination.display().to_string(),
                "stats": stats,
            }));
        } else {
            output.success(&format!(
                "Merged {} phase(s), {} task(s), {} detail(s) into {}",
                stats.phase_count,
                stats.task_count,
                stats.detail_count,
                destination.display()
            ));
        }
    }

    Ok(())
}

/// Reads a final document, refusing it when structural validation fails
pub(super) fn read_document(output: &Output, path: &Path) -> Result<RoadmapDocument> {
    let value = read_json(path)?;

    let report = schema::validate(&value, SchemaKind::Final);
    if !report.is_valid() {
        output.report(&path.display().to_string(), &report);
        bail!(
            "{} is not a valid roadmap: {} error(s)",
            path.display(),
            report.error_count()
        );
    }

    serde_json::from_value(value).with_context(|| format!("Failed to read roadmap {}", path.display()))
}

/// Size limit from the enclosing project's config, or the default outside a project
fn fragment_limit() -> Result<usize> {
    match Config::find_project_root() {
        Some(root) => Ok(Project::open(root)?.config().project.max_fragment_bytes),
        None => Ok(DEFAULT_MAX_FRAGMENT_BYTES),
    }
}

pub fn split(output: &Output, document: &Path, out_dir: &Path) -> Result<()> {
    let roadmap = read_document(output, document)?;
    let partition = split_document(&roadmap);

    let limit = fragment_limit()?;
    for piece in partition.oversized(limit).context("Failed to measure fragments")? {
        output.warning(&format!(
            "{} is {} bytes, over the {} byte limit",
            piece.key, piece.size, piece.limit
        ));
    }

    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;

    let mut written = Vec::with_capacity(partition.phase_fragments.len() + 1);

    let outline_path = out_dir.join("outline.json");
    emit_json(output, &partition.outline, Some(&outline_path))?;
    written.push(outline_path);

    for fragment in &partition.phase_fragments {
        let path = out_dir.join(format!("phase-{}.json", encode_component(fragment.phase_id.as_str())));
        output.verbose_ctx(
            "split",
            &format!("{} task(s) -> {}", fragment.tasks.len(), path.display()),
        );
        emit_json(output, fragment, Some(&path))?;
        written.push(path);
    }

    if output.is_json() {
        let files: Vec<String> = written.iter().map(|p| p.display().to_string()).collect();
        output.data(&serde_json::json!({
            "phase_count": partition.outline.phase_count(),
            "task_count": partition.outline.task_count(),
            "files": files,
        }));
    } else {
        output.success(&format!(
            "Split {} phase(s) into {} file(s) in {}",
            partition.outline.phase_count(),
            written.len(),
            out_dir.display()
        ));
    }

    Ok(())
}
