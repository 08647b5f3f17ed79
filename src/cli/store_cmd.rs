//! Store CLI commands

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;

use super::merge_cmd::{emit_json, read_document};
use super::output::Output;
use crate::domain::{PhaseTaskState, ReconstructPolicy, RoadmapId};
use crate::storage::Project;

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Split a roadmap and save it into the project store
    Save {
        /// Canonical roadmap document (JSON)
        document: PathBuf,

        /// Roadmap ID (generated from the title when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Reassemble a stored roadmap
    Load {
        /// Roadmap ID
        id: String,

        /// Fail on any missing or mismatched fragment
        #[arg(long)]
        strict: bool,

        /// Write the document here instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List stored roadmaps
    List,

    /// Recompute stored phase and task counts
    Recount,
}

pub fn run(cmd: StoreCommands, output: &Output) -> Result<()> {
    match cmd {
        StoreCommands::Save { document, id } => save(output, &document, id.as_deref()),
        StoreCommands::Load {
            id,
            strict,
            output: destination,
        } => load(output, &id, strict, destination.as_deref()),
        StoreCommands::List => list(output),
        StoreCommands::Recount => recount(output),
    }
}

fn save(output: &Output, document: &Path, id: Option<&str>) -> Result<()> {
    let project = Project::open_current()?;
    let roadmap = read_document(output, document)?;

    let roadmap_id = match id {
        Some(id) => id.parse::<RoadmapId>()?,
        None => RoadmapId::generate(&roadmap.header.title, Utc::now()),
    };
    output.verbose_ctx(
        "store",
        &format!("Saving {} into {}", roadmap_id, project.store_dir().display()),
    );

    let mut store = project.roadmap_store();
    let summary = store.save(&roadmap_id, &roadmap)?;

    for phase_id in &summary.removed {
        output.verbose_ctx("store", &format!("Removed stale fragment for phase '{}'", phase_id));
    }

    if output.is_json() {
        output.data(&summary);
    } else {
        output.success(&format!(
            "Saved roadmap {} ({} phase(s), {} task(s))",
            summary.roadmap_id, summary.phase_count, summary.task_count
        ));
    }

    Ok(())
}

fn load(output: &Output, id: &str, strict: bool, destination: Option<&Path>) -> Result<()> {
    let project = Project::open_current()?;
    let roadmap_id: RoadmapId = id.parse()?;

    let policy = if strict {
        ReconstructPolicy::Fail
    } else {
        project.config().project.reconstruct_policy
    };
    output.verbose_ctx("store", &format!("Loading {} with policy {:?}", roadmap_id, policy));

    let reconstruction = project.roadmap_store().load(&roadmap_id, policy)?;

    for issue in &reconstruction.issues {
        output.warning(&issue.to_string());
    }
    for (phase_id, state) in &reconstruction.phase_states {
        if *state == PhaseTaskState::NotLoaded {
            output.verbose_ctx("store", &format!("Phase '{}' tasks not loaded", phase_id));
        }
    }

    emit_json(output, &reconstruction.document, destination)?;

    if let Some(destination) = destination {
        if output.is_json() {
            output.data(&serde_json::json!({
                "roadmap_id": roadmap_id,
                "output": destination.display().to_string(),
                "complete": reconstruction.is_complete(),
                "phase_states": reconstruction.phase_states,
                "issues": reconstruction.issues,
            }));
        } else {
            output.success(&format!(
                "Loaded roadmap {} into {}",
                roadmap_id,
                destination.display()
            ));
        }
    }

    Ok(())
}

fn list(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let roadmaps = project.roadmap_store().list()?;

    if output.is_json() {
        output.data(&roadmaps);
    } else if roadmaps.is_empty() {
        println!("No stored roadmaps");
    } else {
        println!("{:<12} {:>6} {:>6}  {:<20} TITLE", "ID", "PHASES", "TASKS", "SAVED");
        for roadmap in &roadmaps {
            println!(
                "{:<12} {:>6} {:>6}  {:<20} {}",
                roadmap.roadmap_id.as_str(),
                roadmap.phase_count,
                roadmap.task_count,
                roadmap.saved_at.format("%Y-%m-%d %H:%M").to_string(),
                roadmap.title
            );
        }
    }

    Ok(())
}

fn recount(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let results = project.roadmap_store().recount()?;

    if output.is_json() {
        output.data(&results);
        return Ok(());
    }

    let changed = results.iter().filter(|r| r.changed).count();
    for result in results.iter().filter(|r| r.changed) {
        println!(
            "{}: {} phase(s), {} task(s)",
            result.roadmap_id, result.phase_count, result.task_count
        );
    }
    output.success(&format!(
        "Recounted {} roadmap(s), {} updated",
        results.len(),
        changed
    ));

    Ok(())
}
