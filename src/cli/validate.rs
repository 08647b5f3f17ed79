//! Validation commands: `validate` and `check`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;

use super::output::Output;
use crate::schema::{self, infer_kind, Labeled, SchemaKind, ValidationReport};

/// Reads one JSON file
pub(super) fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

/// A JSON file and the label its issues are reported under
pub(super) struct LoadedFile {
    pub label: String,
    pub value: Value,
}

impl LoadedFile {
    fn read(path: &Path) -> Result<Self> {
        Ok(Self {
            label: path.display().to_string(),
            value: read_json(path)?,
        })
    }

    fn labeled(&self) -> Labeled<'_> {
        Labeled {
            label: &self.label,
            value: &self.value,
        }
    }
}

/// A skeleton plus the task and detail fragments submitted with it
pub(super) struct FragmentFiles {
    pub skeleton: LoadedFile,
    pub tasks: Vec<LoadedFile>,
    pub details: Vec<LoadedFile>,
}

impl FragmentFiles {
    pub fn read(skeleton: &Path, tasks: &[PathBuf], details: &[PathBuf]) -> Result<Self> {
        Ok(Self {
            skeleton: LoadedFile::read(skeleton)?,
            tasks: tasks.iter().map(|p| LoadedFile::read(p)).collect::<Result<_>>()?,
            details: details.iter().map(|p| LoadedFile::read(p)).collect::<Result<_>>()?,
        })
    }

    /// Structural validation of every file, then reference validation of every pair
    ///
    /// References are only checked once every file is structurally valid.
    pub fn validate(&self, output: &Output) -> ValidationReport {
        let mut report = ValidationReport::new();

        let files = std::iter::once((&self.skeleton, SchemaKind::Skeleton))
            .chain(self.tasks.iter().map(|f| (f, SchemaKind::PhaseTasks)))
            .chain(self.details.iter().map(|f| (f, SchemaKind::TaskDetails)));

        for (file, kind) in files {
            let structural = schema::validate(&file.value, kind);
            output.verbose_ctx(
                "check",
                &format!("{} ({}): {} issue(s)", file.label, kind, structural.issues().len()),
            );
            report.absorb(&file.label, structural);
        }

        if !report.is_valid() {
            output.verbose_ctx("check", "Skipping reference checks: structural errors found");
            return report;
        }

        let tasks: Vec<Labeled<'_>> = self.tasks.iter().map(LoadedFile::labeled).collect();
        let details: Vec<Labeled<'_>> = self.details.iter().map(LoadedFile::labeled).collect();
        let references = schema::validate_fragment_set(&self.skeleton.value, &tasks, &details);
        output.verbose_ctx(
            "check",
            &format!("Reference checks: {} issue(s)", references.issues().len()),
        );

        for issue in references.issues() {
            report.push(issue.clone());
        }
        report
    }
}

pub fn validate(output: &Output, file: &Path, kind: Option<SchemaKind>) -> Result<()> {
    let document = read_json(file)?;
    let kind = kind.unwrap_or_else(|| infer_kind(&document));
    output.verbose_ctx("validate", &format!("Validating {} as {}", file.display(), kind));

    let report = schema::validate(&document, kind);
    output.report(&file.display().to_string(), &report);

    if !report.is_valid() {
        bail!(
            "{} failed validation with {} error(s)",
            file.display(),
            report.error_count()
        );
    }
    Ok(())
}

pub fn check(output: &Output, skeleton: &Path, tasks: &[PathBuf], details: &[PathBuf]) -> Result<()> {
    let files = FragmentFiles::read(skeleton, tasks, details)?;
    let report = files.validate(output);
    output.report("Fragment set", &report);

    if !report.is_valid() {
        bail!("Fragment set failed validation with {} error(s)", report.error_count());
    }
    Ok(())
}
