//! Output formatting for CLI commands
//!
//! Results go to stdout, warnings and `--verbose` diagnostics to stderr.

use serde::Serialize;
use serde_json::json;

use crate::schema::{IssueCode, Severity, ValidationReport};
pub use crate::storage::OutputFormat;

pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// Prints a one-line result, wrapped as `{"success": true, "message": ..}` in JSON mode
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Text => println!("{}", message),
            OutputFormat::Json => println!("{}", json!({ "success": true, "message": message })),
        }
    }

    pub fn warning(&self, message: &str) {
        match self.format {
            OutputFormat::Text => eprintln!("Warning: {}", message),
            OutputFormat::Json => eprintln!("{}", json!({ "warning": message })),
        }
    }

    /// Prints a serializable value: pretty in text mode, compact in JSON mode
    pub fn data<T: Serialize>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        match rendered {
            Ok(text) => println!("{}", text),
            Err(e) => self.warning(&format!("Could not serialize output: {}", e)),
        }
    }

    /// Prints a validation report
    ///
    /// Text mode lists every issue, a hint the first time each code shows
    /// up, and a closing verdict line. JSON mode prints the report itself.
    pub fn report(&self, subject: &str, report: &ValidationReport) {
        if self.is_json() {
            self.data(report);
        } else {
            for line in render_report(subject, report) {
                println!("{}", line);
            }
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn verbose(&self, message: &str) {
        self.verbose_ctx("roadmap", message);
    }

    /// Prints `[verbose:<context>] message` to stderr when `--verbose` is set
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

fn render_report(subject: &str, report: &ValidationReport) -> Vec<String> {
    let mut lines = Vec::new();
    let mut hinted: Vec<IssueCode> = Vec::new();

    for issue in report.issues() {
        let label = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        lines.push(format!("{}: {}", label, issue));
        if !hinted.contains(&issue.code) {
            lines.push(format!("  hint: {}", issue.code.hint()));
            hinted.push(issue.code);
        }
    }

    let warnings = report.warnings().count();
    let verdict = match (report.is_valid(), warnings) {
        (true, 0) => format!("{} is valid", subject),
        (true, n) => format!("{} is valid ({} warning(s))", subject, n),
        (false, n) => format!(
            "{} is invalid: {} error(s), {} warning(s)",
            subject,
            report.error_count(),
            n
        ),
    };
    lines.push(verdict);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate, SchemaKind};

    #[test]
    fn clean_report_is_one_verdict_line() {
        let lines = render_report("skeleton.json", &ValidationReport::default());
        assert_eq!(lines, vec!["skeleton.json is valid".to_string()]);
    }

    #[test]
    fn hint_printed_once_per_code() {
        let report = validate(&json!({ "phases": [] }), SchemaKind::Final);
        let lines = render_report("doc", &report);

        let hints = lines.iter().filter(|l| l.starts_with("  hint:")).count();
        let errors = lines.iter().filter(|l| l.starts_with("error:")).count();
        assert!(errors >= 2);
        assert_eq!(hints, 1);
        assert!(lines
            .last()
            .is_some_and(|l| l.starts_with("doc is invalid:")));
    }
}
