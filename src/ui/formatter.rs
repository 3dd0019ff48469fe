//! Console formatting of a run.
//!
//! The `format_*` functions build the text; the `display_*` functions print it.

use crate::boundary::BoundaryWarning;
use crate::error::ReleaseError;
use crate::pipeline::{StepOutcome, StepRecord};
use console::style;
use std::error::Error;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// The steps about to run, numbered.
pub fn format_plan(command: &str, steps: &[&str], dry_run: bool) -> String {
    let mut out = format!("{}", style(format!("Running '{}'", command)).bold());
    if dry_run {
        out.push_str(&format!(" {}", style("(dry run)").cyan()));
    }
    for (i, step) in steps.iter().enumerate() {
        out.push_str(&format!("\n  {}. {}", i + 1, step));
    }
    out
}

pub fn display_plan(command: &str, steps: &[&str], dry_run: bool) {
    println!("\n{}", format_plan(command, steps, dry_run));
}

/// One line per step record. `verbose` adds the duration.
pub fn format_step_record(record: &StepRecord, verbose: bool) -> String {
    let line = match &record.outcome {
        StepOutcome::Ran => format!("{} {}", style("✓").green(), record.name),
        StepOutcome::Skipped => format!("{} {} {}", style("-").dim(), record.name, style("(skipped)").dim()),
        StepOutcome::Previewed(description) => {
            format!("{} {}: would {}", style("→").yellow(), record.name, description)
        }
        StepOutcome::Failed(message) => {
            format!("{} {}: {}", style("✗").red(), style(&record.name).red().bold(), message)
        }
    };
    if verbose {
        format!("{} {}", line, style(format!("[{} ms]", record.duration_ms)).dim())
    } else {
        line
    }
}

pub fn display_step_records(records: &[StepRecord], verbose: bool) {
    for record in records {
        println!("  {}", format_step_record(record, verbose));
    }
}

/// Failing step and the chain of underlying errors.
pub fn format_failure(error: &ReleaseError) -> String {
    let mut out = match error {
        ReleaseError::Step { step, source } => format!("step '{}' failed: {}", step, source),
        other => other.to_string(),
    };
    let mut cause = match error {
        ReleaseError::Step { source, .. } => source.source(),
        other => other.source(),
    };
    while let Some(err) = cause {
        out.push_str(&format!("\n  caused by: {}", err));
        cause = err.source();
    }
    out
}

pub fn display_failure(error: &ReleaseError) {
    display_error(&format_failure(error));
}

/// Closing line: counts of ran, skipped and previewed steps.
pub fn format_summary(records: &[StepRecord]) -> String {
    let count = |pred: fn(&StepOutcome) -> bool| records.iter().filter(|r| pred(&r.outcome)).count();
    let ran = count(|o| matches!(o, StepOutcome::Ran));
    let skipped = count(|o| matches!(o, StepOutcome::Skipped));
    let previewed = count(|o| matches!(o, StepOutcome::Previewed(_)));

    if previewed > 0 {
        format!("Dry run: {} step(s) previewed, {} skipped, nothing changed", previewed, skipped)
    } else {
        format!("{} step(s) completed, {} skipped", ran, skipped)
    }
}

pub fn display_summary(records: &[StepRecord]) {
    println!();
    display_success(&format_summary(records));
}
