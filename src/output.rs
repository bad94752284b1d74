//! CLI output formatting for split, stitch, preview and thumbnail runs.
//!
//! # Information-First Display
//!
//! Every job leads with its positional index and subject (the source for a
//! split, the requested output for a stitch). Produced files and failures are
//! shown as indented context lines beneath it, so the output reads as an
//! inventory of what happened to each image.
//!
//! # Output Format
//!
//! ## Split
//!
//! ```text
//! Splitting 2 images
//! [1/2] 002 photos/b.png
//!     → out/b_1.png
//!     → out/b_2.png
//! [2/2] 001 photos/a.jpg
//!     Failed (decode_failure): Failed to decode photos/a.jpg: ...
//!
//! Done: 1 succeeded, 1 failed
//! ```
//!
//! ## Stitch
//!
//! ```text
//! Stitching 1 output
//! [1/1] 001 out/stitched_a.jpg
//!     → out/stitched_a.jpg
//!
//! Done: 1 succeeded, 0 failed
//! ```
//!
//! ## Thumbnails
//!
//! ```text
//! a.png 120x90 → thumbs/a.png
//! ```
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport, TaskOutcome};
use crate::error::ErrorKind;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn kind_label(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::InvalidParameter => "invalid_parameter",
        ErrorKind::DecodeFailure => "decode_failure",
        ErrorKind::IoFailure => "io_failure",
        ErrorKind::UnsupportedConversion => "unsupported_conversion",
    }
}

/// Context lines for one job outcome: produced files or the failure.
fn outcome_lines(outcome: &TaskOutcome) -> Vec<String> {
    match outcome {
        TaskOutcome::Succeeded { outputs } => outputs
            .iter()
            .map(|p| format!("{}\u{2192} {}", indent(1), p.display()))
            .collect(),
        TaskOutcome::Failed { kind, message } => {
            vec![format!(
                "{}Failed ({}): {}",
                indent(1),
                kind_label(*kind),
                message
            )]
        }
    }
}

// ============================================================================
// Batch progress
// ============================================================================

/// Which kind of job a batch runs; only changes the header wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Split,
    Stitch,
}

/// Format a single batch progress event as display lines.
pub fn format_batch_event(kind: JobKind, event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total } => {
            let (verb, noun) = match kind {
                JobKind::Split => ("Splitting", "image"),
                JobKind::Stitch => ("Stitching", "output"),
            };
            let plural = if *total == 1 { "" } else { "s" };
            vec![format!("{verb} {total} {noun}{plural}")]
        }
        BatchEvent::ItemFinished {
            completed,
            total,
            report,
        } => {
            let mut lines = vec![format!(
                "[{}/{}] {} {}",
                completed,
                total,
                format_index(report.index + 1),
                report.item
            )];
            lines.extend(outcome_lines(&report.outcome));
            lines
        }
        BatchEvent::Finished { succeeded, failed } => {
            vec![
                String::new(),
                format!("Done: {succeeded} succeeded, {failed} failed"),
            ]
        }
    }
}

/// Print a batch progress event to stdout.
pub fn print_batch_event(kind: JobKind, event: &BatchEvent) {
    for line in format_batch_event(kind, event) {
        println!("{}", line);
    }
}

/// Format the failures of a finished batch, in input order.
///
/// Empty when every job succeeded.
pub fn format_failure_summary(report: &BatchReport) -> Vec<String> {
    let failures: Vec<_> = report
        .items
        .iter()
        .filter(|item| !item.outcome.is_success())
        .collect();
    if failures.is_empty() {
        return Vec::new();
    }

    let mut lines = vec![format!("Failed ({})", failures.len())];
    for item in failures {
        lines.push(format!(
            "{}{} {}",
            indent(1),
            format_index(item.index + 1),
            item.item
        ));
        if let TaskOutcome::Failed { message, .. } = &item.outcome {
            lines.push(format!("{}{}", indent(2), message));
        }
    }
    lines
}

/// Print the failure summary to stderr.
pub fn print_failure_summary(report: &BatchReport) {
    for line in format_failure_summary(report) {
        eprintln!("{}", line);
    }
}

// ============================================================================
// Preview and thumbnails
// ============================================================================

/// Format the result of a preview render.
pub fn format_preview_output(dimensions: Option<(u32, u32)>, output: &Path) -> Vec<String> {
    match dimensions {
        Some((w, h)) => vec![format!("Preview {w}x{h} \u{2192} {}", output.display())],
        None => vec!["Preview: nothing to show (no readable images)".to_string()],
    }
}

pub fn print_preview_output(dimensions: Option<(u32, u32)>, output: &Path) {
    for line in format_preview_output(dimensions, output) {
        println!("{}", line);
    }
}

/// Format one written thumbnail.
pub fn format_thumbnail_line(name: &str, dimensions: (u32, u32), output: &Path) -> String {
    format!(
        "{} {}x{} \u{2192} {}",
        name,
        dimensions.0,
        dimensions.1,
        output.display()
    )
}

/// Format the thumbnail run: one line per written file, then the sources
/// that never produced one.
pub fn format_thumbnail_output(
    written: &[(String, (u32, u32), PathBuf)],
    skipped: &[String],
) -> Vec<String> {
    let mut lines: Vec<String> = written
        .iter()
        .map(|(name, dims, path)| format_thumbnail_line(name, *dims, path))
        .collect();
    if !skipped.is_empty() {
        lines.push(String::new());
        lines.push(format!("Skipped ({})", skipped.len()));
        for name in skipped {
            lines.push(format!("{}{}", indent(1), name));
        }
    }
    lines
}

pub fn print_thumbnail_output(written: &[(String, (u32, u32), PathBuf)], skipped: &[String]) {
    for line in format_thumbnail_output(written, skipped) {
        println!("{}", line);
    }
}
