//! Batch orchestration for split and stitch jobs.
//!
//! A batch split runs one independent job per source on the rayon pool (sized
//! by [`effective_threads`](crate::config::effective_threads) in the binary).
//! Jobs share nothing but a completion counter; one job's failure never stops
//! its siblings. Progress is reported as [`BatchEvent`]s over an optional
//! channel, and the final [`BatchReport`] lists one [`TaskOutcome`] per
//! source in input order.
//!
//! ```text
//! Started { total: 3 }
//! ItemFinished { completed: 1, .. }   ← completion order, not input order
//! ItemFinished { completed: 2, .. }
//! ItemFinished { completed: 3, .. }
//! Finished { succeeded: 2, failed: 1 }
//! ```
//!
//! The `spawn_*` variants run the same work on a background thread so the
//! caller only observes events and joins for the report.

use crate::error::{ErrorKind, ProcessError};
use crate::imaging::{ImageBackend, SourceId};
use crate::split::{SplitOptions, split};
use crate::stitch::{StitchOptions, stitch};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;

/// What to do when the caller checked no items at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmptySelection {
    /// Treat an empty selection as "everything".
    #[default]
    #[serde(rename = "all")]
    ProcessAll,
    #[serde(rename = "none")]
    ProcessNone,
}

/// Items to process: the checked ones (in list order), or per `policy`
/// when nothing is checked.
pub fn select_items<T: Clone + PartialEq>(all: &[T], checked: &[T], policy: EmptySelection) -> Vec<T> {
    if checked.is_empty() {
        return match policy {
            EmptySelection::ProcessAll => all.to_vec(),
            EmptySelection::ProcessNone => Vec::new(),
        };
    }
    all.iter().filter(|item| checked.contains(item)).cloned().collect()
}

/// Result of one job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Succeeded { outputs: Vec<PathBuf> },
    Failed { kind: ErrorKind, message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Succeeded { .. })
    }
}

impl From<Result<Vec<PathBuf>, ProcessError>> for TaskOutcome {
    fn from(result: Result<Vec<PathBuf>, ProcessError>) -> Self {
        match result {
            Ok(outputs) => TaskOutcome::Succeeded { outputs },
            Err(e) => TaskOutcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// Outcome of one job, labelled with its position and subject.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemReport {
    /// Position in the batch input (0-based).
    pub index: usize,
    /// Source for split jobs, requested output for stitch jobs.
    pub item: String,
    #[serde(flatten)]
    pub outcome: TaskOutcome,
}

/// Progress notifications for a running batch.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
    },
    ItemFinished {
        /// Jobs finished so far, this one included.
        completed: usize,
        total: usize,
        report: ItemReport,
    },
    Finished {
        succeeded: usize,
        failed: usize,
    },
}

/// Every job's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

/// Where and how a batch split writes.
#[derive(Debug, Clone)]
pub struct SplitBatch {
    pub output_dir: PathBuf,
    /// Write each source's cells to `output_dir/<source stem>/`.
    pub subfolder_per_source: bool,
    pub options: SplitOptions,
}

fn emit(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is watching progress.
        let _ = tx.send(event);
    }
}

fn finish(report: &BatchReport, events: Option<&Sender<BatchEvent>>) {
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    emit(
        events,
        BatchEvent::Finished {
            succeeded: report.succeeded(),
            failed: report.failed(),
        },
    );
}

fn split_one(
    backend: &impl ImageBackend,
    source: &SourceId,
    batch: &SplitBatch,
) -> Result<Vec<PathBuf>, ProcessError> {
    let dir = if batch.subfolder_per_source {
        let dir = batch.output_dir.join(source.stem());
        std::fs::create_dir_all(&dir).map_err(|e| ProcessError::Io {
            path: dir.clone(),
            message: e.to_string(),
        })?;
        dir
    } else {
        batch.output_dir.clone()
    };
    split(backend, source, &dir, &batch.options)
}

/// Index of the first source owning each output stem.
///
/// Cells are named after the source stem, so `/a/x.png` and `/b/x.png` would
/// write the same `x_N` files; only the first of them may split.
fn stem_owners(sources: &[SourceId]) -> HashMap<String, usize> {
    let mut owners = HashMap::new();
    for (index, source) in sources.iter().enumerate() {
        owners.entry(source.stem()).or_insert(index);
    }
    owners
}

/// Split every source in parallel, blocking until all jobs finish.
///
/// A source whose stem was already taken by an earlier source fails with
/// [`ErrorKind::InvalidParameter`] instead of overwriting that source's cells.
pub fn run_split_batch(
    backend: &impl ImageBackend,
    sources: &[SourceId],
    batch: &SplitBatch,
    events: Option<&Sender<BatchEvent>>,
) -> BatchReport {
    let total = sources.len();
    emit(events, BatchEvent::Started { total });

    let owners = stem_owners(sources);
    let completed = AtomicUsize::new(0);
    let items: Vec<ItemReport> = sources
        .par_iter()
        .enumerate()
        .map(|(index, source)| {
            let result = match owners.get(&source.stem()) {
                Some(&owner) if owner != index => Err(ProcessError::invalid(format!(
                    "output name '{}' is already used by {}",
                    source.stem(),
                    sources[owner]
                ))),
                _ => split_one(backend, source, batch),
            };
            if let Err(e) = &result {
                tracing::error!(source = %source, error = %e, "split failed");
            }
            let report = ItemReport {
                index,
                item: source.to_string(),
                outcome: result.into(),
            };
            let completed = completed.fetch_add(1, Ordering::SeqCst) + 1;
            emit(
                events,
                BatchEvent::ItemFinished {
                    completed,
                    total,
                    report: report.clone(),
                },
            );
            report
        })
        .collect();

    let report = BatchReport { items };
    finish(&report, events);
    report
}

/// [`run_split_batch`] on a background thread.
pub fn spawn_split_batch<B>(
    backend: Arc<B>,
    sources: Vec<SourceId>,
    batch: SplitBatch,
    events: Sender<BatchEvent>,
) -> std::io::Result<JoinHandle<BatchReport>>
where
    B: ImageBackend + Send + 'static,
{
    std::thread::Builder::new()
        .name("split-batch".to_string())
        .spawn(move || run_split_batch(&*backend, &sources, &batch, Some(&events)))
}

/// A single stitch reported through the batch outcome model.
pub fn run_stitch_job(
    backend: &impl ImageBackend,
    sources: &[SourceId],
    output_path: &Path,
    options: &StitchOptions,
    events: Option<&Sender<BatchEvent>>,
) -> BatchReport {
    emit(events, BatchEvent::Started { total: 1 });

    let result = stitch(backend, sources, output_path, options).map(|path| vec![path]);
    if let Err(e) = &result {
        tracing::error!(output = %output_path.display(), error = %e, "stitch failed");
    }
    let item = ItemReport {
        index: 0,
        item: output_path.display().to_string(),
        outcome: result.into(),
    };
    emit(
        events,
        BatchEvent::ItemFinished {
            completed: 1,
            total: 1,
            report: item.clone(),
        },
    );

    let report = BatchReport { items: vec![item] };
    finish(&report, events);
    report
}

/// [`run_stitch_job`] on a background thread.
pub fn spawn_stitch_job<B>(
    backend: Arc<B>,
    sources: Vec<SourceId>,
    output_path: PathBuf,
    options: StitchOptions,
    events: Sender<BatchEvent>,
) -> std::io::Result<JoinHandle<BatchReport>>
where
    B: ImageBackend + Send + 'static,
{
    std::thread::Builder::new()
        .name("stitch-job".to_string())
        .spawn(move || run_stitch_job(&*backend, &sources, &output_path, &options, Some(&events)))
}
