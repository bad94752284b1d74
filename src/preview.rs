//! Preview Pipeline: asynchronous, cancellable stitched previews.
//!
//! Every [`request_preview`](PreviewPipeline::request_preview) gets a fresh
//! [`Generation`] and its own worker thread. Workers send generation-stamped
//! envelopes over one channel; the caller drains them with
//! [`poll`](PreviewPipeline::poll) or
//! [`recv_timeout`](PreviewPipeline::recv_timeout), and that single
//! consumption point turns every envelope whose generation is no longer the
//! latest into [`PreviewEvent::Discarded`]. A superseded worker may still run
//! to completion; its raster never reaches the caller.
//!
//! ```text
//! request A (gen 1) ──► worker 1 ── decode ── decode ── compose ──► envelope(1) ─┐
//! request B (gen 2) ──► worker 2 ── decode ── compose ──► envelope(2) ──────────┐ │
//!      │ cancels gen 1's flag                                                  ▼ ▼
//!      └──────────────────────────────────────────────── poll(): 1 → Discarded
//!                                                                2 → Ready
//! ```
//!
//! Workers check their cancellation flag before each decode and before
//! composing, so superseded work usually stops early.

use crate::imaging::operations::{compose_vertical, fit_to_box};
use crate::imaging::{ImageBackend, SourceId, StitchMode};
use image::DynamicImage;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonically increasing preview request id. The first request is 1.
pub type Generation = u64;

/// What the caller observes for one generation.
#[derive(Debug)]
pub enum PreviewEvent {
    /// Result of the latest request. `image` is `None` when no source
    /// could be decoded.
    Ready {
        generation: Generation,
        image: Option<DynamicImage>,
    },
    /// A superseded or cancelled request finished; nothing to show.
    Discarded { generation: Generation },
}

impl PreviewEvent {
    pub fn generation(&self) -> Generation {
        match self {
            PreviewEvent::Ready { generation, .. } | PreviewEvent::Discarded { generation } => {
                *generation
            }
        }
    }
}

enum Outcome {
    Rendered(Option<DynamicImage>),
    Cancelled,
}

struct Envelope {
    generation: Generation,
    outcome: Outcome,
}

/// Preview Pipeline over a shared backend.
pub struct PreviewPipeline<B> {
    backend: Arc<B>,
    latest: AtomicU64,
    /// Cancellation flag of the most recent worker.
    current: Mutex<Option<Arc<AtomicBool>>>,
    tx: Sender<Envelope>,
    rx: Mutex<Receiver<Envelope>>,
}

impl<B> PreviewPipeline<B>
where
    B: ImageBackend + Send + 'static,
{
    pub fn new(backend: Arc<B>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            latest: AtomicU64::new(0),
            current: Mutex::new(None),
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Generation of the most recent request (0 before any request).
    pub fn latest_generation(&self) -> Generation {
        self.latest.load(Ordering::SeqCst)
    }

    /// Start a preview of `sources` stacked under `mode`, each first
    /// downscaled to fit `max_width × max_width`. Supersedes every earlier
    /// request. Never blocks on decoding.
    pub fn request_preview(
        &self,
        sources: Vec<SourceId>,
        mode: StitchMode,
        max_width: u32,
    ) -> Generation {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = Arc::new(AtomicBool::new(false));
        self.replace_current(Some(Arc::clone(&cancel)));

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let max_width = max_width.max(1);
        let spawned = std::thread::Builder::new()
            .name(format!("preview-{generation}"))
            .spawn(move || {
                let outcome = render(&*backend, &sources, mode, max_width, &cancel, generation);
                // The pipeline may already be gone; nobody is left to tell.
                let _ = tx.send(Envelope {
                    generation,
                    outcome,
                });
            });

        if let Err(e) = spawned {
            tracing::error!(generation, error = %e, "failed to start preview worker");
            let _ = self.tx.send(Envelope {
                generation,
                outcome: Outcome::Rendered(None),
            });
        }
        tracing::debug!(generation, "preview requested");
        generation
    }

    /// Supersede every in-flight request without starting a new one.
    ///
    /// The cancellation takes a generation of its own and is reported as
    /// [`PreviewEvent::Discarded`] for it, so waiters on the latest
    /// generation return instead of running into their timeout.
    pub fn cancel(&self) -> Generation {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.replace_current(None);
        let _ = self.tx.send(Envelope {
            generation,
            outcome: Outcome::Cancelled,
        });
        tracing::debug!(generation, "preview cancelled");
        generation
    }

    /// Next finished generation, if any, without blocking.
    pub fn poll(&self) -> Option<PreviewEvent> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.try_recv() {
            Ok(envelope) => Some(self.deliver(envelope)),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next finished generation.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PreviewEvent> {
        let rx = self.rx.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.recv_timeout(timeout) {
            Ok(envelope) => Some(self.deliver(envelope)),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Block until the latest generation is ready, skipping discarded ones.
    ///
    /// Returns `None` on timeout, or when the latest request was cancelled.
    pub fn wait_latest(&self, timeout: Duration) -> Option<Option<DynamicImage>> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            match self.recv_timeout(remaining)? {
                PreviewEvent::Ready { image, .. } => return Some(image),
                PreviewEvent::Discarded { generation } if generation >= self.latest_generation() => {
                    return None;
                }
                PreviewEvent::Discarded { .. } => {}
            }
        }
    }

    fn deliver(&self, envelope: Envelope) -> PreviewEvent {
        let generation = envelope.generation;
        match envelope.outcome {
            Outcome::Rendered(image) if generation == self.latest_generation() => {
                PreviewEvent::Ready { generation, image }
            }
            _ => {
                tracing::debug!(generation, "stale preview discarded");
                PreviewEvent::Discarded { generation }
            }
        }
    }

    fn replace_current(&self, next: Option<Arc<AtomicBool>>) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = std::mem::replace(&mut *current, next) {
            previous.store(true, Ordering::SeqCst);
        }
    }
}

impl<B> Drop for PreviewPipeline<B> {
    fn drop(&mut self) {
        let current = self.current.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(flag) = current.take() {
            flag.store(true, Ordering::SeqCst);
        }
    }
}

fn render(
    backend: &impl ImageBackend,
    sources: &[SourceId],
    mode: StitchMode,
    max_width: u32,
    cancel: &AtomicBool,
    generation: Generation,
) -> Outcome {
    let mut images = Vec::with_capacity(sources.len());
    for source in sources {
        if cancel.load(Ordering::SeqCst) {
            return Outcome::Cancelled;
        }
        match backend.open(source) {
            Ok(decoded) => images.push(fit_to_box(decoded.image, max_width)),
            Err(e) => {
                tracing::warn!(generation, source = %source, error = %e, "preview skipped source");
            }
        }
    }
    if cancel.load(Ordering::SeqCst) {
        return Outcome::Cancelled;
    }
    if images.is_empty() && !sources.is_empty() {
        tracing::warn!(generation, "no preview source could be decoded");
    }
    Outcome::Rendered(compose_vertical(images, mode))
}
