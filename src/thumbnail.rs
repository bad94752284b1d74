//! Thumbnail Pipeline: queued square thumbnails on one background worker.
//!
//! Callers [`enqueue`](ThumbnailPipeline::enqueue) source identities; a single
//! long-lived worker drains them in FIFO order, center-crops each to a square
//! and downscales it, stores it in the cache and emits a [`ThumbnailEvent`].
//!
//! Cache, pending set and eviction order live behind one mutex, so the
//! "already cached or already queued?" check in `enqueue` and the worker's
//! "done, now cached" transition cannot interleave: an identity is processed
//! at most once while it stays cached.
//!
//! Failures (unreadable or corrupt sources) are logged and skipped; the queue
//! keeps draining.

use crate::imaging::operations::square_thumbnail;
use crate::imaging::{ImageBackend, SourceId};
use image::DynamicImage;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Thumbnail edge length and cache policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// Maximum edge of the square thumbnail, in pixels.
    pub size: u32,
    /// Maximum cached thumbnails; `None` keeps every one for the process
    /// lifetime. Oldest entries are evicted first.
    pub capacity: Option<usize>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            size: 120,
            capacity: None,
        }
    }
}

/// A finished thumbnail.
#[derive(Debug, Clone)]
pub struct ThumbnailEvent {
    pub id: SourceId,
    pub thumbnail: Arc<DynamicImage>,
}

#[derive(Default)]
struct ThumbnailState {
    cache: HashMap<SourceId, Arc<DynamicImage>>,
    /// Cached identities in insertion order, for eviction.
    order: VecDeque<SourceId>,
    /// Queued or in progress.
    pending: HashSet<SourceId>,
}

impl ThumbnailState {
    fn insert(&mut self, id: SourceId, thumbnail: Arc<DynamicImage>, capacity: Option<usize>) {
        if let Some(capacity) = capacity {
            while self.cache.len() >= capacity {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.cache.remove(&oldest);
                tracing::debug!(source = %oldest, "thumbnail evicted");
            }
        }
        self.order.push_back(id.clone());
        self.cache.insert(id, thumbnail);
    }
}

fn lock(state: &Mutex<ThumbnailState>) -> std::sync::MutexGuard<'_, ThumbnailState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ThumbnailPipeline {
    state: Arc<Mutex<ThumbnailState>>,
    jobs: Option<Sender<SourceId>>,
    events: Mutex<Receiver<ThumbnailEvent>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ThumbnailPipeline {
    /// Start the worker thread.
    pub fn new<B>(backend: Arc<B>, config: ThumbnailConfig) -> std::io::Result<Self>
    where
        B: ImageBackend + Send + 'static,
    {
        let state = Arc::new(Mutex::new(ThumbnailState::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let (job_tx, job_rx) = mpsc::channel::<SourceId>();
        let (event_tx, event_rx) = mpsc::channel();

        let worker = {
            let state = Arc::clone(&state);
            let stop = Arc::clone(&stop);
            std::thread::Builder::new()
                .name("thumbnails".to_string())
                .spawn(move || run_worker(&*backend, config, &state, &stop, job_rx, event_tx))?
        };

        Ok(Self {
            state,
            jobs: Some(job_tx),
            events: Mutex::new(event_rx),
            stop,
            worker: Some(worker),
        })
    }

    /// Queue `id` for a thumbnail.
    ///
    /// Returns `false` without queueing when `id` is already cached, already
    /// queued or in progress, or the pipeline has shut down.
    pub fn enqueue(&self, id: SourceId) -> bool {
        let Some(jobs) = &self.jobs else {
            return false;
        };
        let mut state = lock(&self.state);
        if state.cache.contains_key(&id) || state.pending.contains(&id) {
            return false;
        }
        state.pending.insert(id.clone());
        if jobs.send(id.clone()).is_err() {
            state.pending.remove(&id);
            return false;
        }
        true
    }

    /// Cached thumbnail for `id`, if computed and not evicted.
    pub fn get(&self, id: &SourceId) -> Option<Arc<DynamicImage>> {
        lock(&self.state).cache.get(id).cloned()
    }

    pub fn cached_count(&self) -> usize {
        lock(&self.state).cache.len()
    }

    /// Identities queued or in progress.
    pub fn pending_count(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Next finished thumbnail, if any, without blocking.
    pub fn try_recv(&self) -> Option<ThumbnailEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// Wait up to `timeout` for the next finished thumbnail.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ThumbnailEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv_timeout(timeout)
            .ok()
    }

    /// Stop the worker after its current item and wait for it. Queued items
    /// that have not started are dropped. Idempotent.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.jobs = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            tracing::error!("thumbnail worker panicked");
        }
    }
}

impl Drop for ThumbnailPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    backend: &impl ImageBackend,
    config: ThumbnailConfig,
    state: &Mutex<ThumbnailState>,
    stop: &AtomicBool,
    jobs: Receiver<SourceId>,
    events: Sender<ThumbnailEvent>,
) {
    for id in jobs {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let result = backend
            .open(&id)
            .map(|source| Arc::new(square_thumbnail(&source.image, config.size)));

        let mut guard = lock(state);
        guard.pending.remove(&id);
        match result {
            Ok(thumbnail) => {
                guard.insert(id.clone(), Arc::clone(&thumbnail), config.capacity);
                drop(guard);
                tracing::debug!(source = %id, "thumbnail ready");
                if events.send(ThumbnailEvent { id, thumbnail }).is_err() {
                    break;
                }
            }
            Err(e) => {
                drop(guard);
                tracing::warn!(source = %id, error = %e, "thumbnail skipped");
            }
        }
    }
}
