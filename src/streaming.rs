// Streaming bridge between the engine's chunk producer and the page
//
// The engine emits chunks asynchronously while the page-side callback is
// synchronous and must never observe two chunks at once. A bounded queue
// with a per-chunk send timeout sits between the two: a full queue delays
// the producer up to the timeout, after which the chunk is counted and
// discarded. Delivered chunks keep their arrival order.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;

use crate::models::{Persona, StreamChunk};

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_EMIT_TIMEOUT: Duration = Duration::from_secs(2);

// How long close() lets the drain flush already-queued chunks before
// cutting it off.
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// Synchronous per-chunk callback supplied by the page side.
pub type ChunkCallback = Arc<dyn Fn(&StreamChunk) + Send + Sync>;

type PhaseHistory = Arc<Mutex<HashMap<String, Vec<StreamChunk>>>>;

/// Producer-side handle the engine writes chunks into.
///
/// Cheap to clone; all clones feed the same bounded queue and share the
/// same drop counter.
#[derive(Clone)]
pub struct StreamingEmitter {
    tx: mpsc::Sender<StreamChunk>,
    emit_timeout: Duration,
    dropped: Arc<AtomicU64>,
}

impl StreamingEmitter {
    /// Enqueue one chunk for delivery.
    ///
    /// Never blocks the producer indefinitely: if the queue stays full for
    /// the configured timeout the chunk is discarded and the drop counter
    /// incremented. Dropped chunks vanish; delivered chunks are never
    /// reordered or duplicated.
    pub async fn emit(&self, chunk: StreamChunk) {
        match self.tx.send_timeout(chunk, self.emit_timeout).await {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(chunk)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    phase = %chunk.phase,
                    persona = %chunk.persona,
                    dropped = self.dropped.load(Ordering::Relaxed),
                    "stream queue full; chunk dropped"
                );
            }
            Err(SendTimeoutError::Closed(_)) => {
                // Consumer already closed; the run is over.
                tracing::debug!("stream consumer closed; chunk discarded");
            }
        }
    }

    /// Cumulative count of chunks discarded on timeout.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Bridges the engine's chunk stream to a synchronous UI callback.
///
/// `create_emitter` hands the engine a bounded producer handle and spawns
/// the drain task, which appends each chunk to a phase-keyed history and
/// invokes the callback one chunk at a time, in arrival order.
pub struct StreamingAdapter {
    on_chunk: ChunkCallback,
    queue_capacity: usize,
    emit_timeout: Duration,
    history: PhaseHistory,
    dropped: Arc<AtomicU64>,
    drain: Option<JoinHandle<()>>,
}

impl StreamingAdapter {
    pub fn new(on_chunk: impl Fn(&StreamChunk) + Send + Sync + 'static) -> Self {
        Self {
            on_chunk: Arc::new(on_chunk),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            emit_timeout: DEFAULT_EMIT_TIMEOUT,
            history: Arc::new(Mutex::new(HashMap::new())),
            dropped: Arc::new(AtomicU64::new(0)),
            drain: None,
        }
    }

    /// Override queue capacity and per-chunk timeout.
    pub fn with_queue(mut self, capacity: usize, emit_timeout: Duration) -> Self {
        self.queue_capacity = capacity;
        self.emit_timeout = emit_timeout;
        self
    }

    /// Create the producer handle and start the drain task.
    ///
    /// A callback that panics is isolated per chunk: the panic is caught
    /// and logged, and the drain moves on to the next chunk.
    pub fn create_emitter(&mut self) -> StreamingEmitter {
        // Re-creating the emitter replaces any previous drain task.
        if let Some(previous) = self.drain.take() {
            previous.abort();
        }

        let (tx, mut rx) = mpsc::channel::<StreamChunk>(self.queue_capacity);
        let history = Arc::clone(&self.history);
        let on_chunk = Arc::clone(&self.on_chunk);

        let drain = tokio::spawn(async move {
            while let Some(chunk) = rx.recv().await {
                let phase = chunk.phase.to_lowercase();
                history
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .entry(phase)
                    .or_default()
                    .push(chunk.clone());

                if catch_unwind(AssertUnwindSafe(|| on_chunk(&chunk))).is_err() {
                    tracing::warn!(
                        phase = %chunk.phase,
                        persona = %chunk.persona,
                        "stream callback panicked; chunk skipped"
                    );
                }
            }
        });
        self.drain = Some(drain);

        StreamingEmitter {
            tx,
            emit_timeout: self.emit_timeout,
            dropped: Arc::clone(&self.dropped),
        }
    }

    /// Point-in-time snapshot of the delivered chunks for one phase, in
    /// arrival order. Phase lookup is case-insensitive.
    pub fn chunks_by_phase(&self, phase: &str) -> Vec<StreamChunk> {
        self.history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&phase.to_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Delivered chunks for one persona within one phase, in arrival order.
    pub fn chunks_by_persona(&self, persona: Persona, phase: &str) -> Vec<StreamChunk> {
        self.chunks_by_phase(phase)
            .into_iter()
            .filter(|chunk| chunk.persona == persona.as_str())
            .collect()
    }

    /// Cumulative count of chunks discarded on timeout. Reads 0 before any
    /// emitter has been created.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop the drain task and release the queue.
    ///
    /// Chunks already queued are flushed first when every emitter has been
    /// dropped (the queue closes and the drain exits on its own); a
    /// producer still holding an emitter is cut off after a short grace.
    /// Safe to call when no chunks were ever produced. After this returns,
    /// no further callback invocations occur.
    pub async fn close(&mut self) {
        if let Some(mut drain) = self.drain.take() {
            match tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut drain).await {
                Ok(_) => {}
                Err(_) => {
                    drain.abort();
                    // Joining the aborted task guarantees the callback is
                    // not mid-invocation when close() returns.
                    let _ = drain.await;
                }
            }
        }
    }
}

impl Drop for StreamingAdapter {
    fn drop(&mut self) {
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
    }
}
