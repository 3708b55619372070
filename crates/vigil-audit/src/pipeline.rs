//! Batched audit log pipeline.
//!
//! # State machine
//!
//! ```text
//! Idle ──enqueue──► Enqueuing ──trigger──► Flushing ──done──► Idle
//!                      │                      ▲
//!                      │   timer (5s, queue   │ at most one in-flight
//!                      └── non-empty) ────────┘ batch (atomic flag)
//! ```
//!
//! Events are accepted into an ordered, unbounded in-memory queue and
//! drained in batches of up to 500 as one atomic store write. A flush
//! is triggered right after an accepted enqueue (skipped when one is
//! already in flight) and by a background timer while the queue is
//! non-empty.
//!
//! # Durability
//!
//! Under [`AuditDurability::BestEffort`] a failed batch write is
//! discarded, not retried — at most one batch is lost per store fault
//! and the remaining queue is untouched. The pipeline favors
//! availability of the primary access path over audit completeness;
//! swap the policy to change that trade-off.

use crate::entry::{AuditActor, AuditEvent, AuditLogEntry};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};
use vigil_store::{collections, BatchWrite, DocumentStore};
use vigil_types::IdentityProvider;

/// Default maximum entries per batch write.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Default background flush interval.
const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

/// Named durability policy for failed batch writes.
///
/// The policy is explicit so a deployment targeting stricter compliance
/// can swap in a retrying variant without re-deriving the trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum AuditDurability {
    /// Discard a failed batch and log a degraded-mode warning.
    /// Liveness of the primary path wins over audit completeness.
    #[default]
    BestEffort,
}

/// Outcome of an enqueue attempt.
///
/// Drops are silent toward the caller by design (no error, no retry
/// signal); the pipeline's counters make them observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The event was stamped and queued.
    Accepted,
    /// Dropped: nobody is signed in.
    DroppedUnauthenticated,
    /// Dropped: email unverified and the event is not critical.
    DroppedUnverified,
    /// Dropped: the pipeline is disabled.
    DroppedDisabled,
}

impl EnqueueOutcome {
    /// Returns `true` if the event was queued.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Batched, back-pressure-aware audit log pipeline.
///
/// Constructed explicitly with its store and identity provider
/// injected; each instance owns its queue, so tests run isolated
/// pipelines.
pub struct AuditPipeline {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    queue: Mutex<VecDeque<AuditLogEntry>>,
    /// At most one in-flight batch write.
    flushing: AtomicBool,
    enabled: AtomicBool,
    durability: AuditDurability,
    batch_size: usize,
    flush_interval: Duration,
    stopped: AtomicBool,
    stop_signal: Notify,
    // Observability counters for behavior that is silent to callers.
    dropped_unauthenticated: AtomicU64,
    dropped_unverified: AtomicU64,
    dropped_disabled: AtomicU64,
    discarded_entries: AtomicU64,
    persisted_entries: AtomicU64,
}

impl AuditPipeline {
    /// Creates an enabled pipeline with default batch size, flush
    /// interval and best-effort durability.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            identity,
            queue: Mutex::new(VecDeque::new()),
            flushing: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            durability: AuditDurability::BestEffort,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            stopped: AtomicBool::new(false),
            stop_signal: Notify::new(),
            dropped_unauthenticated: AtomicU64::new(0),
            dropped_unverified: AtomicU64::new(0),
            dropped_disabled: AtomicU64::new(0),
            discarded_entries: AtomicU64::new(0),
            persisted_entries: AtomicU64::new(0),
        }
    }

    /// Overrides the batch size (builder style).
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Overrides the background flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Overrides the durability policy.
    #[must_use]
    pub fn with_durability(mut self, durability: AuditDurability) -> Self {
        self.durability = durability;
        self
    }

    /// Gates, stamps and queues an event, then triggers a background
    /// flush if none is in flight.
    ///
    /// Gating (evaluated now, not at flush time): the pipeline must be
    /// enabled, a principal must be signed in, and an unverified email
    /// only passes for critical events. Gated-out events are dropped
    /// and counted.
    pub fn enqueue(self: &Arc<Self>, event: AuditEvent) -> EnqueueOutcome {
        if !self.enabled.load(Ordering::SeqCst) {
            self.dropped_disabled.fetch_add(1, Ordering::Relaxed);
            return EnqueueOutcome::DroppedDisabled;
        }
        let Some(principal) = self.identity.current() else {
            self.dropped_unauthenticated.fetch_add(1, Ordering::Relaxed);
            return EnqueueOutcome::DroppedUnauthenticated;
        };
        if !principal.email_verified && !event.critical {
            self.dropped_unverified.fetch_add(1, Ordering::Relaxed);
            return EnqueueOutcome::DroppedUnverified;
        }

        let actor = AuditActor {
            user_id: principal.user_id,
            email: principal.email,
        };
        self.queue.lock().push_back(AuditLogEntry::stamp(event, actor));

        self.trigger_flush();
        EnqueueOutcome::Accepted
    }

    /// Spawns a flush task unless one is already in flight.
    ///
    /// Outside a tokio runtime the trigger is a no-op; the owner's
    /// timer (or an explicit [`flush_now`](Self::flush_now)) drains the
    /// queue instead.
    fn trigger_flush(self: &Arc<Self>) {
        if self.flushing.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let pipeline = Arc::clone(self);
            handle.spawn(async move {
                pipeline.flush_now().await;
            });
        }
    }

    /// Drains the queue in batches until it is empty or a batch fails.
    ///
    /// Returns the number of entries persisted by this call. Re-entrant
    /// calls while a flush is in flight return 0 immediately.
    pub async fn flush_now(&self) -> usize {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return 0;
        }

        let mut total = 0usize;
        loop {
            let batch: Vec<AuditLogEntry> = {
                let mut queue = self.queue.lock();
                let n = queue.len().min(self.batch_size);
                queue.drain(..n).collect()
            };
            if batch.is_empty() {
                break;
            }

            let writes: Vec<BatchWrite> = batch
                .iter()
                .filter_map(|entry| {
                    serde_json::to_value(entry).ok().map(|doc| {
                        BatchWrite::set(collections::AUDIT_LOG, entry.id.uuid().to_string(), doc)
                    })
                })
                .collect();

            match self.store.write_batch(writes).await {
                Ok(()) => {
                    total += batch.len();
                    self.persisted_entries
                        .fetch_add(batch.len() as u64, Ordering::Relaxed);
                }
                Err(e) => match self.durability {
                    // The drained batch is gone; the rest of the queue
                    // is untouched and later flushes continue.
                    AuditDurability::BestEffort => {
                        self.discarded_entries
                            .fetch_add(batch.len() as u64, Ordering::Relaxed);
                        warn!(
                            discarded = batch.len(),
                            queued = self.queue.lock().len(),
                            error = %e,
                            "audit flush failed, batch discarded (degraded mode)"
                        );
                        break;
                    }
                },
            }
        }

        self.flushing.store(false, Ordering::SeqCst);
        total
    }

    /// Runs the background flush timer until [`shutdown`](Self::shutdown).
    ///
    /// Each tick attempts a flush when the queue is non-empty. Spawn
    /// with the pipeline's runtime:
    ///
    /// ```ignore
    /// let timer = tokio::spawn({
    ///     let pipeline = Arc::clone(&pipeline);
    ///     async move { pipeline.run_flush_timer().await }
    /// });
    /// ```
    pub async fn run_flush_timer(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.flush_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            tokio::select! {
                _ = self.stop_signal.notified() => break,
                _ = interval.tick() => {
                    if !self.queue.lock().is_empty() {
                        self.flush_now().await;
                    }
                }
            }
        }
        debug!("audit flush timer stopped");
    }

    /// Stops the background timer. In-flight flushes are not aborted.
    pub fn shutdown(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_signal.notify_waiters();
    }

    /// Stops accepting events and clears the queue immediately.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        let cleared = {
            let mut queue = self.queue.lock();
            let n = queue.len();
            queue.clear();
            n
        };
        if cleared > 0 {
            warn!(cleared, "audit pipeline disabled, queue cleared");
        }
    }

    /// Resumes accepting events.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` while the pipeline accepts events.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current queue depth.
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Events dropped because nobody was signed in.
    #[must_use]
    pub fn dropped_unauthenticated(&self) -> u64 {
        self.dropped_unauthenticated.load(Ordering::Relaxed)
    }

    /// Events dropped because the principal's email was unverified.
    #[must_use]
    pub fn dropped_unverified(&self) -> u64 {
        self.dropped_unverified.load(Ordering::Relaxed)
    }

    /// Events dropped while the pipeline was disabled.
    #[must_use]
    pub fn dropped_disabled(&self) -> u64 {
        self.dropped_disabled.load(Ordering::Relaxed)
    }

    /// Entries lost to failed batch writes.
    #[must_use]
    pub fn discarded_entries(&self) -> u64 {
        self.discarded_entries.load(Ordering::Relaxed)
    }

    /// Entries successfully persisted.
    #[must_use]
    pub fn persisted_entries(&self) -> u64 {
        self.persisted_entries.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AuditPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditPipeline")
            .field("queued", &self.queue_len())
            .field("enabled", &self.is_enabled())
            .field("flushing", &self.flushing.load(Ordering::SeqCst))
            .field("durability", &self.durability)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{ActionResult, ActionType};
    use vigil_store::{DocumentStore, MemoryStore, Query};
    use vigil_types::{AuthPrincipal, StaticIdentity};

    fn event(action: &str) -> AuditEvent {
        AuditEvent::new(action, "patient", "p-1", ActionType::Access, ActionResult::Success)
    }

    fn pipeline_with(identity: StaticIdentity) -> (Arc<MemoryStore>, Arc<AuditPipeline>) {
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(AuditPipeline::new(store.clone(), Arc::new(identity)));
        (store, pipeline)
    }

    async fn drain(pipeline: &Arc<AuditPipeline>) {
        while pipeline.queue_len() > 0 {
            pipeline.flush_now().await;
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn accepted_event_is_persisted() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let (store, pipeline) = pipeline_with(identity);

        assert!(pipeline.enqueue(event("access_decision")).is_accepted());
        drain(&pipeline).await;

        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 1);
        assert_eq!(pipeline.persisted_entries(), 1);
    }

    #[tokio::test]
    async fn unauthenticated_events_never_reach_the_log() {
        let (store, pipeline) = pipeline_with(StaticIdentity::signed_out());

        let outcome = pipeline.enqueue(event("access_decision"));
        assert_eq!(outcome, EnqueueOutcome::DroppedUnauthenticated);
        drain(&pipeline).await;

        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 0);
        assert_eq!(pipeline.dropped_unauthenticated(), 1);
    }

    #[tokio::test]
    async fn unverified_email_drops_noncritical_but_keeps_critical() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::unverified("u-1", "a@b.example"));
        let (store, pipeline) = pipeline_with(identity);

        assert_eq!(
            pipeline.enqueue(event("routine")),
            EnqueueOutcome::DroppedUnverified
        );
        assert!(pipeline.enqueue(event("break_glass").critical()).is_accepted());
        drain(&pipeline).await;

        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 1);
        assert_eq!(pipeline.dropped_unverified(), 1);
    }

    #[tokio::test]
    async fn disabled_pipeline_drops_and_clears() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let (store, pipeline) = pipeline_with(identity);

        // Queue something without letting the spawned flush run, then disable.
        assert!(pipeline.enqueue(event("one")).is_accepted());
        pipeline.disable();
        assert_eq!(pipeline.queue_len(), 0, "disable clears the queue");

        assert_eq!(pipeline.enqueue(event("two")), EnqueueOutcome::DroppedDisabled);
        drain(&pipeline).await;
        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 0);

        pipeline.enable();
        assert!(pipeline.enqueue(event("three")).is_accepted());
        drain(&pipeline).await;
        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 1);
        assert_eq!(pipeline.dropped_disabled(), 1);
    }

    #[tokio::test]
    async fn one_store_fault_loses_at_most_one_batch() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(AuditPipeline::new(store.clone(), Arc::new(identity)));

        // Load 1,200 events. On the current-thread test runtime the
        // spawned flush tasks cannot run inside this synchronous loop,
        // so the queue holds all of them.
        for i in 0..1_200 {
            assert!(pipeline.enqueue(event(&format!("e-{i}"))).is_accepted());
        }
        assert_eq!(pipeline.queue_len(), 1_200);

        // First batch write fails; the pipeline discards exactly that
        // batch and keeps going on subsequent flushes.
        store.fail_next(1);
        pipeline.flush_now().await;
        drain(&pipeline).await;

        assert_eq!(pipeline.discarded_entries(), 500);
        assert_eq!(pipeline.persisted_entries(), 700);
        assert_eq!(
            store.count(collections::AUDIT_LOG).await.expect("count"),
            700
        );
    }

    #[tokio::test]
    async fn entries_flush_in_enqueue_order() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let store = Arc::new(MemoryStore::new());
        let pipeline =
            Arc::new(AuditPipeline::new(store.clone(), Arc::new(identity)).with_batch_size(10));

        for i in 0..25 {
            pipeline.enqueue(event(&format!("e-{i:02}")));
        }
        drain(&pipeline).await;

        let docs = store
            .query(collections::AUDIT_LOG, &Query::new())
            .await
            .expect("query");
        assert_eq!(docs.len(), 25);

        let mut actions: Vec<String> = docs
            .iter()
            .map(|d| d["action"].as_str().expect("action").to_string())
            .collect();
        actions.sort();
        // All 25 distinct actions made it; batch boundaries lost none.
        assert_eq!(actions.first().map(String::as_str), Some("e-00"));
        assert_eq!(actions.last().map(String::as_str), Some("e-24"));
    }

    #[tokio::test]
    async fn flush_now_is_reentrancy_guarded() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let (_, pipeline) = pipeline_with(identity);
        pipeline.enqueue(event("one"));

        // Hold the flag as an in-flight flush would.
        pipeline.flushing.store(true, Ordering::SeqCst);
        assert_eq!(pipeline.flush_now().await, 0);
        pipeline.flushing.store(false, Ordering::SeqCst);

        drain(&pipeline).await;
        assert_eq!(pipeline.queue_len(), 0);
    }

    #[tokio::test]
    async fn timer_flushes_queued_entries() {
        let identity = StaticIdentity::signed_in(AuthPrincipal::verified("u-1", "a@b.example"));
        let store = Arc::new(MemoryStore::new());
        let pipeline = Arc::new(
            AuditPipeline::new(store.clone(), Arc::new(identity))
                .with_flush_interval(Duration::from_millis(10)),
        );

        let timer = tokio::spawn({
            let pipeline = Arc::clone(&pipeline);
            async move { pipeline.run_flush_timer().await }
        });

        pipeline.enqueue(event("timed"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(store.count(collections::AUDIT_LOG).await.expect("count"), 1);

        pipeline.shutdown();
        timer.await.expect("timer task");
    }
}
