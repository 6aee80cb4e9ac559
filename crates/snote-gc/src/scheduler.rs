//! Periodic, single-flight execution of collection passes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::collector::{GarbageCollector, GcReport};
use crate::error::{GcError, GcResult};

/// Result of asking for a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A new pass was started.
    Started,
    /// A pass was already running; this trigger was dropped.
    Dropped,
    /// The scheduler is shutting down and accepts no new passes.
    Stopped,
}

struct Shared {
    collector: GarbageCollector,
    running: AtomicBool,
    passes: AtomicU64,
    last: Mutex<Option<Arc<GcResult<GcReport>>>>,
}

/// Clears the in-flight flag when the pass ends, even by panic.
struct InFlight(Arc<Shared>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::Release);
    }
}

impl Shared {
    fn try_begin(self: &Arc<Self>) -> Option<InFlight> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(self)))
    }
}

async fn run_guarded(guard: InFlight) {
    let shared = &guard.0;
    let outcome = shared.collector.run_pass().await;
    match &outcome {
        Ok(report) => info!(
            notes = report.notes_scanned,
            referenced = report.referenced,
            stored = report.stored,
            deleted = report.deleted.len(),
            "gc: pass complete"
        ),
        Err(e @ GcError::EmptyReferenceSet { .. }) => {
            warn!(phase = %e.phase(), error = %e, "gc: pass aborted by safety gate")
        }
        Err(e) => error!(phase = %e.phase(), error = %e, "gc: pass aborted"),
    }
    *shared.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(outcome));
    shared.passes.fetch_add(1, Ordering::Relaxed);
}

/// Runs a [`GarbageCollector`] on a fixed interval.
pub struct GcScheduler {
    collector: GarbageCollector,
    interval: Duration,
}

impl GcScheduler {
    pub fn new(collector: GarbageCollector, interval: Duration) -> Self {
        Self {
            collector,
            interval,
        }
    }

    /// Spawn the timer task. The first pass runs one interval from now.
    pub fn start(self) -> GcHandle {
        let shared = Arc::new(Shared {
            collector: self.collector,
            running: AtomicBool::new(false),
            passes: AtomicU64::new(0),
            last: Mutex::new(None),
        });
        let handle = GcHandle {
            shared,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        };

        let every = self.interval;
        let shared = Arc::clone(&handle.shared);
        let cancel = handle.cancel.clone();
        handle.tracker.spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(interval_secs = every.as_secs(), "gc: scheduler started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => match shared.try_begin() {
                        Some(guard) => run_guarded(guard).await,
                        None => debug!("gc: pass still running, tick dropped"),
                    },
                }
            }
            info!("gc: scheduler stopped");
        });
        handle
    }
}

/// Control surface of a running [`GcScheduler`].
#[derive(Clone)]
pub struct GcHandle {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl GcHandle {
    /// Start a pass now unless one is running or shutdown has begun.
    pub fn trigger(&self) -> TriggerOutcome {
        // Held across the check so `shutdown` cannot finish waiting between
        // the check and the spawn.
        let _pending = self.tracker.token();
        if self.cancel.is_cancelled() {
            return TriggerOutcome::Stopped;
        }
        match self.shared.try_begin() {
            Some(guard) => {
                self.tracker.spawn(run_guarded(guard));
                TriggerOutcome::Started
            }
            None => {
                debug!("gc: manual trigger dropped, pass in flight");
                TriggerOutcome::Dropped
            }
        }
    }

    /// `true` while a pass is in flight.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of passes finished, successful or not.
    pub fn passes_completed(&self) -> u64 {
        self.shared.passes.load(Ordering::Relaxed)
    }

    /// Outcome of the most recent finished pass.
    pub fn last_report(&self) -> Option<Arc<GcResult<GcReport>>> {
        self.shared
            .last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the timer, refuse new triggers, and wait for an in-flight pass.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snote_refs::MarkdownExtractor;
    use snote_store::{BlobStore, InMemoryStorage, NoteStore};

    fn scheduler(store: &Arc<InMemoryStorage>, every: Duration) -> GcScheduler {
        let gc = GarbageCollector::new(store.clone(), store.clone(), Arc::new(MarkdownExtractor));
        GcScheduler::new(gc, every)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_on_interval() {
        let store = Arc::new(InMemoryStorage::new());
        store.put_blob(b"orphan").await.unwrap();
        let handle = scheduler(&store, Duration::from_secs(60)).start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(handle.passes_completed(), 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(handle.passes_completed(), 1);
        assert_eq!(store.blob_count(), 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn overlapping_trigger_is_dropped() {
        let store = Arc::new(InMemoryStorage::new());
        let handle = scheduler(&store, Duration::from_secs(3600)).start();

        assert_eq!(handle.trigger(), TriggerOutcome::Started);
        assert!(handle.is_running());
        assert_eq!(handle.trigger(), TriggerOutcome::Dropped);

        handle.shutdown().await;
        assert!(!handle.is_running());
        assert_eq!(handle.passes_completed(), 1);
        assert!(handle.last_report().unwrap().is_ok());
    }

    #[tokio::test]
    async fn no_triggers_after_shutdown() {
        let store = Arc::new(InMemoryStorage::new());
        let handle = scheduler(&store, Duration::from_secs(3600)).start();
        handle.shutdown().await;
        assert_eq!(handle.trigger(), TriggerOutcome::Stopped);
        assert_eq!(handle.passes_completed(), 0);
        assert!(handle.last_report().is_none());
    }

    #[tokio::test]
    async fn trigger_refused_once_cancelled() {
        let store = Arc::new(InMemoryStorage::new());
        store.put_blob(b"orphan").await.unwrap();
        let handle = scheduler(&store, Duration::from_secs(3600)).start();

        // Shutdown has cancelled but not yet closed the tracker.
        handle.cancel.cancel();
        assert_eq!(handle.trigger(), TriggerOutcome::Stopped);

        handle.shutdown().await;
        assert_eq!(handle.passes_completed(), 0);
        assert_eq!(store.blob_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_pass_outlives_shutdown() {
        let store = Arc::new(InMemoryStorage::new());
        let handle = scheduler(&store, Duration::from_secs(3600)).start();

        let triggers: Vec<_> = (0..16)
            .map(|_| {
                let handle = handle.clone();
                tokio::spawn(async move {
                    for _ in 0..50 {
                        handle.trigger();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        tokio::task::yield_now().await;
        handle.shutdown().await;

        let passes = handle.passes_completed();
        assert!(!handle.is_running());
        for t in triggers {
            t.await.unwrap();
        }
        assert!(!handle.is_running());
        assert_eq!(handle.passes_completed(), passes);
        assert_eq!(handle.trigger(), TriggerOutcome::Stopped);
    }

    #[tokio::test]
    async fn aborted_pass_is_reported() {
        let store = Arc::new(InMemoryStorage::new());
        store.put_blob(b"kept").await.unwrap();
        store
            .save_note(snote_types::Note::new("n", "no attachments"))
            .await
            .unwrap();
        let handle = scheduler(&store, Duration::from_secs(3600)).start();

        assert_eq!(handle.trigger(), TriggerOutcome::Started);
        handle.shutdown().await;

        let last = handle.last_report().unwrap();
        assert!(matches!(*last, Err(GcError::EmptyReferenceSet { .. })));
        assert_eq!(store.blob_count(), 1);
    }
}
