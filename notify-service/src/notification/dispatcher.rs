//! Event dispatch pipeline.
//!
//! Request handlers push stored events into a bounded [`DispatchQueue`]; a
//! single [`DispatchWorker`] pulls them in submission order and hands each one
//! to every configured notifier.
//!
//! - A full queue suspends the submitter until the worker catches up.
//! - A failed delivery is logged and counted, never returned to the
//!   submitter, and never holds up the next event.
//! - After [`DispatchQueue::close`] new submissions are rejected, submitters
//!   still waiting for a slot fail immediately, and the worker drains
//!   whatever is already buffered before it exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channels::Notifier;
use crate::events::{Event, EventId};
use crate::{Error, Result};

/// Default number of events buffered between submitters and the worker.
pub const DEFAULT_DISPATCH_CAPACITY: usize = 10;

/// The most recent failed delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub event_id: EventId,
    pub notifier: String,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

/// Counters shared between the queue and the worker.
#[derive(Debug, Default)]
pub struct DispatchStats {
    submitted: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    last_failure: Mutex<Option<DeliveryFailure>>,
}

/// Point-in-time view of [`DispatchStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchStatsSnapshot {
    /// Events accepted by the queue.
    pub submitted: u64,
    /// Successful deliveries (one per notifier per event).
    pub delivered: u64,
    /// Failed deliveries (one per notifier per event).
    pub failed: u64,
    pub last_failure: Option<DeliveryFailure>,
}

impl DispatchStats {
    pub fn snapshot(&self) -> DispatchStatsSnapshot {
        DispatchStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            last_failure: self.last_failure.lock().clone(),
        }
    }

    fn record_failure(&self, failure: DeliveryFailure) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some(failure);
    }
}

/// Producer side of the dispatch pipeline. Cheap to clone.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: mpsc::Sender<Event>,
    closed: Arc<AtomicBool>,
    shutdown: CancellationToken,
    stats: Arc<DispatchStats>,
}

/// Consumer side of the dispatch pipeline.
pub struct DispatchWorker {
    rx: mpsc::Receiver<Event>,
    notifiers: Vec<Arc<dyn Notifier>>,
    shutdown: CancellationToken,
    stats: Arc<DispatchStats>,
}

/// Create a dispatch queue holding at most `capacity` events (minimum 1) and
/// the worker that delivers them to `notifiers`.
pub fn dispatch_channel(
    capacity: usize,
    notifiers: Vec<Arc<dyn Notifier>>,
) -> (DispatchQueue, DispatchWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shutdown = CancellationToken::new();
    let stats = Arc::new(DispatchStats::default());

    let queue = DispatchQueue {
        tx,
        closed: Arc::new(AtomicBool::new(false)),
        shutdown: shutdown.clone(),
        stats: stats.clone(),
    };
    let worker = DispatchWorker {
        rx,
        notifiers,
        shutdown,
        stats,
    };
    (queue, worker)
}

impl DispatchQueue {
    /// Queue `event` for delivery, waiting while the queue is full.
    ///
    /// Fails with [`Error::QueueClosed`] once the queue has been closed.
    pub async fn submit(&self, event: Event) -> Result<()> {
        self.reserve().await?.send(event);
        Ok(())
    }

    /// Wait for a free slot in the queue.
    ///
    /// Dropping the returned future or the permit gives the slot back without
    /// queuing anything. Fails with [`Error::QueueClosed`] if the queue is
    /// closed before or while waiting.
    pub async fn reserve(&self) -> Result<DispatchPermit<'_>> {
        if self.is_closed() {
            return Err(Error::QueueClosed);
        }

        let permit = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(Error::QueueClosed),
            permit = self.tx.reserve() => permit.map_err(|_| Error::QueueClosed)?,
        };

        Ok(DispatchPermit {
            permit,
            stats: &self.stats,
        })
    }

    /// Stop accepting events; the worker drains what is buffered and exits.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(pending = self.pending(), "Closing dispatch queue");
        }
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Maximum number of buffered events.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Number of events currently buffered.
    pub fn pending(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn stats(&self) -> DispatchStatsSnapshot {
        self.stats.snapshot()
    }
}

/// A reserved slot in a [`DispatchQueue`].
pub struct DispatchPermit<'a> {
    permit: mpsc::Permit<'a, Event>,
    stats: &'a DispatchStats,
}

impl DispatchPermit<'_> {
    /// Queue `event` in the reserved slot. Never waits.
    pub fn send(self, event: Event) {
        let event_id = event.id();
        self.permit.send(event);
        self.stats.submitted.fetch_add(1, Ordering::Relaxed);
        debug!(event_id = %event_id, "Event queued for delivery");
    }
}

impl DispatchWorker {
    /// Run the worker on the current Tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub fn notifier_types(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.notifier_type()).collect()
    }

    /// Deliver events until the queue is closed or every producer is gone,
    /// then drain the buffer.
    pub async fn run(mut self) {
        info!(notifiers = ?self.notifier_types(), "Dispatch worker started");

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                next = self.rx.recv() => match next {
                    Some(event) => self.dispatch(event).await,
                    None => {
                        debug!("All dispatch producers dropped");
                        break;
                    }
                },
            }
        }

        self.rx.close();
        let mut drained = 0usize;
        while let Some(event) = self.rx.recv().await {
            self.dispatch(event).await;
            drained += 1;
        }

        info!(drained, "Dispatch worker stopped");
    }

    async fn dispatch(&self, event: Event) {
        for notifier in &self.notifiers {
            match notifier.deliver(&event).await {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        event_id = %event.id(),
                        notifier = notifier.notifier_type(),
                        "Event delivered"
                    );
                }
                Err(e) => {
                    warn!(
                        event_id = %event.id(),
                        notifier = notifier.notifier_type(),
                        error = %e,
                        "Event delivery failed"
                    );
                    self.stats.record_failure(DeliveryFailure {
                        event_id: event.id(),
                        notifier: notifier.notifier_type().to_string(),
                        error: e.to_string(),
                        failed_at: Utc::now(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventDraft, EventStore, InMemoryEventStore, Severity};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Records delivered titles; optionally fails some and blocks on a gate.
    #[derive(Default)]
    struct RecordingNotifier {
        delivered: Mutex<Vec<String>>,
        failing: HashSet<String>,
        gate: Option<Arc<Semaphore>>,
        started: Option<mpsc::UnboundedSender<String>>,
    }

    impl RecordingNotifier {
        fn failing(titles: &[&str]) -> Self {
            Self {
                failing: titles.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        fn gated(gate: Arc<Semaphore>, started: mpsc::UnboundedSender<String>) -> Self {
            Self {
                gate: Some(gate),
                started: Some(started),
                ..Default::default()
            }
        }

        fn titles(&self) -> Vec<String> {
            self.delivered.lock().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn notifier_type(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, event: &Event) -> Result<()> {
            if let Some(started) = &self.started {
                let _ = started.send(event.title().to_string());
            }
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate closed").forget();
            }
            if self.failing.contains(event.title()) {
                return Err(Error::delivery("recording", "refused"));
            }
            self.delivered.lock().push(event.title().to_string());
            Ok(())
        }
    }

    fn events(store: &InMemoryEventStore, n: usize) -> Vec<Event> {
        (1..=n)
            .map(|i| store.add(EventDraft::new(format!("E{}", i), "", Severity::Warning)))
            .collect()
    }

    fn expected_titles(range: std::ops::RangeInclusive<usize>) -> Vec<String> {
        range.map(|i| format!("E{}", i)).collect()
    }

    #[tokio::test]
    async fn test_delivers_in_submission_order() {
        let store = InMemoryEventStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = dispatch_channel(
            DEFAULT_DISPATCH_CAPACITY,
            vec![notifier.clone() as Arc<dyn Notifier>],
        );
        let handle = worker.spawn();

        for event in events(&store, 25) {
            queue.submit(event).await.unwrap();
        }
        queue.close();
        handle.await.unwrap();

        assert_eq!(notifier.titles(), expected_titles(1..=25));
        let stats = queue.stats();
        assert_eq!(stats.submitted, 25);
        assert_eq!(stats.delivered, 25);
        assert_eq!(stats.failed, 0);
    }

    #[tokio::test]
    async fn test_failure_does_not_stall_pipeline() {
        let store = InMemoryEventStore::new();
        let notifier = Arc::new(RecordingNotifier::failing(&["E1"]));
        let (queue, worker) = dispatch_channel(4, vec![notifier.clone() as Arc<dyn Notifier>]);
        let handle = worker.spawn();

        let events = events(&store, 2);
        let failed_id = events[0].id();
        for event in events {
            queue.submit(event).await.unwrap();
        }
        queue.close();
        handle.await.unwrap();

        assert_eq!(notifier.titles(), vec!["E2"]);
        let stats = queue.stats();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.failed, 1);
        let failure = stats.last_failure.unwrap();
        assert_eq!(failure.event_id, failed_id);
        assert_eq!(failure.notifier, "recording");
    }

    #[tokio::test]
    async fn test_each_notifier_receives_every_event() {
        let store = InMemoryEventStore::new();
        let broken = Arc::new(RecordingNotifier::failing(&["E1", "E2", "E3"]));
        let healthy = Arc::new(RecordingNotifier::default());
        let (queue, worker) = dispatch_channel(
            2,
            vec![
                broken.clone() as Arc<dyn Notifier>,
                healthy.clone() as Arc<dyn Notifier>,
            ],
        );
        let handle = worker.spawn();

        for event in events(&store, 3) {
            queue.submit(event).await.unwrap();
        }
        queue.close();
        handle.await.unwrap();

        assert!(broken.titles().is_empty());
        assert_eq!(healthy.titles(), expected_titles(1..=3));
        assert_eq!(queue.stats().failed, 3);
    }

    #[tokio::test]
    async fn test_full_queue_blocks_submitter() {
        let store = InMemoryEventStore::new();
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(RecordingNotifier::gated(gate.clone(), started_tx));
        let (queue, worker) = dispatch_channel(2, vec![notifier.clone() as Arc<dyn Notifier>]);
        let handle = worker.spawn();

        let events = events(&store, 4);
        queue.submit(events[0].clone()).await.unwrap();
        // The worker is now parked inside the first delivery.
        assert_eq!(started_rx.recv().await.unwrap(), "E1");

        queue.submit(events[1].clone()).await.unwrap();
        queue.submit(events[2].clone()).await.unwrap();
        assert_eq!(queue.pending(), 2);

        let blocked = tokio::spawn({
            let queue = queue.clone();
            let event = events[3].clone();
            async move { queue.submit(event).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        gate.add_permits(4);
        blocked.await.unwrap().unwrap();

        queue.close();
        handle.await.unwrap();
        assert_eq!(notifier.titles(), expected_titles(1..=4));
    }

    #[tokio::test]
    async fn test_close_drains_and_rejects() {
        let store = InMemoryEventStore::new();
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(RecordingNotifier::gated(gate.clone(), started_tx));
        let (queue, worker) = dispatch_channel(4, vec![notifier.clone() as Arc<dyn Notifier>]);
        let handle = worker.spawn();

        let events = events(&store, 4);
        queue.submit(events[0].clone()).await.unwrap();
        assert_eq!(started_rx.recv().await.unwrap(), "E1");
        queue.submit(events[1].clone()).await.unwrap();
        queue.submit(events[2].clone()).await.unwrap();

        queue.close();
        assert!(queue.is_closed());
        let err = queue.submit(events[3].clone()).await.unwrap_err();
        assert!(matches!(err, Error::QueueClosed));

        gate.add_permits(3);
        handle.await.unwrap();

        assert_eq!(notifier.titles(), expected_titles(1..=3));
        assert_eq!(queue.stats().submitted, 3);
    }

    #[tokio::test]
    async fn test_close_fails_blocked_submitter_immediately() {
        let store = InMemoryEventStore::new();
        let gate = Arc::new(Semaphore::new(0));
        let (started_tx, mut started_rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(RecordingNotifier::gated(gate.clone(), started_tx));
        let (queue, worker) = dispatch_channel(1, vec![notifier.clone() as Arc<dyn Notifier>]);
        let handle = worker.spawn();

        let events = events(&store, 3);
        queue.submit(events[0].clone()).await.unwrap();
        assert_eq!(started_rx.recv().await.unwrap(), "E1");
        queue.submit(events[1].clone()).await.unwrap();

        let blocked = tokio::spawn({
            let queue = queue.clone();
            let event = events[2].clone();
            async move { queue.submit(event).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!blocked.is_finished());

        // The worker is still inside E1's delivery.
        queue.close();
        let result = tokio::time::timeout(Duration::from_secs(5), blocked)
            .await
            .expect("blocked submitter should fail without waiting for the worker")
            .unwrap();
        assert!(matches!(result, Err(Error::QueueClosed)));

        gate.add_permits(2);
        handle.await.unwrap();
        assert_eq!(notifier.titles(), expected_titles(1..=2));
        assert_eq!(queue.stats().submitted, 2);
    }

    #[tokio::test]
    async fn test_dropped_permit_releases_slot() {
        let store = InMemoryEventStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = dispatch_channel(1, vec![notifier.clone() as Arc<dyn Notifier>]);

        let permit = queue.reserve().await.unwrap();
        assert_eq!(queue.pending(), 1);
        drop(permit);
        assert_eq!(queue.pending(), 0);

        let event = store.add(EventDraft::new("E1", "", Severity::Warning));
        queue.reserve().await.unwrap().send(event);
        let handle = worker.spawn();
        queue.close();
        handle.await.unwrap();

        assert_eq!(notifier.titles(), expected_titles(1..=1));
        assert_eq!(queue.stats().submitted, 1);
    }

    #[tokio::test]
    async fn test_reserve_after_close_fails() {
        let (queue, _worker) = dispatch_channel(1, Vec::new());
        queue.close();
        assert!(matches!(queue.reserve().await, Err(Error::QueueClosed)));
    }

    #[tokio::test]
    async fn test_worker_exits_when_producers_dropped() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = dispatch_channel(1, vec![notifier as Arc<dyn Notifier>]);
        let handle = worker.spawn();

        drop(queue);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }

    #[test]
    fn test_capacity_is_clamped() {
        let (queue, worker) = dispatch_channel(0, Vec::new());
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.pending(), 0);
        assert!(worker.notifier_types().is_empty());
    }
}
