//! Low-priority batching.
//!
//! Low-priority events are parked per strategy and event type and periodically
//! flushed as one aggregated notification per batch. Alerts and recoveries of
//! the same strategy never share a notification.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{Duration, interval};

use crate::lifecycle::StatusRecorder;
use crate::model::{Event, EventType, Status};
use crate::notify::Dispatcher;

type BatchKey = (i64, EventType);

#[derive(Clone)]
pub struct LowPriorityBatcher {
    batches: Arc<DashMap<BatchKey, Vec<Event>>>,
    dispatcher: Dispatcher,
    recorder: StatusRecorder,
}

impl LowPriorityBatcher {
    pub fn new(dispatcher: Dispatcher, recorder: StatusRecorder) -> Self {
        Self {
            batches: Arc::new(DashMap::new()),
            dispatcher,
            recorder,
        }
    }

    pub fn push(&self, event: Event) {
        self.batches
            .entry((event.sid, event.event_type))
            .or_default().push(event);
    }

    /// Number of events waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }

    /// Notify every pending batch and record `send` for its members.
    ///
    /// Returns the number of batches flushed.
    #[tracing::instrument(skip(self))]
    pub async fn flush(&self) -> usize {
        let keys: Vec<BatchKey> = self.batches.iter().map(|b| *b.key()).collect();
        let mut flushed = 0;
        for (sid, event_type) in keys {
            let Some((_, events)) = self.batches.remove(&(sid, event_type)) else {
                continue;
            };
            if events.is_empty() {
                continue;
            }
            tracing::info!(
                name = "aggregator.flush",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                sid,
                event_type = %event_type,
                events = events.len(),
                message = "Flushing low priority batch"
            );
            self.dispatcher.submit(false, events.clone());
            for event in &events {
                self.recorder.record(event, Status::Send).await;
            }
            flushed += 1;
        }
        flushed
    }

    /// Flush forever on a fixed period.
    pub async fn run(self, period: Duration) {
        let mut ticker = interval(period);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.flush().await;
        }
    }
}
