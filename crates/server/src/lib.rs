//! Alert lifecycle engine.
//!
//! Decides, per incoming alert or recovery event, whether it is masked,
//! escalated, converged (deduplicated) or notified, records the decision on
//! the event log and the current-event projection, and fans notifications
//! out to per-channel delivery queues.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::store::{Directory, EventStore, MaskChecker, Markers, QueueSink, StrategyCache};

pub mod aggregator;
pub mod api;
pub mod clock;
pub mod config;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod store;
pub mod worker;

/// Service handles shared by the engine, the notifier and the batcher.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<AppConfig>,
    pub events: Arc<dyn EventStore>,
    pub markers: Markers,
    pub queues: Arc<dyn QueueSink>,
    pub directory: Arc<dyn Directory>,
    pub strategies: StrategyCache,
    pub masks: Arc<dyn MaskChecker>,
    pub clock: Arc<dyn Clock>,
}
