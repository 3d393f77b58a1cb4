//! Seams to the external collaborators the lifecycle engine depends on.
//!
//! Every store is an explicitly constructed handle passed into the engine.
//! Each trait ships with a sea-orm implementation for production and, where
//! useful, an in-memory implementation for single-process deployments and tests.

pub mod directory;
pub mod events;
pub mod marker;
pub mod mask;
pub mod queue;
pub mod strategy;

pub use directory::{DbDirectory, Directory};
pub use events::{DbEventStore, EventStore};
pub use marker::{
    DbMarkerStore, MARKER_TTL, MarkerStore, Markers, MemoryMarkerStore, PREFIX_ALERT_TIME,
    PREFIX_ALERT_UPGRADE, PREFIX_RECOVERY_TIME,
};
pub use mask::{MaskCache, MaskChecker, MaskRule};
pub use queue::{DbQueueSink, MemoryQueueSink, QueueSink};
pub use strategy::StrategyCache;
