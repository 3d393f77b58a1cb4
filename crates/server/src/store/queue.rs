//! Push-only delivery queues. Consumption belongs to the channel senders.

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection};
use std::collections::VecDeque;
use std::sync::Arc;

use crate::clock::Clock;
use crate::entity::queue_message;
use crate::error::StoreError;

#[async_trait]
pub trait QueueSink: Send + Sync {
    async fn push(&self, queue: &str, payload: String) -> Result<(), StoreError>;
}

/// In-process queues. Newest payload first, like `LPUSH`.
#[derive(Clone, Default)]
pub struct MemoryQueueSink {
    queues: Arc<DashMap<String, VecDeque<String>>>,
}

impl MemoryQueueSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a queue, newest first.
    pub fn messages(&self, queue: &str) -> Vec<String> {
        self.queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.queues.iter().map(|q| q.len()).sum()
    }
}

#[async_trait]
impl QueueSink for MemoryQueueSink {
    async fn push(&self, queue: &str, payload: String) -> Result<(), StoreError> {
        self.queues
            .entry(queue.to_string())
            .or_default()
            .push_front(payload);
        Ok(())
    }
}

/// Queues stored as rows of the `queue_message` table.
#[derive(Clone)]
pub struct DbQueueSink {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
}

impl DbQueueSink {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }
}

#[async_trait]
impl QueueSink for DbQueueSink {
    async fn push(&self, queue: &str, payload: String) -> Result<(), StoreError> {
        let row = queue_message::ActiveModel {
            id: ActiveValue::NotSet,
            queue: ActiveValue::Set(queue.to_string()),
            payload: ActiveValue::Set(payload),
            created_at: ActiveValue::Set(self.clock.now()),
        };
        row.insert(self.db.as_ref()).await?;
        Ok(())
    }
}
