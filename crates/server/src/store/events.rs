//! Durable event log (`event`) and latest-state projection (`event_cur`).

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;

use crate::entity::{event, event_cur};
use crate::error::StoreError;
use crate::model::{CurrentEvent, EventType, Status};

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn save_event_status(&self, id: i64, status: Status) -> Result<(), StoreError>;
    async fn save_event_cur_status(&self, hashid: u64, status: Status) -> Result<(), StoreError>;
    async fn update_event_priority(&self, id: i64, level: i32) -> Result<(), StoreError>;
    async fn update_event_cur_priority(&self, hashid: u64, level: i32) -> Result<(), StoreError>;
    async fn event_cur_get(&self, hashid: u64) -> Result<Option<CurrentEvent>, StoreError>;
    /// Notified ALERT occurrences of `hashid` with `start <= etime < end`.
    async fn event_count(
        &self,
        hashid: u64,
        start: i64,
        end: i64,
        is_upgrade: bool,
    ) -> Result<u64, StoreError>;
}

// Hash ids are unsigned 64-bit; the columns are signed BIGINT holding the same bits.
fn hash_column(hashid: u64) -> i64 {
    hashid as i64
}

#[derive(Clone)]
pub struct DbEventStore {
    db: Arc<DatabaseConnection>,
}

impl DbEventStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EventStore for DbEventStore {
    async fn save_event_status(&self, id: i64, status: Status) -> Result<(), StoreError> {
        event::Entity::update_many()
            .col_expr(event::Column::Status, Expr::value(status.as_str()))
            .filter(event::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn save_event_cur_status(&self, hashid: u64, status: Status) -> Result<(), StoreError> {
        event_cur::Entity::update_many()
            .col_expr(event_cur::Column::Status, Expr::value(status.as_str()))
            .filter(event_cur::Column::Hashid.eq(hash_column(hashid)))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn update_event_priority(&self, id: i64, level: i32) -> Result<(), StoreError> {
        event::Entity::update_many()
            .col_expr(event::Column::Priority, Expr::value(level))
            .filter(event::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn update_event_cur_priority(&self, hashid: u64, level: i32) -> Result<(), StoreError> {
        event_cur::Entity::update_many()
            .col_expr(event_cur::Column::Priority, Expr::value(level))
            .filter(event_cur::Column::Hashid.eq(hash_column(hashid)))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn event_cur_get(&self, hashid: u64) -> Result<Option<CurrentEvent>, StoreError> {
        let row = event_cur::Entity::find()
            .filter(event_cur::Column::Hashid.eq(hash_column(hashid)))
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(|m| CurrentEvent {
            id: m.id,
            hashid: m.hashid as u64,
            claimants: m.claimants,
            ignore_alert: m.ignore_alert,
            priority: m.priority,
            status: m.status,
        }))
    }

    async fn event_count(
        &self,
        hashid: u64,
        start: i64,
        end: i64,
        is_upgrade: bool,
    ) -> Result<u64, StoreError> {
        let statuses: &[&str] = if is_upgrade {
            &[Status::Send.as_str(), Status::Upgrade.as_str()]
        } else {
            &[Status::Send.as_str()]
        };
        let count = event::Entity::find()
            .filter(event::Column::Hashid.eq(hash_column(hashid)))
            .filter(event::Column::EventType.eq(EventType::Alert.as_str()))
            .filter(event::Column::Etime.gte(start))
            .filter(event::Column::Etime.lt(end))
            .filter(event::Column::Status.is_in(statuses.iter().copied()))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
