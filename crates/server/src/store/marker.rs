//! Temporal marker store: recovery time, first-alert time and upgrade flag per hash.
//!
//! Absence of a marker means "no". Markers expire after [`MARKER_TTL`], which
//! bounds how long convergence and escalation remember a hash identity.

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::entity::marker;
use crate::error::StoreError;

pub const PREFIX_RECOVERY_TIME: &str = "/n9e/recovery/time/";
pub const PREFIX_ALERT_TIME: &str = "/n9e/alert/time/";
pub const PREFIX_ALERT_UPGRADE: &str = "/n9e/alert/upgrade/";

/// Fixed TTL applied on every marker write.
pub const MARKER_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

#[async_trait]
pub trait MarkerStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;
    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Clone)]
struct MarkerEntry {
    value: i64,
    expires_at: i64,
}

impl MarkerEntry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at > now
    }
}

/// Process-local marker store. Expiry follows the injected clock.
#[derive(Clone)]
pub struct MemoryMarkerStore {
    entries: Arc<DashMap<String, MarkerEntry>>,
    clock: Arc<dyn Clock>,
    last_cleanup: Arc<std::sync::Mutex<i64>>,
}

impl MemoryMarkerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            entries: Arc::new(DashMap::new()),
            clock,
            last_cleanup: Arc::new(std::sync::Mutex::new(now)),
        }
    }

    /// Perform lazy cleanup if enough time has passed
    fn maybe_cleanup(&self, now: i64) {
        const CLEANUP_INTERVAL_SECS: i64 = 60;

        if let Ok(mut last_cleanup) = self.last_cleanup.try_lock()
            && now - *last_cleanup >= CLEANUP_INTERVAL_SECS
        {
            *last_cleanup = now;
            drop(last_cleanup);
            self.entries.retain(|_, entry| entry.is_live(now));
        }
    }

    fn lookup(&self, key: &str) -> Option<i64> {
        let now = self.clock.now();
        self.maybe_cleanup(now);
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl MarkerStore for MemoryMarkerStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.lookup(key).is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.lookup(key))
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.maybe_cleanup(now);
        self.entries.insert(
            key.to_string(),
            MarkerEntry {
                value,
                expires_at: now + ttl.as_secs() as i64,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Marker store backed by the `marker` table. Expired rows read as absent.
#[derive(Clone)]
pub struct DbMarkerStore {
    db: Arc<DatabaseConnection>,
    clock: Arc<dyn Clock>,
}

impl DbMarkerStore {
    pub fn new(db: Arc<DatabaseConnection>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    async fn live(&self, key: &str) -> Result<Option<marker::Model>, StoreError> {
        Ok(marker::Entity::find_by_id(key.to_string())
            .filter(marker::Column::ExpiresAt.gt(self.clock.now()))
            .one(self.db.as_ref())
            .await?)
    }
}

#[async_trait]
impl MarkerStore for DbMarkerStore {
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.live(key).await?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        Ok(self.live(key).await?.map(|m| m.value))
    }

    async fn set_with_ttl(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
        let row = marker::ActiveModel {
            key: ActiveValue::Set(key.to_string()),
            value: ActiveValue::Set(value),
            expires_at: ActiveValue::Set(self.clock.now() + ttl.as_secs() as i64),
        };
        marker::Entity::insert(row)
            .on_conflict(
                OnConflict::column(marker::Column::Key)
                    .update_columns([marker::Column::Value, marker::Column::ExpiresAt])
                    .to_owned(),
            )
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        marker::Entity::delete_by_id(key.to_string())
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

/// Typed access to the three markers of a hash identity.
///
/// Store failures are logged here and read as "marker absent"; writes report
/// whether they took effect.
#[derive(Clone)]
pub struct Markers {
    store: Arc<dyn MarkerStore>,
}

impl Markers {
    pub fn new(store: Arc<dyn MarkerStore>) -> Self {
        Self { store }
    }

    pub fn key(prefix: &str, hashid: u64) -> String {
        format!("{prefix}{hashid}")
    }

    async fn read(&self, key: &str) -> Option<i64> {
        match self.store.get(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    name = "markers.read.failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    key = %key,
                    error = %e,
                    message = "Marker read failed, treating as absent"
                );
                None
            }
        }
    }

    async fn present(&self, key: &str) -> bool {
        match self.store.exists(key).await {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(
                    name = "markers.exists.failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    key = %key,
                    error = %e,
                    message = "Marker lookup failed, treating as absent"
                );
                false
            }
        }
    }

    async fn write(&self, key: &str, value: i64) -> bool {
        if let Err(e) = self.store.set_with_ttl(key, value, MARKER_TTL).await {
            tracing::error!(
                name = "markers.write.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                key = %key,
                error = %e,
                message = "Marker write failed"
            );
            return false;
        }
        true
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::error!(
                name = "markers.delete.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                key = %key,
                error = %e,
                message = "Marker delete failed"
            );
        }
    }

    pub async fn recovery_time(&self, hashid: u64) -> Option<i64> {
        self.read(&Self::key(PREFIX_RECOVERY_TIME, hashid)).await
    }

    pub async fn set_recovery_time(&self, hashid: u64, now: i64) -> bool {
        self.write(&Self::key(PREFIX_RECOVERY_TIME, hashid), now)
            .await
    }

    pub async fn first_alert_time(&self, hashid: u64) -> Option<i64> {
        self.read(&Self::key(PREFIX_ALERT_TIME, hashid)).await
    }

    pub async fn set_first_alert_time(&self, hashid: u64, now: i64) -> bool {
        self.write(&Self::key(PREFIX_ALERT_TIME, hashid), now).await
    }

    pub async fn is_upgraded(&self, hashid: u64) -> bool {
        self.present(&Self::key(PREFIX_ALERT_UPGRADE, hashid)).await
    }

    pub async fn set_upgraded(&self, hashid: u64) -> bool {
        self.write(&Self::key(PREFIX_ALERT_UPGRADE, hashid), 1).await
    }

    /// Forget the escalation cycle: first-alert time and upgrade flag.
    pub async fn clear_escalation(&self, hashid: u64) {
        self.remove(&Self::key(PREFIX_ALERT_TIME, hashid)).await;
        self.remove(&Self::key(PREFIX_ALERT_UPGRADE, hashid)).await;
    }
}
