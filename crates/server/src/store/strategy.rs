use dashmap::DashMap;
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;

use crate::entity::stra;
use crate::error::StoreError;
use crate::model::Strategy;

/// Read-mostly cache of alerting rules, refreshed from the `stra` table.
#[derive(Clone, Default)]
pub struct StrategyCache {
    strategies: Arc<DashMap<i64, Strategy>>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_by_id(&self, sid: i64) -> Option<Strategy> {
        self.strategies.get(&sid).map(|s| s.clone())
    }

    pub fn insert(&self, strategy: Strategy) {
        self.strategies.insert(strategy.id, strategy);
    }

    /// Swap the whole rule set, dropping rules that no longer exist.
    pub fn replace_all(&self, strategies: Vec<Strategy>) {
        let keep: Vec<i64> = strategies.iter().map(|s| s.id).collect();
        for s in strategies {
            self.strategies.insert(s.id, s);
        }
        self.strategies.retain(|id, _| keep.contains(id));
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    #[tracing::instrument(skip_all)]
    pub async fn sync_from_db(&self, db: &DatabaseConnection) -> Result<usize, StoreError> {
        let rows = stra::Entity::find().all(db).await?;
        let strategies: Vec<Strategy> = rows.into_iter().filter_map(from_row).collect();
        let n = strategies.len();
        self.replace_all(strategies);
        Ok(n)
    }
}

fn from_row(row: stra::Model) -> Option<Strategy> {
    match serde_json::from_str::<[i64; 2]>(&row.converge) {
        Ok(converge) => Some(Strategy {
            id: row.id,
            name: row.name,
            converge,
            recovery_notify: row.recovery_notify,
            callback: row.callback,
        }),
        Err(e) => {
            tracing::error!(
                name = "strategy.sync.invalid_converge",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                sid = row.id,
                converge = %row.converge,
                error = %e,
                message = "Skipping strategy with unparsable converge setting"
            );
            None
        }
    }
}
