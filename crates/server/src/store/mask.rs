//! Silence (mask) rules, checked before any other lifecycle logic.

use sea_orm::{DatabaseConnection, EntityTrait};
use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::entity::maskconf;
use crate::error::StoreError;
use crate::model::Event;

pub trait MaskChecker: Send + Sync {
    fn is_masked(&self, event: &Event, now: i64) -> bool;
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaskRule {
    pub endpoints: Vec<String>,
    /// Empty matches every metric.
    pub metric: String,
    pub tags: BTreeMap<String, String>,
    pub btime: i64,
    pub etime: i64,
}

impl MaskRule {
    pub fn matches(&self, event: &Event, now: i64) -> bool {
        if now < self.btime || now > self.etime {
            return false;
        }
        if !self.endpoints.iter().any(|ep| ep == &event.endpoint) {
            return false;
        }
        if self.metric.is_empty() && self.tags.is_empty() {
            return true;
        }
        let Ok(details) = event.details() else {
            return false;
        };
        details.iter().any(|d| {
            (self.metric.is_empty() || d.metric == self.metric)
                && self.tags.iter().all(|(k, v)| d.tags.get(k) == Some(v))
        })
    }
}

#[derive(Default)]
pub struct MaskCache {
    rules: RwLock<Vec<MaskRule>>,
}

impl MaskCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&self, rules: Vec<MaskRule>) {
        if let Ok(mut guard) = self.rules.write() {
            *guard = rules;
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn sync_from_db(&self, db: &DatabaseConnection) -> Result<usize, StoreError> {
        let rows = maskconf::Entity::find().all(db).await?;
        let mut rules = Vec::with_capacity(rows.len());
        for row in rows {
            match from_row(&row) {
                Ok(rule) => rules.push(rule),
                Err(e) => tracing::error!(
                    name = "mask.sync.invalid_rule",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    mask_id = row.id,
                    error = %e,
                    message = "Skipping unparsable mask rule"
                ),
            }
        }
        let n = rules.len();
        self.replace_all(rules);
        Ok(n)
    }
}

impl MaskChecker for MaskCache {
    fn is_masked(&self, event: &Event, now: i64) -> bool {
        self.rules
            .read()
            .map(|rules| rules.iter().any(|r| r.matches(event, now)))
            .unwrap_or(false)
    }
}

fn from_row(row: &maskconf::Model) -> Result<MaskRule, serde_json::Error> {
    let tags = if row.tags.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_str(&row.tags)?
    };
    Ok(MaskRule {
        endpoints: serde_json::from_str(&row.endpoints)?,
        metric: row.metric.clone(),
        tags,
        btime: row.btime,
        etime: row.etime,
    })
}
