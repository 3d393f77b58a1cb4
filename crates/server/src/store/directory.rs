//! Recipient and endpoint metadata lookups.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;

use crate::entity::{endpoint_binding, team_user, user};
use crate::error::StoreError;
use crate::model::{EndpointBinding, User};

#[async_trait]
pub trait Directory: Send + Sync {
    async fn user_ids_by_team_ids(&self, team_ids: &[i64]) -> Result<Vec<i64>, StoreError>;
    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, StoreError>;
    async fn endpoint_bindings(
        &self,
        endpoints: &[String],
    ) -> Result<Vec<EndpointBinding>, StoreError>;
}

#[derive(Clone)]
pub struct DbDirectory {
    db: Arc<DatabaseConnection>,
}

impl DbDirectory {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for DbDirectory {
    async fn user_ids_by_team_ids(&self, team_ids: &[i64]) -> Result<Vec<i64>, StoreError> {
        if team_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = team_user::Entity::find()
            .filter(team_user::Column::TeamId.is_in(team_ids.iter().copied()))
            .all(self.db.as_ref())
            .await?;
        Ok(rows.into_iter().map(|r| r.user_id).collect())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .order_by_asc(user::Column::Id)
            .all(self.db.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|u| User {
                id: u.id,
                username: u.username,
                phone: u.phone,
                email: u.email,
                im: u.im,
            })
            .collect())
    }

    async fn endpoint_bindings(
        &self,
        endpoints: &[String],
    ) -> Result<Vec<EndpointBinding>, StoreError> {
        if endpoints.is_empty() {
            return Ok(Vec::new());
        }
        let rows = endpoint_binding::Entity::find()
            .filter(endpoint_binding::Column::Endpoint.is_in(endpoints.iter().cloned()))
            .order_by_asc(endpoint_binding::Column::Id)
            .all(self.db.as_ref())
            .await?;

        Ok(endpoints
            .iter()
            .map(|ep| EndpointBinding {
                endpoint: ep.clone(),
                nodes: rows
                    .iter()
                    .filter(|r| &r.endpoint == ep)
                    .map(|r| r.node_path.clone())
                    .collect(),
            })
            .collect())
    }
}
