//! Append-only event occurrence log.

use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "event")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sid: i64,
    pub sname: String,
    pub endpoint: String,
    pub endpoint_alias: String,
    pub priority: i32,
    pub event_type: String, // "alert" or "recovery"
    pub hashid: i64,
    pub etime: i64,
    pub value: String,
    pub info: String,
    pub detail: String,
    pub users: String,
    pub groups: String,
    pub need_upgrade: i32,
    pub alert_upgrade: String,
    pub status: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
