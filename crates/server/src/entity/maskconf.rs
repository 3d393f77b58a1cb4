//! Silence windows.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "maskconf")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub endpoints: String, // JSON list of endpoints
    pub metric: String,
    pub tags: String, // JSON object, empty string for none
    pub btime: i64,
    pub etime: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
