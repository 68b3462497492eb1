//! Click event entity for per-link analytics

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "click_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub link_id: i64,
    pub clicked_at: DateTimeUtc,
    /// Normalized referrer, `direct` when absent
    pub referrer: String,
    /// xxh64 fingerprint of the anonymized client IP
    pub ip_hash: Option<String>,
    pub device_type: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
