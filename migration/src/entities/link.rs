use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub slug: String,
    /// 空串表示默认域名
    pub domain: String,
    #[sea_orm(column_type = "Text")]
    pub original_url: String,
    pub password_hash: Option<String>,
    pub is_one_time: bool,
    pub expires_at: Option<DateTimeUtc>,
    /// JSON 数组文本，已排序去重
    #[sea_orm(column_type = "Text")]
    pub tags: String,
    pub folder_id: Option<i64>,
    pub click_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
