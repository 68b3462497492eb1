//! Analytics 相关的数据库查询
//!
//! 按事件时间（clicked_at）分桶，与事件到达顺序无关。

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DbBackend, EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr,
};

use super::SeaOrmStorage;
use crate::errors::Result;

use migration::entities::click_event;

/// 分组查询结果行
#[derive(Debug, FromQueryResult)]
pub struct LabelRow {
    pub label: String,
    pub clicks: i64,
}

/// 时间桶粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Day,
    Month,
}

fn bucket_expr(backend: DbBackend, bucket: Bucket) -> Expr {
    let (sqlite_fmt, mysql_fmt, pg_fmt) = match bucket {
        Bucket::Day => ("%Y-%m-%d", "%Y-%m-%d", "YYYY-MM-DD"),
        Bucket::Month => ("%Y-%m", "%Y-%m", "YYYY-MM"),
    };

    match backend {
        DbBackend::Sqlite => Expr::cust(format!("strftime('{}', clicked_at)", sqlite_fmt)),
        DbBackend::MySql => Expr::cust(format!("DATE_FORMAT(clicked_at, '{}')", mysql_fmt)),
        _ => Expr::cust(format!("TO_CHAR(clicked_at, '{}')", pg_fmt)),
    }
}

impl SeaOrmStorage {
    /// 指定链接自 `since` 起的时间桶点击数（升序）
    pub async fn clicks_by_bucket(
        &self,
        link_id: i64,
        since: DateTime<Utc>,
        bucket: Bucket,
    ) -> Result<Vec<LabelRow>> {
        let expr = bucket_expr(self.backend, bucket);
        let rows = click_event::Entity::find()
            .select_only()
            .column_as(expr.clone(), "label")
            .column_as(click_event::Column::Id.count(), "clicks")
            .filter(click_event::Column::LinkId.eq(link_id))
            .filter(click_event::Column::ClickedAt.gte(since))
            .group_by(expr)
            .order_by_asc(Expr::cust("label"))
            .into_model::<LabelRow>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// 来源排行：点击数降序，相同按来源升序
    pub async fn clicks_by_referrer(&self, link_id: i64, limit: u64) -> Result<Vec<LabelRow>> {
        let rows = click_event::Entity::find()
            .select_only()
            .column_as(click_event::Column::Referrer, "label")
            .column_as(click_event::Column::Id.count(), "clicks")
            .filter(click_event::Column::LinkId.eq(link_id))
            .group_by(click_event::Column::Referrer)
            .order_by_desc(Expr::cust("clicks"))
            .order_by_asc(Expr::cust("label"))
            .limit(limit)
            .into_model::<LabelRow>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }

    /// 设备类型分布：点击数降序
    pub async fn clicks_by_device(&self, link_id: i64) -> Result<Vec<LabelRow>> {
        let rows = click_event::Entity::find()
            .select_only()
            .column_as(click_event::Column::DeviceType, "label")
            .column_as(click_event::Column::Id.count(), "clicks")
            .filter(click_event::Column::LinkId.eq(link_id))
            .group_by(click_event::Column::DeviceType)
            .order_by_desc(Expr::cust("clicks"))
            .order_by_asc(Expr::cust("label"))
            .into_model::<LabelRow>()
            .all(&self.db)
            .await?;
        Ok(rows)
    }
}
