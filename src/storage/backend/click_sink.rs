//! ClickSink implementation for SeaOrmStorage
//!
//! 一个批次 = 一个事务：批量插入 click_events，再用一条 CASE WHEN
//! UPDATE 把各链接的 click_count 原地加上本批事件数。
//! 缓冲期间已被永久删除的链接，其事件在事务内丢弃。

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use sea_orm::sea_query::{CaseStatement, Expr, Query};
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, EntityTrait, ExprTrait, QueryFilter, QuerySelect,
    TransactionTrait,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::retry;
use crate::analytics::{ClickEvent, ClickSink};

use migration::entities::{click_event, link};

/// 按 link_id 汇总本批次的点击数
fn count_per_link(events: &[ClickEvent]) -> BTreeMap<i64, i64> {
    let mut counts = BTreeMap::new();
    for event in events {
        *counts.entry(event.link_id).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl ClickSink for SeaOrmStorage {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let counts = count_per_link(&events);

        // click_count = click_count + n，不做读-改-写
        let mut case_stmt = CaseStatement::new();
        for (link_id, n) in &counts {
            case_stmt = case_stmt.case(
                Expr::col(link::Column::Id).eq(Expr::val(*link_id)),
                Expr::col(link::Column::ClickCount).add(Expr::val(*n)),
            );
        }
        case_stmt = case_stmt.finally(Expr::col(link::Column::ClickCount));

        let update = Query::update()
            .table(link::Entity)
            .value(link::Column::ClickCount, case_stmt)
            .and_where(Expr::col(link::Column::Id).is_in(counts.keys().copied()))
            .to_owned();

        let models: Vec<click_event::ActiveModel> = events
            .iter()
            .map(|event| click_event::ActiveModel {
                link_id: Set(event.link_id),
                clicked_at: Set(event.clicked_at),
                referrer: Set(event.referrer.clone()),
                ip_hash: Set(event.ip_hash.clone()),
                device_type: Set(event.device_type.clone()),
                ..Default::default()
            })
            .collect();

        let db = &self.db;
        let update_ref = &update;
        let link_ids: Vec<i64> = counts.keys().copied().collect();
        let inserted = retry::with_retry("flush_click_events", self.retry_config, || async {
            let txn = db.begin().await?;

            let live: HashSet<i64> = link::Entity::find()
                .select_only()
                .column(link::Column::Id)
                .filter(Expr::col(link::Column::Id).is_in(link_ids.clone()))
                .into_tuple::<i64>()
                .all(&txn)
                .await?
                .into_iter()
                .collect();

            let batch: Vec<click_event::ActiveModel> = events
                .iter()
                .zip(models.iter())
                .filter(|(event, _)| live.contains(&event.link_id))
                .map(|(_, model)| model.clone())
                .collect();
            let inserted = batch.len();

            if !batch.is_empty() {
                click_event::Entity::insert_many(batch).exec(&txn).await?;
                txn.execute(update_ref).await?;
            }
            txn.commit().await?;
            Ok(inserted)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Failed to flush click events: {}", e))?;

        if inserted < events.len() {
            debug!(
                "Dropped {} click events for links deleted before flush",
                events.len() - inserted
            );
        }
        debug!(
            "Click events flushed: {} events across {} links",
            inserted,
            counts.len()
        );
        Ok(())
    }
}
