//! Mutation operations for SeaOrmStorage
//!
//! Lifecycle transitions are single conditional UPDATEs so concurrent
//! callers race on the row itself: `rows_affected == 1` marks the winner.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DbErr, EntityTrait, QueryFilter, SqlErr,
    TransactionTrait,
};
use tracing::{debug, info};

use super::converters::{encode_tags, model_to_link, new_link_to_active_model};
use super::{SeaOrmStorage, retry};
use crate::errors::{Result, TrelayError};
use crate::storage::{Link, LinkPatch, NewLink};

use migration::entities::{click_event, link};

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl SeaOrmStorage {
    /// 插入新链接；(slug, domain) 唯一索引冲突时返回 SlugConflict
    ///
    /// 插入本身即 slug 预留，不存在先查后写的窗口。
    pub async fn insert_link(&self, new_link: &NewLink) -> Result<Link> {
        let db = &self.db;
        let now = Utc::now();

        let result = retry::with_retry(
            &format!("insert_link({})", new_link.slug),
            self.retry_config,
            || async { new_link_to_active_model(new_link, now).insert(db).await },
        )
        .await;

        match result {
            Ok(model) => {
                self.invalidate_count_cache();
                debug!("Link row inserted: id={} slug={}", model.id, model.slug);
                Ok(model_to_link(model))
            }
            Err(e) if is_unique_violation(&e) => Err(TrelayError::slug_conflict(format!(
                "slug '{}' is already taken",
                new_link.slug
            ))),
            Err(e) => Err(TrelayError::database_operation(format!(
                "insert link failed: {}",
                e
            ))),
        }
    }

    /// 部分更新活跃链接；链接不存在或已软删除时返回 None
    pub async fn update_link(&self, id: i64, patch: &LinkPatch) -> Result<Option<Link>> {
        let mut am = link::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(ref url) = patch.original_url {
            am.original_url = Set(url.clone());
        }
        if let Some(ref hash) = patch.password_hash {
            am.password_hash = Set(hash.clone());
        }
        if let Some(expires_at) = patch.expires_at {
            am.expires_at = Set(expires_at);
        }
        if let Some(ref tags) = patch.tags {
            am.tags = Set(encode_tags(tags));
        }
        if let Some(folder_id) = patch.folder_id {
            am.folder_id = Set(folder_id);
        }
        if let Some(is_one_time) = patch.is_one_time {
            am.is_one_time = Set(is_one_time);
        }

        let db = &self.db;
        let result = retry::with_retry(
            &format!("update_link({})", id),
            self.retry_config,
            || async {
                link::Entity::update_many()
                    .set(am.clone())
                    .filter(link::Column::Id.eq(id))
                    .filter(link::Column::DeletedAt.is_null())
                    .exec(db)
                    .await
            },
        )
        .await?;

        if result.rows_affected == 0 {
            return Ok(None);
        }

        self.invalidate_count_cache();
        self.get_link_by_id(id).await
    }

    /// 软删除：deleted_at IS NULL -> now
    pub async fn soft_delete_link(&self, id: i64) -> Result<bool> {
        let applied = self.mark_deleted(id, false).await?;
        if applied {
            info!("Link soft-deleted: id={}", id);
        }
        Ok(applied)
    }

    /// 一次性链接消费：与软删除相同的 CAS，额外要求 is_one_time
    pub async fn consume_one_time(&self, id: i64) -> Result<bool> {
        let applied = self.mark_deleted(id, true).await?;
        if applied {
            info!("One-time link consumed: id={}", id);
        }
        Ok(applied)
    }

    async fn mark_deleted(&self, id: i64, one_time_only: bool) -> Result<bool> {
        let now = Utc::now();
        let am = link::ActiveModel {
            deleted_at: Set(Some(now)),
            updated_at: Set(now),
            ..Default::default()
        };

        let db = &self.db;
        let result = retry::with_retry(
            &format!("mark_deleted({})", id),
            self.retry_config,
            || async {
                let mut update = link::Entity::update_many()
                    .set(am.clone())
                    .filter(link::Column::Id.eq(id))
                    .filter(link::Column::DeletedAt.is_null());
                if one_time_only {
                    update = update.filter(link::Column::IsOneTime.eq(true));
                }
                update.exec(db).await
            },
        )
        .await?;

        let applied = result.rows_affected == 1;
        if applied {
            self.invalidate_count_cache();
        }
        Ok(applied)
    }

    /// 恢复：deleted_at IS NOT NULL -> NULL，仅刷新 updated_at
    pub async fn restore_link(&self, id: i64) -> Result<bool> {
        let am = link::ActiveModel {
            deleted_at: Set(None),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let db = &self.db;
        let result = retry::with_retry(
            &format!("restore_link({})", id),
            self.retry_config,
            || async {
                link::Entity::update_many()
                    .set(am.clone())
                    .filter(link::Column::Id.eq(id))
                    .filter(link::Column::DeletedAt.is_not_null())
                    .exec(db)
                    .await
            },
        )
        .await?;

        let applied = result.rows_affected == 1;
        if applied {
            self.invalidate_count_cache();
            info!("Link restored: id={}", id);
        }
        Ok(applied)
    }

    /// 永久删除链接及其点击事件（同一事务）
    pub async fn purge_link(&self, id: i64) -> Result<bool> {
        let txn = self.db.begin().await.map_err(|e| {
            TrelayError::database_operation(format!("begin transaction failed: {}", e))
        })?;

        let purged_events = click_event::Entity::delete_many()
            .filter(click_event::Column::LinkId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        let deleted = link::Entity::delete_by_id(id).exec(&txn).await?.rows_affected;

        txn.commit()
            .await
            .map_err(|e| TrelayError::database_operation(format!("commit failed: {}", e)))?;

        if deleted == 1 {
            self.invalidate_count_cache();
            info!(
                "Link permanently deleted: id={} (purged {} click events)",
                id, purged_events
            );
        }
        Ok(deleted == 1)
    }
}
