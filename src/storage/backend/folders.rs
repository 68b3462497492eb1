//! Folder persistence
//!
//! Folders form a tree through `parent_id`. Moves walk the ancestor chain
//! and write the new parent inside one transaction, so two concurrent moves
//! cannot close a loop between them.

use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info};

use super::{SeaOrmStorage, retry};
use super::converters::model_to_folder;
use crate::errors::{Result, TrelayError};
use crate::storage::Folder;

use migration::entities::{folder, link};

impl SeaOrmStorage {
    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        let models = folder::Entity::find()
            .order_by_asc(folder::Column::Name)
            .order_by_asc(folder::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(model_to_folder).collect())
    }

    pub async fn get_folder(&self, id: i64) -> Result<Option<Folder>> {
        let model = folder::Entity::find_by_id(id).one(&self.db).await?;
        Ok(model.map(model_to_folder))
    }

    pub async fn insert_folder(&self, name: &str, parent_id: Option<i64>) -> Result<Folder> {
        let am = folder::ActiveModel {
            name: Set(name.to_string()),
            parent_id: Set(parent_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let model = am.insert(&self.db).await?;
        info!("Folder created: id={} name={}", model.id, model.name);
        Ok(model_to_folder(model))
    }

    /// 更新名称和/或父节点；外层 None 表示不变
    ///
    /// 新父节点不存在或会成环时返回 `parent_id` 校验错误。
    pub async fn update_folder(
        &self,
        id: i64,
        name: Option<&str>,
        parent_id: Option<Option<i64>>,
    ) -> Result<Option<Folder>> {
        let db = &self.db;
        let outcome = retry::with_retry(&format!("update_folder({})", id), self.retry_config, || {
            async move {
                let txn = db.begin().await?;
                let outcome = move_in_txn(&txn, id, name, parent_id).await?;
                match outcome {
                    FolderMove::Moved(_) => txn.commit().await?,
                    _ => txn.rollback().await?,
                }
                Ok::<_, DbErr>(outcome)
            }
        })
        .await
        .map_err(|e| TrelayError::database_operation(format!("update folder failed: {}", e)))?;

        match outcome {
            FolderMove::Moved(folder) => Ok(Some(folder)),
            FolderMove::NotFound => Ok(None),
            FolderMove::MissingParent(parent_id) => Err(TrelayError::validation(
                "parent_id",
                format!("parent folder {} does not exist", parent_id),
            )),
            FolderMove::Cycle => Err(TrelayError::validation(
                "parent_id",
                "folder cannot be moved under itself",
            )),
        }
    }

    /// 删除文件夹：链接移出文件夹，子文件夹挂到被删节点的父节点
    pub async fn delete_folder(&self, id: i64) -> Result<bool> {
        let txn = self.db.begin().await.map_err(|e| {
            TrelayError::database_operation(format!("begin transaction failed: {}", e))
        })?;

        let Some(target) = folder::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(false);
        };

        let unfiled = link::Entity::update_many()
            .col_expr(link::Column::FolderId, Expr::value(Option::<i64>::None))
            .col_expr(link::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(link::Column::FolderId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        folder::Entity::update_many()
            .col_expr(folder::Column::ParentId, Expr::value(target.parent_id))
            .filter(folder::Column::ParentId.eq(id))
            .exec(&txn)
            .await?;

        folder::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit()
            .await
            .map_err(|e| TrelayError::database_operation(format!("commit failed: {}", e)))?;

        self.invalidate_count_cache();
        info!("Folder deleted: id={} ({} links unfiled)", id, unfiled);
        Ok(true)
    }
}

enum FolderMove {
    Moved(Folder),
    NotFound,
    MissingParent(i64),
    Cycle,
}

async fn move_in_txn<C: ConnectionTrait>(
    txn: &C,
    id: i64,
    name: Option<&str>,
    parent_id: Option<Option<i64>>,
) -> std::result::Result<FolderMove, DbErr> {
    // 先写一次自身行拿到写锁，SQLite 上并发移动在此串行
    folder::Entity::update_many()
        .col_expr(folder::Column::ParentId, Expr::col(folder::Column::ParentId))
        .filter(folder::Column::Id.eq(id))
        .exec(txn)
        .await?;

    let Some(model) = folder::Entity::find_by_id(id)
        .lock_exclusive()
        .one(txn)
        .await?
    else {
        return Ok(FolderMove::NotFound);
    };

    if let Some(Some(new_parent)) = parent_id {
        let mut visited = HashSet::new();
        let mut current = Some(new_parent);
        while let Some(ancestor) = current {
            // 已有数据若本身成环，visited 防止死循环
            if ancestor == id || !visited.insert(ancestor) {
                debug!("Folder move rejected: {} -> {} would form a cycle", id, new_parent);
                return Ok(FolderMove::Cycle);
            }
            let row = folder::Entity::find_by_id(ancestor)
                .lock_exclusive()
                .one(txn)
                .await?;
            current = match row {
                Some(row) => row.parent_id,
                None if ancestor == new_parent => {
                    return Ok(FolderMove::MissingParent(new_parent));
                }
                None => None,
            };
        }
    }

    let mut am: folder::ActiveModel = model.into();
    if let Some(name) = name {
        am.name = Set(name.to_string());
    }
    if let Some(parent_id) = parent_id {
        am.parent_id = Set(parent_id);
    }
    let model = am.update(txn).await?;
    Ok(FolderMove::Moved(model_to_folder(model)))
}
