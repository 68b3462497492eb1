//! Query operations for SeaOrmStorage
//!
//! Read-only link lookups and filtered listing.

use sea_orm::sea_query::{Expr, LikeExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tracing::debug;

use super::converters::model_to_link;
use super::{SeaOrmStorage, retry};
use crate::errors::{Result, TrelayError};
use crate::storage::{Link, LinkFilter};

use migration::entities::link;

const LIKE_ESCAPE: char = '\\';

/// 转义 LIKE 通配符，使输入按字面子串匹配
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// 字面子串匹配：`column LIKE '%needle%' ESCAPE '\'`
fn contains_literal(column: link::Column, needle: &str) -> Condition {
    use sea_orm::ExprTrait;

    let pattern = format!("%{}%", escape_like(needle));
    Condition::all().add(Expr::col(column).like(LikeExpr::new(pattern).escape(LIKE_ESCAPE)))
}

/// tags 列存的是 JSON 数组文本，按编码后的 `"tag"` 匹配整个元素
fn tag_needle(tag: &str) -> String {
    serde_json::to_string(tag).unwrap_or_else(|_| format!("\"{}\"", tag))
}

/// 构建列表过滤条件
///
/// 永久删除的记录已物理移除，这里只区分活跃与软删除。
fn build_condition(filter: &LinkFilter) -> Condition {
    let mut condition = Condition::all();

    if filter.only_deleted {
        condition = condition.add(link::Column::DeletedAt.is_not_null());
    } else if !filter.include_deleted {
        condition = condition.add(link::Column::DeletedAt.is_null());
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(contains_literal(link::Column::Slug, search))
                .add(contains_literal(link::Column::OriginalUrl, search))
                .add(contains_literal(link::Column::Tags, search)),
        );
    }

    if let Some(folder_id) = filter.folder_id {
        condition = condition.add(link::Column::FolderId.eq(folder_id));
    }

    if let Some(ref domain) = filter.domain {
        condition = condition.add(link::Column::Domain.eq(domain.as_str()));
    }

    for tag in &filter.tags {
        condition = condition.add(contains_literal(link::Column::Tags, &tag_needle(tag)));
    }

    if let Some(after) = filter.created_after {
        condition = condition.add(link::Column::CreatedAt.gte(after));
    }

    if let Some(before) = filter.created_before {
        condition = condition.add(link::Column::CreatedAt.lte(before));
    }

    condition
}

fn count_cache_key(filter: &LinkFilter) -> String {
    format!(
        "count:s={:?}:f={:?}:d={:?}:t={:?}:od={}:id={}:a={:?}:b={:?}",
        filter.search,
        filter.folder_id,
        filter.domain,
        filter.tags,
        filter.only_deleted,
        filter.include_deleted,
        filter.created_after.map(|d| d.timestamp_micros()),
        filter.created_before.map(|d| d.timestamp_micros()),
    )
}

impl SeaOrmStorage {
    /// 按 id 查询，包含软删除的链接
    pub async fn get_link_by_id(&self, id: i64) -> Result<Option<Link>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_link_by_id({})", id),
            self.retry_config,
            || async { link::Entity::find_by_id(id).one(db).await },
        )
        .await?;
        Ok(model.map(model_to_link))
    }

    /// 按 (slug, domain) 查询，包含软删除的链接
    pub async fn get_link_by_slug(&self, slug: &str, domain: &str) -> Result<Option<Link>> {
        let db = &self.db;
        let model = retry::with_retry(
            &format!("get_link_by_slug({})", slug),
            self.retry_config,
            || async {
                link::Entity::find()
                    .filter(link::Column::Slug.eq(slug))
                    .filter(link::Column::Domain.eq(domain))
                    .one(db)
                    .await
            },
        )
        .await?;
        Ok(model.map(model_to_link))
    }

    /// 过滤后的链接列表（created_at 倒序，id 倒序）
    pub async fn list_links(&self, filter: &LinkFilter) -> Result<Vec<Link>> {
        let db = &self.db;
        let condition = build_condition(filter);
        let limit = LinkFilter::clamp_limit(Some(filter.limit));

        let models = retry::with_retry("list_links", self.retry_config, || async {
            link::Entity::find()
                .filter(condition.clone())
                .order_by_desc(link::Column::CreatedAt)
                .order_by_desc(link::Column::Id)
                .offset(filter.offset)
                .limit(limit)
                .all(db)
                .await
        })
        .await
        .map_err(|e| TrelayError::database_operation(format!("list links failed: {}", e)))?;

        Ok(models.into_iter().map(model_to_link).collect())
    }

    /// 过滤条件下的总数（带 COUNT 缓存，写操作时失效）
    pub async fn count_links(&self, filter: &LinkFilter) -> Result<u64> {
        let cache_key = count_cache_key(filter);
        if let Some(cached) = self.count_cache.get(&cache_key) {
            debug!("count cache hit: key={}, value={}", cache_key, cached);
            return Ok(cached);
        }

        let generation = self.count_cache.generation();
        let db = &self.db;
        let condition = build_condition(filter);
        let count = retry::with_retry("count_links", self.retry_config, || async {
            link::Entity::find()
                .filter(condition.clone())
                .count(db)
                .await
        })
        .await
        .map_err(|e| TrelayError::database_operation(format!("count links failed: {}", e)))?;

        self.count_cache.store(cache_key, count, generation);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_tag_needle_matches_stored_encoding() {
        assert_eq!(tag_needle("abc"), "\"abc\"");
        // 与 JSON 数组中的转义形式一致
        assert_eq!(tag_needle("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
