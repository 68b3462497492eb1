//! Link lifecycle
//!
//! Active -> SoftDeleted -> (Active | PermanentlyDeleted)，Active 也可直接永久删除。
//! 每次转换都是一条带状态条件的 UPDATE/DELETE，影响行数为 0 即 NotFound。

use std::sync::Arc;

use tracing::info;

use crate::errors::{Result, TrelayError};
use crate::storage::{Link, SeaOrmStorage};
use crate::utils::slug::parse_lookup_slug;
use crate::utils::url_validator::normalize_domain;

pub struct LifecycleManager {
    storage: Arc<SeaOrmStorage>,
}

fn not_found(slug: &str) -> TrelayError {
    TrelayError::not_found(format!("link '{}' not found", slug))
}

impl LifecycleManager {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    /// 按 (slug, domain) 查找未被永久删除的链接，包含软删除状态
    pub async fn find(&self, slug: &str, domain: Option<&str>) -> Result<Link> {
        let Some(normalized) = parse_lookup_slug(slug) else {
            return Err(not_found(slug));
        };
        self.storage
            .get_link_by_slug(&normalized, &normalize_domain(domain))
            .await?
            .ok_or_else(|| not_found(slug))
    }

    /// 删除链接
    ///
    /// 软删除只作用于活跃链接（已软删除视为 NotFound）；
    /// 永久删除对活跃和软删除链接都生效。
    pub async fn delete(&self, slug: &str, domain: Option<&str>, permanent: bool) -> Result<()> {
        let link = self.find(slug, domain).await?;

        let applied = if permanent {
            self.storage.purge_link(link.id).await?
        } else {
            self.storage.soft_delete_link(link.id).await?
        };

        if !applied {
            return Err(not_found(slug));
        }

        info!(
            "Link '{}' {}",
            link.slug,
            if permanent {
                "permanently deleted"
            } else {
                "moved to trash"
            }
        );
        Ok(())
    }

    /// 恢复软删除的链接；活跃或已永久删除时返回 NotFound
    pub async fn restore(&self, slug: &str, domain: Option<&str>) -> Result<Link> {
        let link = self.find(slug, domain).await?;

        if !self.storage.restore_link(link.id).await? {
            return Err(not_found(slug));
        }

        info!("Link '{}' restored", link.slug);
        self.storage
            .get_link_by_id(link.id)
            .await?
            .ok_or_else(|| not_found(slug))
    }

    /// 一次性链接的消费 CAS：并发调用中只有一个返回 true
    pub async fn consume_one_time(&self, link_id: i64) -> Result<bool> {
        self.storage.consume_one_time(link_id).await
    }
}
