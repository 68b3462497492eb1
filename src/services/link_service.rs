//! Link management service
//!
//! Validation and normalization of incoming link requests, shared by the
//! HTTP handlers and the tests. Persistence goes through `SeaOrmStorage`;
//! lifecycle transitions are delegated to `LifecycleManager`.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::info;

use crate::errors::{Result, TrelayError};
use crate::services::{LifecycleManager, SlugAllocator};
use crate::storage::{Link, LinkFilter, LinkPatch, NewLink, SeaOrmStorage};
use crate::utils::password::{process_new_password, process_update_password};
use crate::utils::tags::normalize_tags;
use crate::utils::url_validator::{normalize_domain, normalize_url};

/// ttl_hours 上限（10 年）
pub const MAX_TTL_HOURS: i64 = 24 * 365 * 10;

// ============ Request DTOs ============

/// 创建链接请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLinkRequest {
    pub url: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ttl_hours: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    pub is_one_time: Option<bool>,
}

/// 部分更新请求；缺失字段保持不变
///
/// - `password: ""` 移除密码
/// - `ttl_hours <= 0` 清除过期时间
/// - `folder_id: null` 移出文件夹
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLinkRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ttl_hours: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    pub folder_id: Option<Option<i64>>,
    #[serde(default)]
    pub is_one_time: Option<bool>,
}

// ============ LinkService ============

pub struct LinkService {
    storage: Arc<SeaOrmStorage>,
    allocator: Arc<SlugAllocator>,
    lifecycle: Arc<LifecycleManager>,
    self_domains: Vec<String>,
}

impl LinkService {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        allocator: Arc<SlugAllocator>,
        lifecycle: Arc<LifecycleManager>,
        self_domains: Vec<String>,
    ) -> Self {
        Self {
            storage,
            allocator,
            lifecycle,
            self_domains,
        }
    }

    fn expires_from_ttl(ttl_hours: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if ttl_hours > MAX_TTL_HOURS {
            return Err(TrelayError::validation(
                "ttl_hours",
                format!("ttl_hours must be at most {}", MAX_TTL_HOURS),
            ));
        }
        TimeDelta::try_hours(ttl_hours)
            .and_then(|delta| now.checked_add_signed(delta))
            .ok_or_else(|| TrelayError::validation("ttl_hours", "ttl_hours is out of range"))
    }

    async fn ensure_folder_exists(&self, folder_id: i64) -> Result<()> {
        match self.storage.get_folder(folder_id).await? {
            Some(_) => Ok(()),
            None => Err(TrelayError::validation(
                "folder_id",
                format!("folder {} does not exist", folder_id),
            )),
        }
    }

    /// 创建短链接
    pub async fn create_link(&self, req: CreateLinkRequest) -> Result<Link> {
        let original_url = normalize_url(&req.url, &self.self_domains)?;
        let password_hash = process_new_password(req.password.as_deref())?;
        let tags = normalize_tags(req.tags.as_deref().unwrap_or_default())?;

        let expires_at = match req.ttl_hours {
            Some(hours) if hours > 0 => Some(Self::expires_from_ttl(hours, Utc::now())?),
            _ => None,
        };

        if let Some(folder_id) = req.folder_id {
            self.ensure_folder_exists(folder_id).await?;
        }

        let draft = NewLink {
            slug: String::new(),
            domain: normalize_domain(req.domain.as_deref()),
            original_url,
            password_hash,
            is_one_time: req.is_one_time.unwrap_or(false),
            expires_at,
            tags,
            folder_id: req.folder_id,
        };

        let link = self.allocator.allocate(req.slug.as_deref(), draft).await?;
        info!(
            "LinkService: created link '{}' -> '{}'",
            link.slug, link.original_url
        );
        Ok(link)
    }

    /// 获取活跃链接；软删除的链接视为不存在
    pub async fn get_link(&self, slug: &str, domain: Option<&str>) -> Result<Link> {
        let link = self.lifecycle.find(slug, domain).await?;
        if link.is_deleted() {
            return Err(TrelayError::not_found(format!("link '{}' not found", slug)));
        }
        Ok(link)
    }

    /// 部分更新活跃链接
    pub async fn update_link(
        &self,
        slug: &str,
        domain: Option<&str>,
        req: UpdateLinkRequest,
    ) -> Result<Link> {
        let existing = self.get_link(slug, domain).await?;

        let mut patch = LinkPatch::default();

        if let Some(ref url) = req.url {
            patch.original_url = Some(normalize_url(url, &self.self_domains)?);
        }

        if req.password.is_some() {
            patch.password_hash = Some(process_update_password(
                req.password.as_deref(),
                existing.password_hash.clone(),
            )?);
        }

        if let Some(hours) = req.ttl_hours {
            patch.expires_at = Some(if hours > 0 {
                Some(Self::expires_from_ttl(hours, Utc::now())?)
            } else {
                None
            });
        }

        if let Some(ref tags) = req.tags {
            patch.tags = Some(normalize_tags(tags)?);
        }

        if let Some(folder_id) = req.folder_id {
            if let Some(id) = folder_id {
                self.ensure_folder_exists(id).await?;
            }
            patch.folder_id = Some(folder_id);
        }

        patch.is_one_time = req.is_one_time;

        let updated = self
            .storage
            .update_link(existing.id, &patch)
            .await?
            .ok_or_else(|| TrelayError::not_found(format!("link '{}' not found", slug)))?;

        info!("LinkService: updated '{}'", updated.slug);
        Ok(updated)
    }

    /// 过滤列表与总数（分页 meta 用）
    pub async fn list_links(&self, filter: &LinkFilter) -> Result<(Vec<Link>, u64)> {
        let mut filter = filter.clone();
        filter.limit = LinkFilter::clamp_limit(Some(filter.limit));
        if let Some(ref domain) = filter.domain {
            filter.domain = Some(normalize_domain(Some(domain)));
        }

        let links = self.storage.list_links(&filter).await?;
        let total = self.storage.count_links(&filter).await?;
        Ok((links, total))
    }

    pub async fn delete_link(&self, slug: &str, domain: Option<&str>, permanent: bool) -> Result<()> {
        self.lifecycle.delete(slug, domain, permanent).await
    }

    pub async fn restore_link(&self, slug: &str, domain: Option<&str>) -> Result<Link> {
        self.lifecycle.restore(slug, domain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_folder() {
        let absent: UpdateLinkRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.folder_id, None);

        let cleared: UpdateLinkRequest = serde_json::from_str(r#"{"folder_id":null}"#).unwrap();
        assert_eq!(cleared.folder_id, Some(None));

        let moved: UpdateLinkRequest = serde_json::from_str(r#"{"folder_id":4}"#).unwrap();
        assert_eq!(moved.folder_id, Some(Some(4)));
    }

    #[test]
    fn test_expires_from_ttl() {
        let now = Utc::now();
        let exp = LinkService::expires_from_ttl(2, now).unwrap();
        assert_eq!(exp - now, TimeDelta::hours(2));

        let err = LinkService::expires_from_ttl(MAX_TTL_HOURS + 1, now).unwrap_err();
        assert_eq!(err.field(), Some("ttl_hours"));
    }
}
