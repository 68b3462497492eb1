//! Redirect resolution
//!
//! 判定顺序：NotFound > Expired > PasswordRequired > PasswordInvalid > Allow。
//! 一次性链接在 Allow 前先跑消费 CAS，输掉竞争的请求得到 NotFound。

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, trace};

use crate::analytics::{ClickEvent, ClickManager, is_bot};
use crate::errors::{Result, TrelayError};
use crate::services::LifecycleManager;
use crate::storage::{Link, SeaOrmStorage};
use crate::utils::ip::fingerprint_ip;
use crate::utils::password::verify_password;
use crate::utils::slug::parse_lookup_slug;
use crate::utils::url_validator::normalize_domain;

/// 解析结果：拒绝原因是值，不是错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectDecision {
    Allow(String),
    NotFound,
    Expired,
    PasswordRequired,
    PasswordInvalid,
}

impl RedirectDecision {
    /// 拒绝原因对应的 API 错误；Allow 返回 None
    pub fn denial(&self) -> Option<TrelayError> {
        match self {
            Self::Allow(_) => None,
            Self::NotFound => Some(TrelayError::not_found("link not found")),
            Self::Expired => Some(TrelayError::expired("link has expired")),
            Self::PasswordRequired => Some(TrelayError::password_required(
                "this link is password protected",
            )),
            Self::PasswordInvalid => Some(TrelayError::password_invalid("incorrect password")),
        }
    }
}

/// 点击记录需要的请求信息
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<IpAddr>,
}

pub struct RedirectResolver {
    storage: Arc<SeaOrmStorage>,
    lifecycle: Arc<LifecycleManager>,
    clicks: ClickManager,
    anonymize_ip: bool,
}

impl RedirectResolver {
    pub fn new(
        storage: Arc<SeaOrmStorage>,
        lifecycle: Arc<LifecycleManager>,
        clicks: ClickManager,
        anonymize_ip: bool,
    ) -> Self {
        Self {
            storage,
            lifecycle,
            clicks,
            anonymize_ip,
        }
    }

    /// 先按请求域名查找，找不到再回落到默认域名
    async fn lookup(&self, slug: &str, domain: Option<&str>) -> Result<Option<Link>> {
        let domain = normalize_domain(domain);
        if !domain.is_empty()
            && let Some(link) = self.storage.get_link_by_slug(slug, &domain).await?
        {
            return Ok(Some(link));
        }
        self.storage.get_link_by_slug(slug, "").await
    }

    pub async fn resolve(
        &self,
        slug: &str,
        domain: Option<&str>,
        password: Option<&str>,
        meta: &RequestMeta,
    ) -> Result<RedirectDecision> {
        let Some(slug) = parse_lookup_slug(slug) else {
            trace!("Redirect: invalid slug syntax");
            return Ok(RedirectDecision::NotFound);
        };

        let link = match self.lookup(&slug, domain).await? {
            Some(link) if !link.is_deleted() => link,
            _ => {
                debug!("Redirect: '{}' not found", slug);
                return Ok(RedirectDecision::NotFound);
            }
        };

        let now = Utc::now();
        if link.is_expired_at(now) {
            debug!("Redirect: '{}' expired", slug);
            return Ok(RedirectDecision::Expired);
        }

        if let Some(ref hash) = link.password_hash {
            match password.filter(|p| !p.is_empty()) {
                None => return Ok(RedirectDecision::PasswordRequired),
                Some(p) if !verify_password(p, hash) => {
                    debug!("Redirect: wrong password for '{}'", slug);
                    return Ok(RedirectDecision::PasswordInvalid);
                }
                Some(_) => {}
            }
        }

        if link.is_one_time && !self.lifecycle.consume_one_time(link.id).await? {
            debug!("Redirect: one-time link '{}' already consumed", slug);
            return Ok(RedirectDecision::NotFound);
        }

        self.record_click(&link, meta);
        Ok(RedirectDecision::Allow(link.original_url))
    }

    fn record_click(&self, link: &Link, meta: &RequestMeta) {
        if is_bot(meta.user_agent.as_deref()) {
            trace!("Redirect: bot request, click not recorded");
            return;
        }

        let event = ClickEvent::new(link.id, Utc::now())
            .with_referrer(meta.referrer.as_deref())
            .with_user_agent(meta.user_agent.as_deref())
            .with_ip_hash(
                meta.client_ip
                    .map(|ip| fingerprint_ip(ip, self.anonymize_ip)),
            );
        self.clicks.record(event);
    }
}
