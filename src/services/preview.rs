//! Link preview (Open Graph metadata)
//!
//! 同步 ureq 请求放在 spawn_blocking 中执行，结果进 moka 缓存。
//! 任何失败都退化为只带 `fetched_at` 的空对象，不影响调用方。

use std::sync::LazyLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, trace, warn};
use ureq::Agent;
use url::Url;

use crate::config::PreviewConfig;
use crate::utils::url_validator::normalize_url;

const PREVIEW_CACHE_MAX_CAPACITY: u64 = 1_000;
const MAX_TITLE_CHARS: usize = 300;
const MAX_DESCRIPTION_CHARS: usize = 1_000;
const USER_AGENT: &str = concat!("trelay-preview/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkPreview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl LinkPreview {
    pub fn empty() -> Self {
        Self {
            fetched_at: Utc::now(),
            ..Default::default()
        }
    }
}

static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<meta\s+[^>]*>"#).expect("valid meta regex"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z:_-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attribute regex")
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<title[^>]*>(.*?)</title>"#).expect("valid title regex"));

fn decode_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// 去实体、折叠空白、截断；空串返回 None
fn clean_text(raw: &str, max_chars: usize) -> Option<String> {
    let decoded = decode_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(max_chars).collect())
}

/// 解析 HTML 中的 og:/twitter:/name 元数据，`<title>` 兜底
pub fn parse_preview_html(html: &str, base: &Url) -> LinkPreview {
    let mut title = None;
    let mut og_title = None;
    let mut description = None;
    let mut og_description = None;
    let mut image = None;

    for tag in META_TAG_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for cap in ATTR_RE.captures_iter(tag.as_str()) {
            let name = cap[1].to_ascii_lowercase();
            let value = cap.get(2).or_else(|| cap.get(3)).map(|m| m.as_str());
            match name.as_str() {
                "property" | "name" => key = value.map(str::to_ascii_lowercase),
                "content" => content = value,
                _ => {}
            }
        }

        let (Some(key), Some(content)) = (key, content) else {
            continue;
        };
        match key.as_str() {
            "og:title" | "twitter:title" if og_title.is_none() => {
                og_title = clean_text(content, MAX_TITLE_CHARS)
            }
            "og:description" | "twitter:description" if og_description.is_none() => {
                og_description = clean_text(content, MAX_DESCRIPTION_CHARS)
            }
            "description" if description.is_none() => {
                description = clean_text(content, MAX_DESCRIPTION_CHARS)
            }
            "og:image" | "og:image:url" | "twitter:image" if image.is_none() => {
                image = base
                    .join(decode_entities(content.trim()).as_str())
                    .ok()
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .map(|u| u.to_string());
            }
            _ => {}
        }
    }

    if og_title.is_none()
        && let Some(cap) = TITLE_RE.captures(html)
    {
        title = clean_text(&cap[1], MAX_TITLE_CHARS);
    }

    LinkPreview {
        title: og_title.or(title),
        description: og_description.or(description),
        image_url: image,
        fetched_at: Utc::now(),
    }
}

pub struct PreviewService {
    config: PreviewConfig,
    self_domains: Vec<String>,
    agent: Agent,
    cache: Cache<String, LinkPreview>,
}

impl PreviewService {
    pub fn new(config: &PreviewConfig, self_domains: Vec<String>) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .max_redirects(config.max_redirects)
            .build()
            .into();

        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.cache_ttl_secs.max(1)))
            .max_capacity(PREVIEW_CACHE_MAX_CAPACITY)
            .build();

        Self {
            config: config.clone(),
            self_domains,
            agent,
            cache,
        }
    }

    fn fetch_sync(agent: Agent, url: Url, max_body_bytes: u64) -> LinkPreview {
        let mut resp = match agent.get(url.as_str()).header("User-Agent", USER_AGENT).call() {
            Ok(r) => r,
            Err(e) => {
                debug!("Preview request to \"{}\" failed: {}", url, e);
                return LinkPreview::empty();
            }
        };

        let is_html = resp
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.to_ascii_lowercase().contains("html"));
        if !is_html {
            trace!("Preview of \"{}\" skipped: not HTML", url);
            return LinkPreview::empty();
        }

        let body = match resp
            .body_mut()
            .with_config()
            .limit(max_body_bytes)
            .read_to_string()
        {
            Ok(b) => b,
            Err(e) => {
                debug!("Preview body of \"{}\" unreadable: {}", url, e);
                return LinkPreview::empty();
            }
        };

        parse_preview_html(&body, &url)
    }

    /// 获取预览；URL 非法、功能关闭或抓取失败时返回空对象
    pub async fn fetch(&self, raw_url: &str) -> LinkPreview {
        if !self.config.enabled {
            return LinkPreview::empty();
        }

        let url = match normalize_url(raw_url, &self.self_domains)
            .ok()
            .and_then(|u| Url::parse(&u).ok())
        {
            Some(url) => url,
            None => {
                trace!("Preview skipped for invalid url");
                return LinkPreview::empty();
            }
        };

        let key = url.to_string();
        let agent = self.agent.clone();
        let max_body_bytes = self.config.max_body_bytes;

        self.cache
            .get_with(key, async move {
                tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url, max_body_bytes))
                    .await
                    .unwrap_or_else(|e| {
                        warn!("Preview spawn_blocking failed: {}", e);
                        LinkPreview::empty()
                    })
            })
            .await
    }
}
