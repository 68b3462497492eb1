//! 点击采集
//!
//! 重定向热路径只把 `ClickEvent` 放进内存缓冲，由 `ClickManager`
//! 批量刷入 `ClickSink`。

pub mod manager;
pub mod sink;

pub use manager::ClickManager;
pub use sink::ClickSink;

use chrono::{DateTime, Utc};
use woothee::parser::Parser;

/// 来源为空时的统一取值
pub const DIRECT_REFERRER: &str = "direct";
pub const MAX_REFERRER_LENGTH: usize = 500;

/// 单次点击事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub link_id: i64,
    /// 事件发生时间（分桶依据，与到达顺序无关）
    pub clicked_at: DateTime<Utc>,
    pub referrer: String,
    pub ip_hash: Option<String>,
    pub device_type: String,
}

impl ClickEvent {
    pub fn new(link_id: i64, clicked_at: DateTime<Utc>) -> Self {
        Self {
            link_id,
            clicked_at,
            referrer: DIRECT_REFERRER.to_string(),
            ip_hash: None,
            device_type: "misc".to_string(),
        }
    }

    pub fn with_referrer(mut self, referrer: Option<&str>) -> Self {
        self.referrer = normalize_referrer(referrer);
        self
    }

    pub fn with_user_agent(mut self, user_agent: Option<&str>) -> Self {
        self.device_type = classify_device(user_agent);
        self
    }

    pub fn with_ip_hash(mut self, ip_hash: Option<String>) -> Self {
        self.ip_hash = ip_hash;
        self
    }
}

/// 规范化 Referer：空值为 `direct`，去掉 query 和 fragment，截断到 500 字符
pub fn normalize_referrer(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DIRECT_REFERRER.to_string();
    };

    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let stripped = raw[..end].trim();
    if stripped.is_empty() {
        return DIRECT_REFERRER.to_string();
    }

    stripped.chars().take(MAX_REFERRER_LENGTH).collect()
}

/// 按 User-Agent 归类设备：pc / smartphone / mobilephone / appliance / crawler / misc
pub fn classify_device(user_agent: Option<&str>) -> String {
    let Some(ua) = user_agent.map(str::trim).filter(|s| !s.is_empty()) else {
        return "misc".to_string();
    };

    match Parser::new().parse(ua) {
        Some(result) => match result.category {
            "pc" | "smartphone" | "mobilephone" | "appliance" | "crawler" => {
                result.category.to_string()
            }
            _ => "misc".to_string(),
        },
        None => "misc".to_string(),
    }
}

const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "curl/",
    "wget/",
    "python-requests",
    "httpclient",
    "headless",
    "preview",
    "facebookexternalhit",
    "embedly",
];

/// 爬虫识别：woothee 判定为 crawler 或命中常见关键字
///
/// 没有 User-Agent 的请求不算爬虫。
pub fn is_bot(user_agent: Option<&str>) -> bool {
    let Some(ua) = user_agent.map(str::trim).filter(|s| !s.is_empty()) else {
        return false;
    };

    if matches!(Parser::new().parse(ua), Some(r) if r.category == "crawler") {
        return true;
    }

    let lower = ua.to_ascii_lowercase();
    BOT_MARKERS.iter().any(|marker| lower.contains(marker))
}
