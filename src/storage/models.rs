use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 短链接
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub slug: String,
    pub original_url: String,
    /// None 表示默认域名
    pub domain: Option<String>,
    #[serde(skip)]
    pub password_hash: Option<String>,
    pub has_password: bool,
    pub is_one_time: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub folder_id: Option<i64>,
    pub click_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Link {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// 待插入的链接（slug 已规范化、URL 已校验、密码已哈希）
#[derive(Debug, Clone)]
pub struct NewLink {
    pub slug: String,
    pub domain: String,
    pub original_url: String,
    pub password_hash: Option<String>,
    pub is_one_time: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub folder_id: Option<i64>,
}

/// 部分更新；外层 None 表示字段不变
#[derive(Debug, Clone, Default)]
pub struct LinkPatch {
    pub original_url: Option<String>,
    pub password_hash: Option<Option<String>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub folder_id: Option<Option<i64>>,
    pub is_one_time: Option<bool>,
}

/// 文件夹
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// 链接过滤条件
#[derive(Default, Clone, Debug)]
pub struct LinkFilter {
    /// 模糊搜索 slug、original_url、tags
    pub search: Option<String>,
    pub folder_id: Option<i64>,
    /// Some("") 表示仅默认域名
    pub domain: Option<String>,
    /// 必须全部包含
    pub tags: Vec<String>,
    /// 只返回软删除的链接
    pub only_deleted: bool,
    /// 同时返回软删除的链接
    pub include_deleted: bool,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: u64,
    pub offset: u64,
}

impl LinkFilter {
    pub const DEFAULT_LIMIT: u64 = 50;
    pub const MAX_LIMIT: u64 = 200;

    /// 限制 limit 到 [1, MAX_LIMIT]，0 取默认值
    pub fn clamp_limit(limit: Option<u64>) -> u64 {
        match limit {
            None | Some(0) => Self::DEFAULT_LIMIT,
            Some(l) => l.min(Self::MAX_LIMIT),
        }
    }
}

/// 按标签（日期、来源、设备）聚合的点击数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyClicks {
    pub date: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyClicks {
    pub month: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerClicks {
    pub referrer: String,
    pub clicks: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceClicks {
    pub device_type: String,
    pub clicks: u64,
}

/// 单链接统计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickStats {
    pub total_clicks: u64,
    pub clicks_by_day: Vec<DailyClicks>,
    pub clicks_by_month: Vec<MonthlyClicks>,
    pub top_referrers: Vec<ReferrerClicks>,
    pub device_stats: Vec<DeviceClicks>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(LinkFilter::clamp_limit(None), 50);
        assert_eq!(LinkFilter::clamp_limit(Some(0)), 50);
        assert_eq!(LinkFilter::clamp_limit(Some(10)), 10);
        assert_eq!(LinkFilter::clamp_limit(Some(1000)), 200);
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let now = Utc::now();
        let link = Link {
            id: 1,
            slug: "abcd".into(),
            original_url: "https://example.com/".into(),
            domain: None,
            password_hash: Some("$argon2id$secret".into()),
            has_password: true,
            is_one_time: false,
            expires_at: None,
            tags: vec![],
            folder_id: None,
            click_count: 0,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let json = serde_json::to_value(&link).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["has_password"], true);
    }
}
