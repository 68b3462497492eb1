//! `/api/v1` 响应 envelope 与查询参数

use serde::{Deserialize, Serialize};

/// 统一响应 envelope
///
/// 成功：`{"success":true,"data":...,"meta":...}`，
/// 失败：`{"success":false,"error":{"code","message","field"}}`。
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// 无 data 的成功响应
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            meta: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            meta: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// 分页信息
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// `?domain=` 单独出现的接口共用
#[derive(Deserialize, Debug, Default)]
pub struct DomainQuery {
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DeleteLinkQuery {
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

/// 列表查询；`tags` 逗号分隔，日期接受 RFC3339 或 `YYYY-MM-DD`
#[derive(Deserialize, Debug, Default)]
pub struct ListLinksQuery {
    pub search: Option<String>,
    pub folder_id: Option<i64>,
    pub domain: Option<String>,
    pub tags: Option<String>,
    #[serde(default)]
    pub only_deleted: bool,
    #[serde(default)]
    pub include_deleted: bool,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct BulkDeleteRequest {
    pub slugs: Vec<String>,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct BulkRestoreRequest {
    pub slugs: Vec<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RestoredResponse {
    pub restored: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct StatsQuery {
    pub domain: Option<String>,
    pub export: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct DailyQuery {
    pub domain: Option<String>,
    pub days: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct MonthlyQuery {
    pub domain: Option<String>,
    pub months: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ReferrersQuery {
    pub domain: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Deserialize, Debug)]
pub struct PreviewQuery {
    pub url: String,
}
