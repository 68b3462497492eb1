//! 链接预览

use std::sync::Arc;

use actix_web::{HttpResponse, web};
use tracing::trace;

use crate::services::PreviewService;

use super::helpers::success_response;
use super::types::PreviewQuery;

/// GET /preview?url=
///
/// 抓取失败也返回 200，data 只含 `fetched_at`
pub async fn get_preview(
    query: web::Query<PreviewQuery>,
    preview: web::Data<Arc<PreviewService>>,
) -> HttpResponse {
    trace!("API: preview requested");
    success_response(preview.fetch(&query.url).await)
}
