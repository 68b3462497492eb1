//! 单链接点击统计与导出

use std::sync::Arc;

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::{debug, trace};

use crate::services::{AnalyticsService, ExportFormat};

use super::helpers::success_response;
use super::types::{DailyQuery, MonthlyQuery, ReferrersQuery, StatsQuery};

fn attachment(filename: String) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename)],
    }
}

/// GET /stats/{slug}
///
/// 带 `?export=csv|json` 时以附件形式返回
pub async fn get_stats(
    path: web::Path<String>,
    query: web::Query<StatsQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<HttpResponse> {
    let slug = path.into_inner();
    let format = query
        .export
        .as_deref()
        .map(ExportFormat::parse)
        .transpose()?;

    let link = analytics.find_link(&slug, query.domain.as_deref()).await?;
    let stats = analytics.stats(&link).await?;
    trace!(
        "API: stats for '{}': {} total clicks",
        link.slug, stats.total_clicks
    );

    let Some(format) = format else {
        return Ok(success_response(stats));
    };

    let body = AnalyticsService::export(&stats, format)?;
    debug!("API: exporting stats for '{}' as {:?}", link.slug, format);
    Ok(HttpResponse::Ok()
        .content_type(format.content_type())
        .insert_header(attachment(format!(
            "{}-stats.{}",
            link.slug,
            format.extension()
        )))
        .body(body))
}

/// GET /stats/{slug}/daily?days=
pub async fn get_daily(
    path: web::Path<String>,
    query: web::Query<DailyQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<HttpResponse> {
    let link = analytics
        .find_link(&path.into_inner(), query.domain.as_deref())
        .await?;
    let rows = analytics.aggregate_daily(link.id, query.days).await?;
    Ok(success_response(rows))
}

/// GET /stats/{slug}/monthly?months=
pub async fn get_monthly(
    path: web::Path<String>,
    query: web::Query<MonthlyQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<HttpResponse> {
    let link = analytics
        .find_link(&path.into_inner(), query.domain.as_deref())
        .await?;
    let rows = analytics.aggregate_monthly(link.id, query.months).await?;
    Ok(success_response(rows))
}

/// GET /stats/{slug}/referrers?limit=
pub async fn get_referrers(
    path: web::Path<String>,
    query: web::Query<ReferrersQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<HttpResponse> {
    let link = analytics
        .find_link(&path.into_inner(), query.domain.as_deref())
        .await?;
    let rows = analytics.aggregate_referrers(link.id, query.limit).await?;
    Ok(success_response(rows))
}

/// GET /stats/{slug}/devices
pub async fn get_devices(
    path: web::Path<String>,
    query: web::Query<super::types::DomainQuery>,
    analytics: web::Data<Arc<AnalyticsService>>,
) -> ActixResult<HttpResponse> {
    let link = analytics
        .find_link(&path.into_inner(), query.domain.as_deref())
        .await?;
    let rows = analytics.device_breakdown(link.id).await?;
    Ok(success_response(rows))
}
