//! HTTP layer
//!
//! - `/api/v1/*`：API key 鉴权 + 限流的管理接口，统一 JSON envelope
//! - `/healthz`、`/readyz`：探针
//! - `/{slug}`：公开重定向

pub mod middleware;
pub mod services;

use actix_web::middleware::Condition;
use actix_web::web;

use crate::config::ApiConfig;
use crate::services::Services;

use middleware::{ApiKeyAuth, api_rate_limiter};
use services::v1::{configure_v1, json_error_handler, query_error_handler};
use services::{AppStartTime, RedirectService, health_routes, redirect_routes};

/// JSON body 上限
pub const JSON_PAYLOAD_LIMIT: usize = 1024 * 1024;

/// 注册 app_data 与全部路由
///
/// 服务器与 HTTP 集成测试共用同一份配置。
pub fn configure_app(cfg: &mut web::ServiceConfig, services: &Services, api: &ApiConfig) {
    let rate_limited = api.rate_limit_per_second > 0;

    cfg.app_data(web::Data::new(services.storage.clone()))
        .app_data(web::Data::new(services.links.clone()))
        .app_data(web::Data::new(services.bulk.clone()))
        .app_data(web::Data::new(services.folders.clone()))
        .app_data(web::Data::new(services.analytics.clone()))
        .app_data(web::Data::new(services.preview.clone()))
        .app_data(web::Data::new(services.redirect.clone()))
        .app_data(web::Data::new(AppStartTime::default()))
        .app_data(
            web::JsonConfig::default()
                .limit(JSON_PAYLOAD_LIMIT)
                .error_handler(json_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .configure(health_routes)
        .service(
            web::scope("/api/v1")
                .wrap(ApiKeyAuth::new(api.api_key.clone()))
                // 最后 wrap 的最先执行：先限流再鉴权
                .wrap(Condition::new(rate_limited, api_rate_limiter(api)))
                .configure(configure_v1),
        )
        .configure(redirect_routes)
        .default_service(web::to(RedirectService::not_found));
}
