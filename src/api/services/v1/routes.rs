//! `/api/v1` 路由配置

use actix_web::web;

use super::bulk::{bulk_delete_links, bulk_restore_links};
use super::folders::{create_folder, delete_folder, get_folder, list_folders, update_folder};
use super::links::{create_link, delete_link, get_link, list_links, restore_link, update_link};
use super::preview::get_preview;
use super::stats::{get_daily, get_devices, get_monthly, get_referrers, get_stats};

/// 链接路由 `/links`
///
/// `/links/restore` 必须在 `/links/{slug}` 之前注册
pub fn links_routes() -> actix_web::Scope {
    web::scope("/links")
        .route("", web::get().to(list_links))
        .route("", web::post().to(create_link))
        .route("", web::delete().to(bulk_delete_links))
        .route("/restore", web::post().to(bulk_restore_links))
        .route("/{slug}/restore", web::post().to(restore_link))
        .route("/{slug}", web::get().to(get_link))
        .route("/{slug}", web::patch().to(update_link))
        .route("/{slug}", web::delete().to(delete_link))
}

/// 文件夹路由 `/folders`
pub fn folders_routes() -> actix_web::Scope {
    web::scope("/folders")
        .route("", web::get().to(list_folders))
        .route("", web::post().to(create_folder))
        .route("/{id}", web::get().to(get_folder))
        .route("/{id}", web::patch().to(update_folder))
        .route("/{id}", web::delete().to(delete_folder))
}

/// 统计路由 `/stats`
pub fn stats_routes() -> actix_web::Scope {
    web::scope("/stats")
        .route("/{slug}/daily", web::get().to(get_daily))
        .route("/{slug}/monthly", web::get().to(get_monthly))
        .route("/{slug}/referrers", web::get().to(get_referrers))
        .route("/{slug}/devices", web::get().to(get_devices))
        .route("/{slug}", web::get().to(get_stats))
}

/// 注册 `/api/v1` 下的全部路由（鉴权与限流由调用方包裹）
pub fn configure_v1(cfg: &mut web::ServiceConfig) {
    cfg.service(links_routes())
        .service(folders_routes())
        .service(stats_routes())
        .route("/preview", web::get().to(get_preview));
}
