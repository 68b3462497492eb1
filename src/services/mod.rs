//! Service layer for business logic
//!
//! Every service holds an `Arc<SeaOrmStorage>` and is shared between the
//! HTTP handlers (as `web::Data`) and the integration tests.

mod analytics_service;
mod bulk;
mod folder_service;
mod lifecycle;
mod link_service;
mod preview;
mod redirect;
mod slug_allocator;

pub use analytics_service::*;
pub use bulk::*;
pub use folder_service::*;
pub use lifecycle::LifecycleManager;
pub use link_service::*;
pub use preview::{LinkPreview, PreviewService, parse_preview_html};
pub use redirect::{RedirectDecision, RedirectResolver, RequestMeta};
pub use slug_allocator::SlugAllocator;

use std::sync::Arc;

use crate::analytics::ClickManager;
use crate::config::StaticConfig;
use crate::storage::SeaOrmStorage;

/// 服务集合，启动时构建一次
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<SeaOrmStorage>,
    pub clicks: ClickManager,
    pub links: Arc<LinkService>,
    pub lifecycle: Arc<LifecycleManager>,
    pub bulk: Arc<BulkCoordinator>,
    pub redirect: Arc<RedirectResolver>,
    pub analytics: Arc<AnalyticsService>,
    pub folders: Arc<FolderService>,
    pub preview: Arc<PreviewService>,
}

impl Services {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &StaticConfig) -> Self {
        let clicks = ClickManager::new(storage.as_click_sink(), &config.analytics);
        Self::with_click_manager(storage, clicks, config)
    }

    /// 使用外部构建的 ClickManager（测试可替换退避参数）
    pub fn with_click_manager(
        storage: Arc<SeaOrmStorage>,
        clicks: ClickManager,
        config: &StaticConfig,
    ) -> Self {
        let self_domains = config.server.self_domains.clone();

        let lifecycle = Arc::new(LifecycleManager::new(Arc::clone(&storage)));
        let allocator = Arc::new(SlugAllocator::new(Arc::clone(&storage), &config.slug));
        let links = Arc::new(LinkService::new(
            Arc::clone(&storage),
            allocator,
            Arc::clone(&lifecycle),
            self_domains.clone(),
        ));
        let bulk = Arc::new(BulkCoordinator::new(Arc::clone(&lifecycle)));
        let redirect = Arc::new(RedirectResolver::new(
            Arc::clone(&storage),
            Arc::clone(&lifecycle),
            clicks.clone(),
            config.analytics.anonymize_ip,
        ));
        let analytics = Arc::new(AnalyticsService::new(
            Arc::clone(&storage),
            Arc::clone(&lifecycle),
        ));
        let folders = Arc::new(FolderService::new(Arc::clone(&storage)));
        let preview = Arc::new(PreviewService::new(&config.preview, self_domains));

        Self {
            storage,
            clicks,
            links,
            lifecycle,
            bulk,
            redirect,
            analytics,
            folders,
            preview,
        }
    }
}
