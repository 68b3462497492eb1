use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::StaticConfig;
use crate::services::Services;
use crate::storage::SeaOrmStorage;

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub services: Services,
}

/// 准备服务器启动的上下文
/// 包括存储（含迁移）、服务集合和点击刷盘后台任务
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let storage = Arc::new(
        SeaOrmStorage::from_config(&config.database)
            .await
            .context("Failed to create storage backend")?,
    );
    info!("Using storage backend: {:?}", storage.backend());

    let services = Services::new(Arc::clone(&storage), config);

    if services.clicks.is_enabled() {
        let clicks = services.clicks.clone();
        tokio::spawn(async move {
            clicks.start_background_task().await;
        });
        info!(
            "Click recording enabled (flush every {}s, threshold {})",
            config.analytics.flush_interval_secs, config.analytics.max_buffered
        );
    } else {
        info!("Click recording disabled by configuration");
    }

    if config.api.api_key.trim().is_empty() {
        info!("Management API is disabled (api.api_key not set)");
    }

    debug!("Pre-startup completed in {:?}", start_time.elapsed());
    Ok(StartupContext { storage, services })
}
