//! Shared setup for integration tests
//!
//! Every test gets its own SQLite file inside a `TempDir`, so tests can run
//! in parallel without sharing state.

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;

use trelay::analytics::ClickManager;
use trelay::config::StaticConfig;
use trelay::services::{CreateLinkRequest, Services};
use trelay::storage::{Link, SeaOrmStorage};

pub const TEST_API_KEY: &str = "test-api-key";

pub struct TestEnv {
    // 保持临时目录存活
    _dir: TempDir,
    pub config: StaticConfig,
    pub storage: Arc<SeaOrmStorage>,
    pub services: Services,
}

/// 点击只在显式 flush 时落库
pub fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.api.api_key = TEST_API_KEY.to_string();
    config.api.rate_limit_per_second = 1000;
    config.api.rate_limit_burst = 1000;
    config.analytics.flush_interval_secs = 3600;
    config.analytics.max_buffered = 100_000;
    config.preview.enabled = false;
    config
}

pub async fn setup() -> TestEnv {
    setup_with(test_config()).await
}

pub async fn setup_with(config: StaticConfig) -> TestEnv {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("trelay_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = Arc::new(
        SeaOrmStorage::connect(&db_url)
            .await
            .expect("Failed to create storage"),
    );
    let clicks =
        ClickManager::new(storage.as_click_sink(), &config.analytics).with_retry_delay(1, 5);
    let services = Services::with_click_manager(Arc::clone(&storage), clicks, &config);

    TestEnv {
        _dir: dir,
        config,
        storage,
        services,
    }
}

pub fn create_request(url: &str, slug: Option<&str>) -> CreateLinkRequest {
    CreateLinkRequest {
        url: url.to_string(),
        slug: slug.map(str::to_string),
        ..Default::default()
    }
}

pub async fn create_link(env: &TestEnv, slug: &str) -> Link {
    env.services
        .links
        .create_link(create_request("https://example.com/page", Some(slug)))
        .await
        .expect("Failed to create link")
}
