//! SeaORM storage backend
//!
//! Database storage for links, folders and click events using SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod analytics;
mod click_sink;
mod connection;
mod converters;
mod folders;
mod mutations;
mod query;
pub mod retry;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use sea_orm::{DatabaseConnection, DbBackend};
use tracing::info;

use crate::analytics::ClickSink;
use crate::config::DatabaseConfig;
use crate::errors::{Result, TrelayError};

pub use analytics::{Bucket, LabelRow};
pub use connection::{connect_generic, connect_sqlite, run_migrations};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<DbBackend> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok(DbBackend::Sqlite)
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok(DbBackend::MySql)
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok(DbBackend::Postgres)
    } else {
        Err(TrelayError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 裸文件路径补全为 sqlite URL
fn normalize_sqlite_url(database_url: &str) -> String {
    if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else if database_url == ":memory:" {
        "sqlite::memory:".to_string()
    } else {
        format!("sqlite://{}?mode=rwc", database_url)
    }
}

/// 分页 COUNT 缓存（TTL 30秒）
///
/// 每次失效递增 generation；查询开始后发生过失效的结果不会留在缓存里。
#[derive(Clone)]
pub(crate) struct CountCache {
    cache: Cache<String, u64>,
    generation: Arc<AtomicU64>,
}

impl CountCache {
    fn new() -> Self {
        Self {
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(30))
                .max_capacity(100)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<u64> {
        self.cache.get(key)
    }

    /// 查询前记录当前 generation
    pub(crate) fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// 写入 `seen` 时刻开始计算的结果
    pub(crate) fn store(&self, key: String, count: u64, seen: u64) {
        if self.generation() != seen {
            return;
        }
        self.cache.insert(key.clone(), count);
        // 检查与写入之间发生了失效
        if self.generation() != seen {
            self.cache.invalidate(&key);
        }
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend: DbBackend,
    count_cache: CountCache,
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let database_url = config.database_url.trim();
        if database_url.is_empty() {
            return Err(TrelayError::database_config("database_url is not set"));
        }

        let retry_config = retry::RetryConfig {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
        };

        let backend = infer_backend_from_url(database_url)?;
        let db = match backend {
            DbBackend::Sqlite => connect_sqlite(&normalize_sqlite_url(database_url)).await?,
            _ => connect_generic(database_url, config.pool_size, config.timeout).await?,
        };

        let storage = SeaOrmStorage {
            db,
            backend,
            count_cache: CountCache::new(),
            retry_config,
        };

        run_migrations(&storage.db).await?;

        info!("{:?} storage initialized", storage.backend);
        Ok(storage)
    }

    /// 以默认连接参数打开（测试与嵌入使用）
    pub async fn connect(database_url: &str) -> Result<Self> {
        Self::from_config(&DatabaseConfig {
            database_url: database_url.to_string(),
            ..DatabaseConfig::default()
        })
        .await
    }

    pub fn backend(&self) -> DbBackend {
        self.backend
    }

    pub fn as_click_sink(&self) -> Arc<dyn ClickSink> {
        Arc::new(self.clone()) as Arc<dyn ClickSink>
    }

    /// 清除分页 COUNT 缓存（数据变更时调用）
    pub fn invalidate_count_cache(&self) {
        self.count_cache.invalidate();
    }

    /// 就绪检查
    pub async fn ping(&self) -> Result<()> {
        self.db
            .ping()
            .await
            .map_err(|e| TrelayError::database_connection(format!("ping failed: {}", e)))
    }

    pub async fn close(&self) {
        if let Err(e) = self.db.clone().close().await {
            tracing::warn!("Failed to close database connection: {}", e);
        }
    }
}
