use serde::{Deserialize, Serialize};

/// 静态配置（启动时从 TOML + 环境变量加载）
///
/// - server: 监听地址、端口、worker 数量、本站域名
/// - database: 数据库连接与重试
/// - slug: 短码生成参数
/// - api: API Key、限流、CORS
/// - analytics: 点击缓冲与刷新
/// - logging: 日志
/// - preview: 链接预览抓取
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub slug: SlugConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：TRELAY，分隔符：__
    /// 示例：TRELAY__SERVER__PORT=9999
    pub fn load(path: &str) -> Self {
        use config::{Config, Environment, File};

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("TRELAY")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("server.self_domains")
                    .with_list_parse_key("api.cors_allowed_origins"),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
    /// 本站域名，禁止作为跳转目标
    #[serde(default)]
    pub self_domains: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_database_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 短码生成配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugConfig {
    #[serde(default = "default_slug_length")]
    pub default_length: usize,
    /// 随机短码碰撞后的最大尝试次数
    #[serde(default = "default_slug_max_attempts")]
    pub max_attempts: u32,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// 为空时关闭 /api/v1
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_rate_limit_per_second")]
    pub rate_limit_per_second: u64,
    #[serde(default = "default_rate_limit_burst")]
    pub rate_limit_burst: u32,
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

/// 点击统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// 缓冲事件数达到该值时立即刷新
    #[serde(default = "default_max_buffered")]
    pub max_buffered: usize,
    /// 连续失败超过该次数后丢弃批次
    #[serde(default = "default_max_flush_attempts")]
    pub max_flush_attempts: u32,
    #[serde(default = "default_true")]
    pub anonymize_ip: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_true")]
    pub enable_rotation: bool,
}

/// 链接预览抓取配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_preview_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_preview_max_body_bytes")]
    pub max_body_bytes: u64,
    #[serde(default = "default_preview_max_redirects")]
    pub max_redirects: u32,
    #[serde(default = "default_preview_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

// ============================================================
// Default value functions
// ============================================================

fn default_true() -> bool {
    true
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_database_url() -> String {
    "trelay.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_database_timeout() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_slug_length() -> usize {
    6
}

fn default_slug_max_attempts() -> u32 {
    8
}

fn default_rate_limit_per_second() -> u64 {
    10
}

fn default_rate_limit_burst() -> u32 {
    50
}

fn default_flush_interval_secs() -> u64 {
    5
}

fn default_max_buffered() -> usize {
    100
}

fn default_max_flush_attempts() -> u32 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_preview_timeout_secs() -> u64 {
    10
}

fn default_preview_max_body_bytes() -> u64 {
    1024 * 1024
}

fn default_preview_max_redirects() -> u32 {
    5
}

fn default_preview_cache_ttl_secs() -> u64 {
    3600
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
            self_domains: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            timeout: default_database_timeout(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            default_length: default_slug_length(),
            max_attempts: default_slug_max_attempts(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            rate_limit_per_second: default_rate_limit_per_second(),
            rate_limit_burst: default_rate_limit_burst(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_secs: default_flush_interval_secs(),
            max_buffered: default_max_buffered(),
            max_flush_attempts: default_max_flush_attempts(),
            anonymize_ip: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: true,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: default_preview_timeout_secs(),
            max_body_bytes: default_preview_max_body_bytes(),
            max_redirects: default_preview_max_redirects(),
            cache_ttl_secs: default_preview_cache_ttl_secs(),
        }
    }
}
