//! `/api/v1` 限流（actix-governor，按客户端 IP）

use std::time::Duration;

use actix_governor::{Governor, GovernorConfigBuilder, KeyExtractor, SimpleKeyExtractionError};
use actix_web::dev::ServiceRequest;
use governor::middleware::NoOpMiddleware;
use tracing::debug;

use crate::config::ApiConfig;
use crate::utils::ip::extract_client_ip;

/// 基于客户端 IP 的限流 key
///
/// 连接来自私有地址时信任 X-Forwarded-For，其余情况使用连接地址；
/// 拿不到地址的请求共用一个桶。
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl KeyExtractor for ClientIpKeyExtractor {
    type Key = String;
    type KeyExtractionError = SimpleKeyExtractionError<&'static str>;

    fn extract(&self, req: &ServiceRequest) -> Result<Self::Key, Self::KeyExtractionError> {
        Ok(extract_client_ip(req.request())
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown".to_string()))
    }
}

/// 令牌补充间隔；rate 为 0 时按 1 req/s 处理，超过 1e9 时取下限 1ns
fn replenish_period(per_second: u64) -> Duration {
    Duration::from_nanos((1_000_000_000 / per_second.max(1)).max(1))
}

/// 创建 API 限流器
///
/// 每秒补充 `rate_limit_per_second` 个令牌，突发最多 `rate_limit_burst` 次；
/// 超限返回 HTTP 429 Too Many Requests
pub fn api_rate_limiter(config: &ApiConfig) -> Governor<ClientIpKeyExtractor, NoOpMiddleware> {
    let burst = config.rate_limit_burst.max(1);
    let governor_config = GovernorConfigBuilder::default()
        .period(replenish_period(config.rate_limit_per_second))
        .burst_size(burst)
        .key_extractor(ClientIpKeyExtractor)
        .finish()
        .expect("Invalid rate limit config");

    debug!(
        "API rate limiter created: {} req/s, burst {}",
        config.rate_limit_per_second, burst
    );
    Governor::new(&governor_config)
}
