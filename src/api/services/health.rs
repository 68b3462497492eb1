use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::{error, trace};

use crate::storage::SeaOrmStorage;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl Default for AppStartTime {
    fn default() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }
}

/// 探针响应不走 `/api/v1` 的 envelope
#[derive(Serialize, Debug)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: i64,
}

#[derive(Serialize, Debug)]
pub struct ReadyStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Health Service
///
/// 直接调用 storage，不经过业务层；探针要求快速响应。
pub struct HealthService;

impl HealthService {
    /// GET /healthz：进程存活即 200
    pub async fn liveness_check(start: Option<web::Data<AppStartTime>>) -> HttpResponse {
        let started = start.map(|s| s.start_datetime).unwrap_or_else(chrono::Utc::now);
        let uptime_secs = (chrono::Utc::now() - started).num_seconds().max(0);
        HttpResponse::Ok().json(HealthStatus {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs,
        })
    }

    /// GET /readyz：数据库可用才算就绪
    pub async fn readiness_check(storage: web::Data<Arc<SeaOrmStorage>>) -> HttpResponse {
        let start_time = Instant::now();

        let result = match tokio::time::timeout(READINESS_TIMEOUT, storage.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "database ping timed out after {:?}",
                READINESS_TIMEOUT
            )),
        };

        match result {
            Ok(()) => {
                trace!("Readiness check passed in {:?}", start_time.elapsed());
                HttpResponse::Ok().json(ReadyStatus {
                    status: "ready",
                    response_time_ms: Some(start_time.elapsed().as_millis() as u64),
                    error: None,
                })
            }
            Err(e) => {
                error!("Readiness check failed: {}", e);
                HttpResponse::build(StatusCode::SERVICE_UNAVAILABLE).json(ReadyStatus {
                    status: "not_ready",
                    response_time_ms: None,
                    error: Some("database is unavailable".to_string()),
                })
            }
        }
    }
}

pub fn health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/healthz", web::get().to(HealthService::liveness_check))
        .route("/readyz", web::get().to(HealthService::readiness_check));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_status_omits_empty_fields() {
        let body = serde_json::to_value(ReadyStatus {
            status: "not_ready",
            response_time_ms: None,
            error: Some("database is unavailable".to_string()),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "not_ready", "error": "database is unavailable"})
        );
    }
}
