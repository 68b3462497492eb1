//! 数据库操作重试
//!
//! 只有锁冲突类错误和连接池等待超时会重试，按指数退避加抖动；
//! 约束冲突、连接失败、SQL 错误立即返回。

use sea_orm::DbErr;
use sea_orm::error::{ConnAcquireErr, RuntimeErr};
use sea_orm::sqlx::sqlite::SqliteError;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// 判断数据库错误是否值得重试
pub fn is_retryable_error(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => true,
        DbErr::Exec(e) | DbErr::Query(e) => is_lock_conflict(e),
        _ => false,
    }
}

fn is_lock_conflict(err: &RuntimeErr) -> bool {
    match err {
        RuntimeErr::SqlxError(e) => {
            let e: &sea_orm::sqlx::Error = e;
            match e.as_database_error() {
                Some(db_err) if db_err.try_downcast_ref::<SqliteError>().is_some() => db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .is_some_and(sqlite_busy_or_locked),
                Some(db_err) => db_err.code().is_some_and(|code| {
                    matches!(
                        code.as_ref(),
                        // PostgreSQL serialization_failure / deadlock_detected
                        "40001" | "40P01" |
                        // MySQL ER_LOCK_DEADLOCK / ER_LOCK_WAIT_TIMEOUT
                        "1213" | "1205"
                    )
                }),
                None => matches!(e, sea_orm::sqlx::Error::PoolTimedOut),
            }
        }
        RuntimeErr::Internal(msg) => {
            let msg = msg.to_lowercase();
            msg.contains("database is locked") || msg.contains("deadlock")
        }
        #[allow(unreachable_patterns)]
        _ => false,
    }
}

/// SQLite 扩展错误码低 8 位为主码：5 = BUSY，6 = LOCKED
fn sqlite_busy_or_locked(extended_code: i32) -> bool {
    matches!(extended_code & 0xff, 5 | 6)
}

/// 重试配置
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// 执行 `operation`，瞬时错误最多重试 `config.max_retries` 次
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut retries = 0;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    debug!("{} recovered after {} retries", operation_name, retries);
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if retries >= config.max_retries || !is_retryable_error(&err) {
            return Err(err);
        }
        retries += 1;
        let delay = backoff_delay_ms(retries, config.base_delay_ms, config.max_delay_ms);
        warn!(
            "{} hit a transient error ({}); retry {}/{} in {} ms",
            operation_name, err, retries, config.max_retries, delay
        );
        sleep(Duration::from_millis(delay)).await;
    }
}

/// 第 `attempt` 次重试的等待时长：base * 2^(attempt-1)，封顶 max，再加 0-25% 抖动
pub fn backoff_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp_delay.min(max_ms);
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn locked() -> DbErr {
        DbErr::Query(RuntimeErr::Internal("database is locked".to_string()))
    }

    #[test]
    fn test_retryable_classification() {
        assert!(is_retryable_error(&locked()));
        assert!(is_retryable_error(&DbErr::ConnectionAcquire(
            ConnAcquireErr::Timeout
        )));
        assert!(!is_retryable_error(&DbErr::ConnectionAcquire(
            ConnAcquireErr::ConnectionClosed
        )));
        assert!(!is_retryable_error(&DbErr::Conn(RuntimeErr::Internal(
            "connection refused".into()
        ))));
        assert!(!is_retryable_error(&DbErr::Exec(RuntimeErr::Internal(
            "near \"SELEC\": syntax error".into()
        ))));
        assert!(!is_retryable_error(&DbErr::RecordNotFound("x".into())));
        assert!(!is_retryable_error(&DbErr::Custom("unique".into())));
    }

    #[test]
    fn test_sqlite_extended_codes() {
        assert!(sqlite_busy_or_locked(5));
        assert!(sqlite_busy_or_locked(6));
        // SQLITE_BUSY_SNAPSHOT / SQLITE_LOCKED_SHAREDCACHE
        assert!(sqlite_busy_or_locked(517));
        assert!(sqlite_busy_or_locked(262));
        // SQLITE_CONSTRAINT_UNIQUE
        assert!(!sqlite_busy_or_locked(2067));
        assert!(!sqlite_busy_or_locked(19));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        assert!((100..=125).contains(&backoff_delay_ms(1, 100, 2000)));
        assert!((400..=500).contains(&backoff_delay_ms(3, 100, 2000)));
        assert!((2000..=2500).contains(&backoff_delay_ms(12, 100, 2000)));
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_lock() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("locked_op", config, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move { if n < 2 { Err(locked()) } else { Ok(7) } }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up() {
        let config = RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 5,
        };
        let calls = AtomicU32::new(0);

        let result = with_retry("locked_op", config, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(locked()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let calls = AtomicU32::new(0);
        let result = with_retry("missing", RetryConfig::default(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(DbErr::RecordNotFound("x".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
