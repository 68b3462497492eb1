//! 点击事件管理器
//!
//! - 热路径无锁写入（DashMap，按 link_id 分片）
//! - 定时刷盘 + 阈值触发刷盘
//! - 刷盘失败时批次回填缓冲区，指数退避后重试，连续失败达到上限后丢弃

use dashmap::DashMap;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};
use tracing::{debug, error, trace, warn};

use crate::analytics::{ClickEvent, ClickSink};
use crate::config::AnalyticsConfig;
use crate::storage::backend::retry::backoff_delay_ms;

const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 200;
const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// 事件缓冲区
struct EventBuffer {
    data: DashMap<i64, Vec<ClickEvent>>,
    /// 缓冲区事件总数（阈值判断用）
    total: AtomicUsize,
    /// 刷盘锁，防止并发刷盘
    flush_lock: Mutex<()>,
    /// 是否已有阈值触发的刷盘任务（防止重复 spawn）
    flush_pending: AtomicBool,
}

impl EventBuffer {
    fn new() -> Self {
        Self {
            data: DashMap::new(),
            total: AtomicUsize::new(0),
            flush_lock: Mutex::new(()),
            flush_pending: AtomicBool::new(false),
        }
    }

    fn push(&self, event: ClickEvent) -> usize {
        self.data.entry(event.link_id).or_default().push(event);
        self.total.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 取出当前全部事件（逐个 remove，不影响窗口期新写入）
    fn drain(&self) -> Vec<ClickEvent> {
        let keys: Vec<i64> = self.data.iter().map(|r| *r.key()).collect();

        let mut events = Vec::new();
        for key in keys {
            if let Some((_, mut batch)) = self.data.remove(&key) {
                events.append(&mut batch);
            }
        }

        if !events.is_empty() {
            let removed = events.len();
            self.total
                .fetch_update(Ordering::Release, Ordering::Relaxed, |current| {
                    Some(current.saturating_sub(removed))
                })
                .ok();
        }
        events
    }

    fn restore(&self, events: Vec<ClickEvent>) {
        let restored = events.len();
        for event in events {
            self.data.entry(event.link_id).or_default().push(event);
        }
        self.total.fetch_add(restored, Ordering::Relaxed);
    }

    fn len(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy)]
struct FlushPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
}

/// 点击管理器
///
/// 可 Clone，内部状态共享。
#[derive(Clone)]
pub struct ClickManager {
    buffer: Arc<EventBuffer>,
    sink: Arc<dyn ClickSink>,
    enabled: bool,
    flush_interval: Duration,
    max_buffered: usize,
    policy: FlushPolicy,
}

impl ClickManager {
    pub fn new(sink: Arc<dyn ClickSink>, config: &AnalyticsConfig) -> Self {
        Self {
            buffer: Arc::new(EventBuffer::new()),
            sink,
            enabled: config.enabled,
            flush_interval: Duration::from_secs(config.flush_interval_secs.max(1)),
            max_buffered: config.max_buffered.max(1),
            policy: FlushPolicy {
                max_attempts: config.max_flush_attempts.max(1),
                base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
                max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
            },
        }
    }

    /// 覆盖刷盘重试的退避参数
    pub fn with_retry_delay(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.policy.base_delay_ms = base_delay_ms;
        self.policy.max_delay_ms = max_delay_ms;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 记录一次点击（不阻塞，不返回错误）
    pub fn record(&self, event: ClickEvent) {
        if !self.enabled {
            return;
        }

        let size = self.buffer.push(event);
        trace!("ClickManager: buffered events: {}", size);

        if size >= self.max_buffered
            && self
                .buffer
                .flush_pending
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
                .is_ok()
        {
            let buffer = Arc::clone(&self.buffer);
            let sink = Arc::clone(&self.sink);
            let policy = self.policy;
            tokio::spawn(async move {
                if let Ok(_guard) = buffer.flush_lock.try_lock() {
                    Self::flush_buffer(&buffer, &sink, policy).await;
                } else {
                    trace!("ClickManager: flush already in progress, skipping");
                }
                buffer.flush_pending.store(false, Ordering::Release);
            });
        }
    }

    /// 后台定时刷盘循环
    pub async fn start_background_task(&self) {
        loop {
            sleep(self.flush_interval).await;

            if let Ok(_guard) = self.buffer.flush_lock.try_lock() {
                trace!("ClickManager: scheduled flush");
                Self::flush_buffer(&self.buffer, &self.sink, self.policy).await;
            } else {
                trace!("ClickManager: flush already in progress, skipping scheduled flush");
            }
        }
    }

    /// 手动刷盘（等待进行中的刷盘结束）
    pub async fn flush(&self) {
        let _guard = self.buffer.flush_lock.lock().await;
        Self::flush_buffer(&self.buffer, &self.sink, self.policy).await;
    }

    async fn flush_buffer(buffer: &EventBuffer, sink: &Arc<dyn ClickSink>, policy: FlushPolicy) {
        let mut attempt = 0u32;
        loop {
            let events = buffer.drain();
            if events.is_empty() {
                trace!("ClickManager: nothing to flush");
                return;
            }

            attempt += 1;
            let count = events.len();
            match sink.flush_events(events.clone()).await {
                Ok(()) => {
                    debug!("ClickManager: flushed {} click events", count);
                    return;
                }
                Err(e) if attempt >= policy.max_attempts => {
                    error!(
                        "ClickManager: dropping {} click events after {} failed flushes: {}",
                        count, attempt, e
                    );
                    return;
                }
                Err(e) => {
                    buffer.restore(events);
                    let delay =
                        backoff_delay_ms(attempt, policy.base_delay_ms, policy.max_delay_ms);
                    warn!(
                        "ClickManager: flush failed (attempt {}/{}): {}; {} events restored, retrying in {} ms",
                        attempt, policy.max_attempts, e, count, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                }
            }
        }
    }

    /// 当前缓冲事件数
    pub fn buffer_size(&self) -> usize {
        self.buffer.len()
    }
}
