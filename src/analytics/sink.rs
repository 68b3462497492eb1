use super::ClickEvent;

/// 点击事件落库目标
///
/// 一次调用对应一个批次：写入全部事件并按事件数递增各链接的 click_count，
/// 要么整体成功，要么整体失败（由调用方重试）。
#[async_trait::async_trait]
pub trait ClickSink: Send + Sync {
    async fn flush_events(&self, events: Vec<ClickEvent>) -> anyhow::Result<()>;
}
