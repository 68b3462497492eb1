//! Bulk delete / restore
//!
//! 每个 slug 独立执行，失败不回滚也不中断其它条目。
//! 输出按输入顺序划分成成功与失败两个不相交的集合。

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{Result, TrelayError};
use crate::services::LifecycleManager;

pub const MAX_BULK_ITEMS: usize = 100;
const BULK_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteResult {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkRestoreResult {
    pub restored: Vec<String>,
    pub failed: Vec<String>,
}

/// 校验数量并去重（保留首次出现）
fn dedup_slugs(slugs: &[String]) -> Result<Vec<String>> {
    if slugs.is_empty() || slugs.len() > MAX_BULK_ITEMS {
        return Err(TrelayError::validation(
            "slugs",
            format!("slugs must contain between 1 and {} items", MAX_BULK_ITEMS),
        ));
    }

    let mut seen = HashSet::with_capacity(slugs.len());
    Ok(slugs
        .iter()
        .filter(|slug| seen.insert(slug.as_str()))
        .cloned()
        .collect())
}

/// 有界并发地执行 `op`，按输入顺序返回 (成功, 失败)
async fn partition<F, Fut, T>(slugs: Vec<String>, op: F) -> (Vec<String>, Vec<String>)
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut outcomes: Vec<(usize, String, bool)> = stream::iter(slugs.into_iter().enumerate())
        .map(|(idx, slug)| {
            let fut = op(slug.clone());
            async move {
                let ok = match fut.await {
                    Ok(_) => true,
                    Err(e) => {
                        debug!("Bulk item '{}' failed: {}", slug, e);
                        false
                    }
                };
                (idx, slug, ok)
            }
        })
        .buffer_unordered(BULK_CONCURRENCY)
        .collect()
        .await;

    outcomes.sort_by_key(|(idx, _, _)| *idx);

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (_, slug, ok) in outcomes {
        if ok {
            succeeded.push(slug);
        } else {
            failed.push(slug);
        }
    }
    (succeeded, failed)
}

pub struct BulkCoordinator {
    lifecycle: Arc<LifecycleManager>,
}

impl BulkCoordinator {
    pub fn new(lifecycle: Arc<LifecycleManager>) -> Self {
        Self { lifecycle }
    }

    pub async fn bulk_delete(
        &self,
        slugs: &[String],
        domain: Option<&str>,
        permanent: bool,
    ) -> Result<BulkDeleteResult> {
        let slugs = dedup_slugs(slugs)?;
        let domain = domain.map(str::to_string);

        let (deleted, failed) = partition(slugs, |slug| {
            let lifecycle = Arc::clone(&self.lifecycle);
            let domain = domain.clone();
            async move { lifecycle.delete(&slug, domain.as_deref(), permanent).await }
        })
        .await;

        info!(
            "Bulk delete (permanent={}): {} deleted, {} failed",
            permanent,
            deleted.len(),
            failed.len()
        );
        Ok(BulkDeleteResult { deleted, failed })
    }

    pub async fn bulk_restore(
        &self,
        slugs: &[String],
        domain: Option<&str>,
    ) -> Result<BulkRestoreResult> {
        let slugs = dedup_slugs(slugs)?;
        let domain = domain.map(str::to_string);

        let (restored, failed) = partition(slugs, |slug| {
            let lifecycle = Arc::clone(&self.lifecycle);
            let domain = domain.clone();
            async move { lifecycle.restore(&slug, domain.as_deref()).await }
        })
        .await;

        info!(
            "Bulk restore: {} restored, {} failed",
            restored.len(),
            failed.len()
        );
        Ok(BulkRestoreResult { restored, failed })
    }
}
