//! Slug allocation
//!
//! 预留即插入：(slug, domain) 唯一索引是唯一的仲裁者，
//! 唯一约束冲突就是碰撞信号。

use std::sync::Arc;

use tracing::{debug, error};

use crate::config::SlugConfig;
use crate::errors::{Result, TrelayError};
use crate::storage::{Link, NewLink, SeaOrmStorage};
use crate::utils::generate_random_code;
use crate::utils::slug::{MAX_SLUG_LENGTH, MIN_SLUG_LENGTH, RESERVED_SLUGS, prepare_slug};

pub struct SlugAllocator {
    storage: Arc<SeaOrmStorage>,
    length: usize,
    max_attempts: u32,
}

impl SlugAllocator {
    pub fn new(storage: Arc<SeaOrmStorage>, config: &SlugConfig) -> Self {
        Self {
            storage,
            length: config.default_length.clamp(MIN_SLUG_LENGTH, MAX_SLUG_LENGTH),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// 生成一个随机候选（跳过保留字）
    pub fn generate_candidate(&self) -> String {
        loop {
            let candidate = generate_random_code(self.length);
            if !RESERVED_SLUGS.contains(&candidate.as_str()) {
                return candidate;
            }
        }
    }

    /// 为 `draft` 分配 slug 并写入
    ///
    /// - 指定 slug：规范化、校验后插入一次，冲突返回 SlugConflict
    /// - 未指定：随机生成，冲突时重试，最多 `max_attempts` 次
    pub async fn allocate(&self, requested: Option<&str>, mut draft: NewLink) -> Result<Link> {
        if let Some(raw) = requested.filter(|s| !s.trim().is_empty()) {
            draft.slug = prepare_slug(raw)?;
            return self.storage.insert_link(&draft).await;
        }

        for attempt in 1..=self.max_attempts {
            draft.slug = self.generate_candidate();
            match self.storage.insert_link(&draft).await {
                Ok(link) => return Ok(link),
                Err(TrelayError::SlugConflict(_)) => {
                    debug!(
                        "Generated slug '{}' collided (attempt {}/{})",
                        draft.slug, attempt, self.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            "Slug allocation exhausted: {} attempts of length {} collided in domain '{}'",
            self.max_attempts, self.length, draft.domain
        );
        Err(TrelayError::allocation_exhausted(format!(
            "could not allocate a unique slug after {} attempts",
            self.max_attempts
        )))
    }
}
