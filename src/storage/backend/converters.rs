use chrono::{DateTime, Utc};

use crate::storage::{Folder, Link, NewLink};
use migration::entities::{folder, link};

/// 将 links Model 转换为 Link
pub fn model_to_link(model: link::Model) -> Link {
    Link {
        id: model.id,
        slug: model.slug,
        original_url: model.original_url,
        domain: (!model.domain.is_empty()).then_some(model.domain),
        has_password: model.password_hash.is_some(),
        password_hash: model.password_hash,
        is_one_time: model.is_one_time,
        expires_at: model.expires_at,
        tags: decode_tags(&model.tags),
        folder_id: model.folder_id,
        click_count: model.click_count.max(0) as u64,
        created_at: model.created_at,
        updated_at: model.updated_at,
        deleted_at: model.deleted_at,
    }
}

/// 将 NewLink 转换为插入用 ActiveModel
pub fn new_link_to_active_model(link: &NewLink, now: DateTime<Utc>) -> link::ActiveModel {
    use sea_orm::ActiveValue::*;

    link::ActiveModel {
        id: NotSet,
        slug: Set(link.slug.clone()),
        domain: Set(link.domain.clone()),
        original_url: Set(link.original_url.clone()),
        password_hash: Set(link.password_hash.clone()),
        is_one_time: Set(link.is_one_time),
        expires_at: Set(link.expires_at),
        tags: Set(encode_tags(&link.tags)),
        folder_id: Set(link.folder_id),
        click_count: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

pub fn model_to_folder(model: folder::Model) -> Folder {
    Folder {
        id: model.id,
        name: model.name,
        parent_id: model.parent_id,
        created_at: model.created_at,
    }
}

/// 标签以 JSON 数组文本存储，便于 `LIKE '%"tag"%'` 过滤
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_string())
}

pub fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}
