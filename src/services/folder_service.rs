//! Folder service
//!
//! 文件夹树用 parent_id 表示；移动时的成环检查在存储层事务内完成。

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::errors::{Result, TrelayError};
use crate::storage::{Folder, SeaOrmStorage};

pub const MAX_FOLDER_NAME_LENGTH: usize = 100;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// `parent_id: null` 移到根节点，缺失表示不变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFolderRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::utils::double_option")]
    pub parent_id: Option<Option<i64>>,
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if len == 0 || len > MAX_FOLDER_NAME_LENGTH {
        return Err(TrelayError::validation(
            "name",
            format!(
                "folder name must be between 1 and {} characters",
                MAX_FOLDER_NAME_LENGTH
            ),
        ));
    }
    Ok(name.to_string())
}

fn folder_not_found(id: i64) -> TrelayError {
    TrelayError::not_found(format!("folder {} not found", id))
}

pub struct FolderService {
    storage: Arc<SeaOrmStorage>,
}

impl FolderService {
    pub fn new(storage: Arc<SeaOrmStorage>) -> Self {
        Self { storage }
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>> {
        self.storage.list_folders().await
    }

    pub async fn get_folder(&self, id: i64) -> Result<Folder> {
        self.storage
            .get_folder(id)
            .await?
            .ok_or_else(|| folder_not_found(id))
    }

    async fn ensure_parent_exists(&self, parent_id: i64) -> Result<Folder> {
        self.storage.get_folder(parent_id).await?.ok_or_else(|| {
            TrelayError::validation(
                "parent_id",
                format!("parent folder {} does not exist", parent_id),
            )
        })
    }

    pub async fn create_folder(&self, req: CreateFolderRequest) -> Result<Folder> {
        let name = validate_name(&req.name)?;
        if let Some(parent_id) = req.parent_id {
            self.ensure_parent_exists(parent_id).await?;
        }
        self.storage.insert_folder(&name, req.parent_id).await
    }

    /// 重命名和/或移动文件夹
    pub async fn update_folder(&self, id: i64, req: UpdateFolderRequest) -> Result<Folder> {
        self.get_folder(id).await?;

        let name = req.name.as_deref().map(validate_name).transpose()?;

        let folder = self
            .storage
            .update_folder(id, name.as_deref(), req.parent_id)
            .await?
            .ok_or_else(|| folder_not_found(id))?;

        info!("Folder updated: id={} name={}", folder.id, folder.name);
        Ok(folder)
    }

    /// 删除文件夹；其中的链接被移出，子文件夹上移一级
    pub async fn delete_folder(&self, id: i64) -> Result<()> {
        if self.storage.delete_folder(id).await? {
            Ok(())
        } else {
            Err(folder_not_found(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Work  ").unwrap(), "Work");
        assert_eq!(validate_name("   ").unwrap_err().field(), Some("name"));
        assert!(validate_name(&"x".repeat(101)).is_err());
        assert!(validate_name(&"x".repeat(100)).is_ok());
    }

    #[test]
    fn test_update_request_parent_null() {
        let req: UpdateFolderRequest = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(req.parent_id, Some(None));
        let req: UpdateFolderRequest = serde_json::from_str(r#"{"name":"a"}"#).unwrap();
        assert_eq!(req.parent_id, None);
    }
}
