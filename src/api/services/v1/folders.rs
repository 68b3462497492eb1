//! 文件夹 CRUD

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::info;

use crate::services::{CreateFolderRequest, FolderService, UpdateFolderRequest};

use super::helpers::{api_result, created_response, empty_response};

/// GET /folders
pub async fn list_folders(folders: web::Data<Arc<FolderService>>) -> HttpResponse {
    api_result(folders.list_folders().await)
}

/// GET /folders/{id}
pub async fn get_folder(
    path: web::Path<i64>,
    folders: web::Data<Arc<FolderService>>,
) -> HttpResponse {
    api_result(folders.get_folder(path.into_inner()).await)
}

/// POST /folders
pub async fn create_folder(
    body: web::Json<CreateFolderRequest>,
    folders: web::Data<Arc<FolderService>>,
) -> ActixResult<HttpResponse> {
    let folder = folders.create_folder(body.into_inner()).await?;
    info!("API: folder created: id={} name={}", folder.id, folder.name);
    Ok(created_response(folder))
}

/// PATCH /folders/{id}
pub async fn update_folder(
    path: web::Path<i64>,
    body: web::Json<UpdateFolderRequest>,
    folders: web::Data<Arc<FolderService>>,
) -> HttpResponse {
    api_result(
        folders
            .update_folder(path.into_inner(), body.into_inner())
            .await,
    )
}

/// DELETE /folders/{id}
pub async fn delete_folder(
    path: web::Path<i64>,
    folders: web::Data<Arc<FolderService>>,
) -> ActixResult<HttpResponse> {
    let id = path.into_inner();
    folders.delete_folder(id).await?;
    info!("API: folder {} deleted", id);
    Ok(empty_response())
}
