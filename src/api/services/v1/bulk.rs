//! 批量删除与恢复

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::trace;

use crate::services::BulkCoordinator;

use super::helpers::success_response;
use super::types::{BulkDeleteRequest, BulkRestoreRequest};

/// DELETE /links
pub async fn bulk_delete_links(
    body: web::Json<BulkDeleteRequest>,
    bulk: web::Data<Arc<BulkCoordinator>>,
) -> ActixResult<HttpResponse> {
    let req = body.into_inner();
    trace!(
        "API: bulk delete {} slugs (permanent: {})",
        req.slugs.len(),
        req.permanent
    );
    let result = bulk
        .bulk_delete(&req.slugs, req.domain.as_deref(), req.permanent)
        .await?;
    Ok(success_response(result))
}

/// POST /links/restore
pub async fn bulk_restore_links(
    body: web::Json<BulkRestoreRequest>,
    bulk: web::Data<Arc<BulkCoordinator>>,
) -> ActixResult<HttpResponse> {
    let req = body.into_inner();
    trace!("API: bulk restore {} slugs", req.slugs.len());
    let result = bulk.bulk_restore(&req.slugs, req.domain.as_deref()).await?;
    Ok(success_response(result))
}
