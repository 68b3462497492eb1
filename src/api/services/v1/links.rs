//! 链接 CRUD 与恢复

use std::sync::Arc;

use actix_web::{HttpResponse, Result as ActixResult, web};
use tracing::{info, trace};

use crate::services::{CreateLinkRequest, LinkService, UpdateLinkRequest};
use crate::storage::LinkFilter;

use super::helpers::{
    api_result, created_response, empty_response, paged_response, parse_datetime_param,
    split_csv_param, success_response,
};
use super::types::{DeleteLinkQuery, DomainQuery, ListLinksQuery, PageMeta, RestoredResponse};

fn build_filter(query: &ListLinksQuery) -> crate::errors::Result<LinkFilter> {
    let created_after = query
        .created_after
        .as_deref()
        .map(|raw| parse_datetime_param("created_after", raw))
        .transpose()?;
    let created_before = query
        .created_before
        .as_deref()
        .map(|raw| parse_datetime_param("created_before", raw))
        .transpose()?;

    Ok(LinkFilter {
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        folder_id: query.folder_id,
        domain: query.domain.clone(),
        tags: split_csv_param(query.tags.as_deref())
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect(),
        only_deleted: query.only_deleted,
        include_deleted: query.include_deleted,
        created_after,
        created_before,
        limit: LinkFilter::clamp_limit(query.limit),
        offset: query.offset.unwrap_or(0),
    })
}

/// GET /links
pub async fn list_links(
    query: web::Query<ListLinksQuery>,
    links: web::Data<Arc<LinkService>>,
) -> ActixResult<HttpResponse> {
    trace!("API: list links with filters: {:?}", query);

    let filter = build_filter(&query)?;
    let (items, total) = links.list_links(&filter).await?;

    trace!("API: returning {} of {} links", items.len(), total);
    Ok(paged_response(
        items,
        PageMeta {
            total,
            limit: filter.limit,
            offset: filter.offset,
        },
    ))
}

/// GET /links/{slug}
pub async fn get_link(
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
    links: web::Data<Arc<LinkService>>,
) -> HttpResponse {
    let slug = path.into_inner();
    trace!("API: get link '{}'", slug);
    api_result(links.get_link(&slug, query.domain.as_deref()).await)
}

/// POST /links
pub async fn create_link(
    body: web::Json<CreateLinkRequest>,
    links: web::Data<Arc<LinkService>>,
) -> ActixResult<HttpResponse> {
    let link = links.create_link(body.into_inner()).await?;
    Ok(created_response(link))
}

/// PATCH /links/{slug}
pub async fn update_link(
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
    body: web::Json<UpdateLinkRequest>,
    links: web::Data<Arc<LinkService>>,
) -> HttpResponse {
    let slug = path.into_inner();
    api_result(
        links
            .update_link(&slug, query.domain.as_deref(), body.into_inner())
            .await,
    )
}

/// DELETE /links/{slug}
pub async fn delete_link(
    path: web::Path<String>,
    query: web::Query<DeleteLinkQuery>,
    links: web::Data<Arc<LinkService>>,
) -> ActixResult<HttpResponse> {
    let slug = path.into_inner();
    links
        .delete_link(&slug, query.domain.as_deref(), query.permanent)
        .await?;
    info!(
        "API: deleted link '{}' (permanent: {})",
        slug, query.permanent
    );
    Ok(empty_response())
}

/// POST /links/{slug}/restore
pub async fn restore_link(
    path: web::Path<String>,
    query: web::Query<DomainQuery>,
    links: web::Data<Arc<LinkService>>,
) -> ActixResult<HttpResponse> {
    let slug = path.into_inner();
    links.restore_link(&slug, query.domain.as_deref()).await?;
    Ok(success_response(RestoredResponse { restored: true }))
}
