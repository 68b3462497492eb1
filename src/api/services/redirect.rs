//! 公开重定向 `GET /{slug}`

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::http::header::{CACHE_CONTROL, HOST, LOCATION, REFERER, USER_AGENT};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tracing::{error, trace};

use crate::errors::TrelayError;
use crate::services::{RedirectDecision, RedirectResolver, RequestMeta};
use crate::utils::ip::extract_client_ip;

use super::v1::error_response;

#[derive(Deserialize, Debug, Default)]
pub struct RedirectQuery {
    /// 访问密码
    #[serde(default)]
    pub p: Option<String>,
}

/// 去掉端口的 Host；IPv6 字面量保留方括号内的部分
fn host_domain(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let host = if let Some(rest) = raw.strip_prefix('[') {
        rest.split(']').next().unwrap_or_default()
    } else {
        raw.split(':').next().unwrap_or_default()
    };
    let host = host.trim().to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

fn header_str(req: &HttpRequest, name: actix_web::http::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        req: HttpRequest,
        path: web::Path<String>,
        query: web::Query<RedirectQuery>,
        resolver: web::Data<Arc<RedirectResolver>>,
    ) -> HttpResponse {
        let slug = path.into_inner();
        let domain = header_str(&req, HOST).as_deref().and_then(host_domain);
        let meta = RequestMeta {
            referrer: header_str(&req, REFERER),
            user_agent: header_str(&req, USER_AGENT),
            client_ip: extract_client_ip(&req),
        };

        trace!("Redirect request for '{}' (host: {:?})", slug, domain);

        match resolver
            .resolve(&slug, domain.as_deref(), query.p.as_deref(), &meta)
            .await
        {
            Ok(RedirectDecision::Allow(target)) => Self::finish_redirect(&target),
            Ok(denied) => match denied.denial() {
                Some(err) => error_response(&err),
                None => error_response(&TrelayError::internal("unexpected redirect decision")),
            },
            Err(e) => {
                error!("Redirect resolution for '{}' failed: {}", slug, e);
                error_response(&e)
            }
        }
    }

    #[inline]
    fn finish_redirect(target: &str) -> HttpResponse {
        HttpResponse::build(StatusCode::FOUND)
            .insert_header((LOCATION, target))
            .insert_header((CACHE_CONTROL, "no-store"))
            .finish()
    }

    /// 未匹配任何路由
    pub async fn not_found() -> HttpResponse {
        error_response(&TrelayError::not_found("not found"))
    }
}

/// 公开路由放在最后注册，`/{slug}` 只匹配单段路径
pub fn redirect_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/{slug}", web::get().to(RedirectService::handle_redirect));
}
