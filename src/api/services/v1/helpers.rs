//! `/api/v1` 帮助函数

use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, ResponseError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::error;

use crate::errors::TrelayError;

use super::types::{ApiError, ApiResponse, PageMeta};

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(status: StatusCode, body: &ApiResponse<T>) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(body)
}

/// 200 + data
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, &ApiResponse::ok(data))
}

/// 201 + data
pub fn created_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::CREATED, &ApiResponse::ok(data))
}

/// 200 + data + 分页 meta
pub fn paged_response<T: Serialize>(data: T, meta: PageMeta) -> HttpResponse {
    json_response(StatusCode::OK, &ApiResponse::ok(data).with_meta(meta))
}

/// `{"success":true}`
pub fn empty_response() -> HttpResponse {
    json_response(StatusCode::OK, &ApiResponse::empty())
}

/// 错误 envelope；内部错误只记录日志，不向客户端暴露细节
pub fn error_response(err: &TrelayError) -> HttpResponse {
    let status = err.http_status();
    let message = if err.is_internal() {
        error!("API internal error: {}", err);
        "internal server error".to_string()
    } else {
        err.message().to_string()
    };

    json_response(
        status,
        &ApiResponse::failure(ApiError {
            code: err.code().to_string(),
            message,
            field: err.field().map(str::to_string),
        }),
    )
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T, E>(result: Result<T, E>) -> HttpResponse
where
    T: Serialize,
    E: Into<TrelayError>,
{
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_response(&e.into()),
    }
}

impl ResponseError for TrelayError {
    fn status_code(&self) -> StatusCode {
        self.http_status()
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self)
    }
}

/// JSON body 解析失败时返回 envelope 而不是纯文本
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(&TrelayError::bad_request(format!(
        "invalid JSON body: {}",
        err
    )));
    InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = error_response(&TrelayError::bad_request(format!(
        "invalid query string: {}",
        err
    )));
    InternalError::from_response(err, response).into()
}

/// 解析 RFC3339 或 `YYYY-MM-DD`（当日 00:00 UTC）
pub fn parse_datetime_param(field: &str, raw: &str) -> Result<DateTime<Utc>, TrelayError> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN).and_utc())
        })
        .map_err(|_| {
            TrelayError::validation(
                field,
                format!("invalid datetime '{}', expected RFC3339 or YYYY-MM-DD", raw),
            )
        })
}

/// 逗号分隔的标签列表
pub fn split_csv_param(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
