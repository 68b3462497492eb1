//! HTTP 层集成测试：鉴权、envelope、重定向与探针

mod common;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::App;
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use trelay::api::configure_app;
use trelay::storage::LinkPatch;

use common::{TEST_API_KEY, TestEnv, create_link, setup, setup_with, test_config};

macro_rules! init_app {
    ($env:expr) => {{
        let services = $env.services.clone();
        let api = $env.config.api.clone();
        test::init_service(App::new().configure(move |cfg| configure_app(cfg, &services, &api)))
            .await
    }};
}

fn authed(req: TestRequest) -> TestRequest {
    req.insert_header(("X-API-Key", TEST_API_KEY))
}

async fn expire(env: &TestEnv, link_id: i64) {
    env.storage
        .update_link(
            link_id,
            &LinkPatch {
                expires_at: Some(Some(Utc::now() - Duration::minutes(5))),
                ..Default::default()
            },
        )
        .await
        .unwrap();
}

#[actix_rt::test]
async fn test_missing_or_wrong_key_is_unauthorized() {
    let env = setup().await;
    let app = init_app!(env);

    let req = TestRequest::get().uri("/api/v1/links").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "unauthorized");

    let req = TestRequest::get()
        .uri("/api/v1/links")
        .insert_header(("X-API-Key", "wrong"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_bearer_token_accepted() {
    let env = setup().await;
    let app = init_app!(env);

    let req = TestRequest::get()
        .uri("/api/v1/links")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", TEST_API_KEY)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn test_empty_api_key_disables_api() {
    let mut config = test_config();
    config.api.api_key = String::new();
    let env = setup_with(config).await;
    let app = init_app!(env);

    let req = authed(TestRequest::get().uri("/api/v1/links")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_create_list_delete_envelope() {
    let env = setup().await;
    let app = init_app!(env);

    let req = authed(TestRequest::post().uri("/api/v1/links"))
        .set_json(json!({
            "url": "https://example.com/landing",
            "slug": "Launch",
            "tags": ["Promo"]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["slug"], "launch");
    assert_eq!(body["data"]["tags"], json!(["promo"]));
    assert!(body["data"].get("password_hash").is_none());

    // 重复 slug
    let req = authed(TestRequest::post().uri("/api/v1/links"))
        .set_json(json!({ "url": "https://example.com/other", "slug": "launch" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "slug_taken");

    // 校验错误带 field
    let req = authed(TestRequest::post().uri("/api/v1/links"))
        .set_json(json!({ "url": "ftp://example.com/file" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["field"], "url");

    let req = authed(TestRequest::get().uri("/api/v1/links?limit=10")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["meta"]["limit"], 10);
    assert_eq!(body["meta"]["offset"], 0);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let uri = format!(
        "/api/v1/links?search={}",
        urlencoding::encode("example.com/landing")
    );
    let req = authed(TestRequest::get().uri(&uri)).to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["meta"]["total"], 1);

    let req = authed(TestRequest::get().uri("/api/v1/links?search=nomatch")).to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["meta"]["total"], 0);

    let req = authed(TestRequest::delete().uri("/api/v1/links/launch")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({ "success": true }));

    let req = authed(TestRequest::get().uri("/api/v1/links/launch")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = authed(TestRequest::post().uri("/api/v1/links/launch/restore")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["restored"], true);
}

#[actix_rt::test]
async fn test_malformed_json_uses_envelope() {
    let env = setup().await;
    let app = init_app!(env);

    let req = authed(TestRequest::post().uri("/api/v1/links"))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[actix_rt::test]
async fn test_bulk_delete_endpoint() {
    let env = setup().await;
    create_link(&env, "bulk01").await;
    let app = init_app!(env);

    let req = authed(TestRequest::delete().uri("/api/v1/links"))
        .set_json(json!({ "slugs": ["bulk01", "missing"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["deleted"], json!(["bulk01"]));
    assert_eq!(body["data"]["failed"], json!(["missing"]));
}

#[actix_rt::test]
async fn test_redirect_outcomes() {
    let env = setup().await;
    create_link(&env, "hello1").await;
    let stale = create_link(&env, "stale1").await;
    expire(&env, stale.id).await;
    env.services
        .links
        .create_link(trelay::services::CreateLinkRequest {
            password: Some("s3cret".into()),
            ..common::create_request("https://example.com/private", Some("secret"))
        })
        .await
        .unwrap();
    let app = init_app!(env);

    let req = TestRequest::get().uri("/hello1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://example.com/page"
    );
    assert_eq!(resp.headers().get(header::CACHE_CONTROL).unwrap(), "no-store");

    let req = TestRequest::get().uri("/stale1").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::GONE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "link_expired");

    let req = TestRequest::get().uri("/secret").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "password_required");

    let req = TestRequest::get().uri("/secret?p=nope").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "password_incorrect");

    let req = TestRequest::get().uri("/secret?p=s3cret").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let req = TestRequest::get().uri("/nothere").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // 多段路径走 default service
    let req = TestRequest::get().uri("/a/b/c").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "not_found");
}

#[actix_rt::test]
async fn test_health_endpoints() {
    let env = setup().await;
    let app = init_app!(env);

    let req = TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body.get("success").is_none());

    let req = TestRequest::get().uri("/readyz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ready");
    assert!(body["response_time_ms"].is_u64());
}

#[actix_rt::test]
async fn test_stats_export_attachment() {
    let env = setup().await;
    create_link(&env, "report").await;
    let app = init_app!(env);

    let req = authed(TestRequest::get().uri("/api/v1/stats/report")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["total_clicks"], 0);

    let req = authed(TestRequest::get().uri("/api/v1/stats/report?export=csv")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("attachment"));
    assert!(disposition.contains("report-stats.csv"));

    let req = authed(TestRequest::get().uri("/api/v1/stats/report?export=xml")).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
