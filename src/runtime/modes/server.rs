//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    http::{Method, header},
    middleware::{Compress, DefaultHeaders},
};
use anyhow::Result;
use tracing::{error, info, warn};

use crate::api::configure_app;
use crate::api::middleware::auth::API_KEY_HEADER;
use crate::config::{ApiConfig, StaticConfig};
use crate::runtime::lifetime;

/// Validate CORS configuration at startup (runs once)
fn validate_cors_config(api: &ApiConfig) {
    if api.cors_allowed_origins.iter().any(|o| o == "*") {
        warn!("CORS allows any origin; the API key is the only protection for /api/v1");
    }
}

/// Build CORS middleware from configuration
///
/// 未配置 origin 时保持同源策略
fn build_cors_middleware(api: &ApiConfig) -> Cors {
    if api.cors_allowed_origins.is_empty() {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec![
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allowed_header(API_KEY_HEADER)
        .max_age(3600);

    if api.cors_allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &api.cors_allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Run the HTTP server
///
/// This function:
/// 1. Prepares server components (storage, services, click flusher)
/// 2. Configures and starts the HTTP server
/// 3. Listens for graceful shutdown signals, then flushes clicks
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let startup = lifetime::startup::prepare_server_startup(config)
        .await
        .map_err(|e| {
            error!("Server startup failed: {}", e);
            e
        })?;

    let services = startup.services.clone();
    let storage = startup.storage;
    let clicks = services.clicks.clone();
    let api_config = config.api.clone();

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    validate_cors_config(&api_config);

    let server = HttpServer::new(move || {
        let cors = build_cors_middleware(&api_config);
        let services = services.clone();
        let api_config = api_config.clone();

        App::new()
            .wrap(cors)
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .configure(move |cfg| configure_app(cfg, &services, &api_config))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .disable_signals()
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server.bind(&bind_address)?.run();
    let handle = server.handle();
    let mut server_task = actix_web::rt::spawn(server);

    // Wait for server or shutdown signal
    tokio::select! {
        res = &mut server_task => {
            res??;
        }
        _ = lifetime::shutdown::wait_for_signal() => {
            info!("Shutdown signal received, stopping HTTP server...");
            handle.stop(true).await;
            lifetime::shutdown::perform_shutdown(&clicks, &storage).await;
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
