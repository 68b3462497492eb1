//! trelay - link lifecycle and redirection engine
//!
//! Short links with per-domain slugs, soft delete and restore, one-time
//! links, password protection and buffered click analytics.
//!
//! # Architecture
//! - `storage`: SeaORM backend (SQLite / MySQL / PostgreSQL) and models
//! - `services`: slug allocation, lifecycle, redirect resolution, bulk ops,
//!   folders, analytics aggregation, link preview
//! - `analytics`: click events, buffering and batched flushing
//! - `api`: HTTP handlers and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and server mode
//! - `system`: Logging setup

pub mod analytics;
pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
