//! Mode routing
//!
//! 目前只有 HTTP 服务器模式；`config generate` 在 main 中直接处理。

pub mod server;

pub use server::run_server;
