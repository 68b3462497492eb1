//! `/api/v1` 管理接口

pub mod bulk;
pub mod folders;
pub mod helpers;
pub mod links;
pub mod preview;
pub mod routes;
pub mod stats;
pub mod types;

pub use helpers::{error_response, json_error_handler, query_error_handler};
pub use routes::configure_v1;
pub use types::{ApiError, ApiResponse, PageMeta};
