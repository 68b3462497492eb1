pub mod auth;
pub mod rate_limit;

pub use auth::ApiKeyAuth;
pub use rate_limit::{ClientIpKeyExtractor, api_rate_limiter};
