pub mod health;
pub mod redirect;
pub mod v1;

pub use health::{AppStartTime, HealthService, health_routes};
pub use redirect::{RedirectService, redirect_routes};
