pub mod admin;
pub mod auth;

pub use admin::admin_guard_middleware;
pub use auth::{session_auth_middleware, CurrentUser};
