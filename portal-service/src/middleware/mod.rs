pub mod admin;
pub mod auth;

pub use admin::{admin_middleware, CurrentAdmin};
pub use auth::{auth_middleware, CurrentIdentity};
