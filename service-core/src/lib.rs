//! service-core: Shared infrastructure for the membership portal services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
