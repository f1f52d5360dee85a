//! HTTP service around the stock year predictor
//!
//! Exposed as a library so the router can be driven in-process by tests.

pub mod api;
pub mod config;
pub mod error;
pub mod startup;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;
