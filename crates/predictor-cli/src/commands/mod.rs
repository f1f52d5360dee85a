//! CLI command implementations

pub mod demo;
pub mod predict;
pub mod smoke;
