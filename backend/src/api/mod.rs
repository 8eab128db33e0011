//! HTTP API module.
//!
//! This module provides the HTTP server and API types for the nestmap backend.

pub mod server;
pub mod types;

pub use server::{router, start_server};
pub use types::*;
