//! rootsync HTTP API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use rootsync_core::Clock;
use rootsync_whitelist::WhitelistService;

pub mod config;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use server::{create_router, start_server};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// The whitelist service.
    pub service: Arc<WhitelistService>,
    /// Clock for response timestamps.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates handler state.
    pub fn new(service: Arc<WhitelistService>, clock: Arc<dyn Clock>) -> Self {
        Self { service, clock }
    }
}
