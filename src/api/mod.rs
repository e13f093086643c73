//! Outbound ERPNext access.

pub mod erpnext;
pub mod messages;

pub use erpnext::{ConnectionCheck, ErpCredentials, ErpNextClient, ItemQuery, StockLevel};

use std::time::Duration;

use crate::config::Config;

/// Shared HTTP client for every tenant; per-tenant auth lives on
/// [`ErpNextClient`].
pub fn build_http_client(cfg: &Config) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("erpnext-bridge/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(cfg.erp_timeout())
        .http2_adaptive_window(true)
        .build()
}
