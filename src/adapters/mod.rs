// Adapters layer: concrete implementations of the domain ports (token endpoint, search API, sheet API, terminal prompt).

pub mod auth;
pub mod prompt;
pub mod search;
pub mod sheets;

use crate::utils::error::Result;
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for every adapter.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!("profile-harvest/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}
