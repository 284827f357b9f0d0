//! HTTP utilities for fetching tracker pages.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::config::HttpConfig;
use crate::error::Result;

/// Create a configured HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// Fetch a URL and return the response body as text.
pub fn fetch_text(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send()?;
    Ok(response.text()?)
}
