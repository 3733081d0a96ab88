mod basic;
mod client;
mod headers;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use headers::BrowserHeaders;

use anyhow::Result;

/// GETs `url` and returns the body. Non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}
