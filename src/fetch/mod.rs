//! HTTP plumbing shared by the spreadsheet loader and the reference store.

mod basic;
pub mod auth;

pub use basic::BasicClient;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::{Method, Request, Response};

/// Sends prepared requests. Wrappers such as [`auth::ApiKey`] decorate a
/// request before handing it to an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// Downloads `url` and returns the body. Non-2xx statuses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let url = url
        .parse()
        .with_context(|| format!("Invalid URL '{url}'"))?;
    let req = Request::new(Method::GET, url);
    let path = req.url().to_string();

    let resp = client.execute(req).await?;
    if !resp.status().is_success() {
        bail!("GET {} returned status {}", path, resp.status());
    }
    Ok(resp.bytes().await?.to_vec())
}
