use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, USER_AGENT};

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// An [`HttpClient`] wrapper that sends the headers a browser would.
///
/// The snapshot API rejects requests that do not look like they come from
/// its own web page, so `referer` should be the site's origin.
pub struct BrowserHeaders<C> {
    pub inner: C,
    headers: HeaderMap,
}

impl<C> BrowserHeaders<C> {
    pub fn new(inner: C, referer: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static(DEFAULT_ACCEPT_LANGUAGE),
        );
        headers.insert(REFERER, HeaderValue::from_str(referer)?);
        Ok(Self { inner, headers })
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for BrowserHeaders<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        for (name, value) in &self.headers {
            req.headers_mut().insert(name.clone(), value.clone());
        }
        self.inner.execute(req).await
    }
}
