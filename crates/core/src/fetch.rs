//! Direct URL fetching with an optional origin policy.
//!
//! With an origin configured the fetcher behaves like a page on that origin:
//! it sends an `Origin` header and refuses responses that do not grant the
//! origin through `Access-Control-Allow-Origin`. Without one it fetches
//! unrestricted, which is the posture of the relay child context.

use async_trait::async_trait;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, HeaderMap, ORIGIN, RANGE};
use reqwest::{Client, Method, Response};
use storyvault_api::{FetchError, FetchFormat, Fetcher, Payload};

#[derive(Clone, Default)]
pub struct HttpFetcher {
    client: Client,
    origin: Option<String>,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            origin: Some(origin.into()),
        }
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    async fn send(&self, method: Method, url: &str, range: bool) -> Result<Response, FetchError> {
        let mut request = self.client.request(method, url);
        if let Some(origin) = &self.origin {
            request = request.header(ORIGIN, origin);
        }
        if range {
            request = request.header(RANGE, "bytes=0-0");
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{url}: {e}")))?;

        if let Some(origin) = &self.origin {
            if !origin_allowed(origin, response.headers()) {
                return Err(FetchError::CorsBlocked(url.to_string()));
            }
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, format: FetchFormat) -> Result<Payload, FetchError> {
        let response = self.send(Method::GET, url, false).await?;
        match format {
            FetchFormat::Text => response
                .text()
                .await
                .map(Payload::Text)
                .map_err(|e| FetchError::Decode(format!("{url}: {e}"))),
            FetchFormat::Blob => response
                .bytes()
                .await
                .map(|b| Payload::Blob(b.to_vec()))
                .map_err(|e| FetchError::Network(format!("{url}: {e}"))),
        }
    }

    async fn probe(&self, url: &str) -> Result<(), FetchError> {
        self.send(Method::GET, url, true).await.map(|_| ())
    }
}

fn origin_allowed(origin: &str, headers: &HeaderMap) -> bool {
    headers
        .get(ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|allowed| {
            let allowed = allowed.trim();
            allowed == "*" || allowed.eq_ignore_ascii_case(origin)
        })
        .unwrap_or(false)
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("origin", &self.origin)
            .finish()
    }
}
