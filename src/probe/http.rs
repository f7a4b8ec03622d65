//! HTTP transport for image probes.

use std::future::Future;

use url::Url;

use crate::config::ProbeConfig;
use crate::error::ProbeError;

/// Issues the GET request of a probe.
///
/// Implementations must be shareable between concurrent transformations;
/// every call is an independent request.
pub trait Fetch: Send + Sync + 'static {
    type Body: Body;

    fn get(&self, url: &Url) -> impl Future<Output = Result<Self::Body, ProbeError>> + Send;
}

/// A response body read chunk by chunk.
pub trait Body: Send {
    /// The next chunk, or `None` once the body is complete.
    fn next_chunk(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>, ProbeError>> + Send;
}

/// `reqwest`-backed transport; the scheme of the URL selects HTTP or HTTPS.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(settings: &ProbeConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.timeout())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    type Body = reqwest::Response;

    async fn get(&self, url: &Url) -> Result<Self::Body, ProbeError> {
        let response = self.client.get(url.clone()).send().await?;
        crate::debug!("probe"; "{} answered {}", url, response.status());
        Ok(response)
    }
}

impl Body for reqwest::Response {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ProbeError> {
        let chunk = self.chunk().await?;
        Ok(chunk.map(|bytes| bytes.to_vec()))
    }
}
