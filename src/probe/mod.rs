//! Remote image dimension probing.
//!
//! A probe issues one GET, buffers the whole body and decodes the image
//! size from it. Every await on the transport is bounded by the inactivity
//! timeout, so a stalled origin fails the probe instead of stalling the
//! transformation.
//!
//! A probe resolves exactly once:
//!
//! ```text
//! Unresolved ──probe()──> Probing ──first of {decoded, decode error,
//!                                   transport error, timeout}──> Resolved
//! ```
//!
//! The outcome is the return value of one `probe` future, owned by the
//! element being rewritten. When a step times out its transfer future is
//! dropped, so a response arriving later has nothing left to resolve and
//! cannot reach the element. Nothing is shared between probes, so
//! concurrent transformations can never resolve each other's images.

mod decode;
mod http;

pub use decode::{Decode, Dimensions, ImageDecoder};
pub use http::{Body, Fetch, HttpFetcher};

#[cfg(test)]
pub(crate) use decode::tests::png_bytes;

use std::time::Duration;

use tokio::time::timeout;
use url::Url;

use crate::error::ProbeError;

pub type ProbeOutcome = Result<Dimensions, ProbeError>;

// =============================================================================
// Prober
// =============================================================================

/// Fetches and measures remote images
#[derive(Debug)]
pub struct ImageProber<F, D> {
    fetcher: F,
    decoder: D,
    idle_timeout: Duration,
}

impl<F: Fetch, D: Decode> ImageProber<F, D> {
    pub fn new(fetcher: F, decoder: D, idle_timeout: Duration) -> Self {
        Self {
            fetcher,
            decoder,
            idle_timeout,
        }
    }

    /// Measure the image at `url`.
    ///
    /// Transport errors, inactivity timeouts and undecodable bodies all
    /// resolve the probe as failed; nothing is retried.
    pub async fn probe(&self, url: &Url) -> ProbeOutcome {
        let mut body = self.idle(self.fetcher.get(url)).await?;

        let mut buffer = Vec::new();
        while let Some(chunk) = self.idle(body.next_chunk()).await? {
            buffer.extend_from_slice(&chunk);
        }

        self.decoder.dimensions(&buffer)
    }

    /// Bound one transport await by the inactivity timeout.
    async fn idle<T>(
        &self,
        step: impl Future<Output = Result<T, ProbeError>>,
    ) -> Result<T, ProbeError> {
        timeout(self.idle_timeout, step)
            .await
            .map_err(|_| ProbeError::Timeout(self.idle_timeout))?
    }
}
