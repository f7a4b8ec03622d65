//! HTML -> MIP transformation engine.
//!
//! # Modules
//!
//! - `walker`: order-preserving tree walk and serialization
//! - `rules`: per-tag rewrite rules
//! - `layout`: `layout` attribute computation
//! - `scheme`: `http`/protocol-relative -> `https` rewriting
//!
//! # Isolation
//!
//! Every call parses its own tree and drives its own walker; the engine
//! only shares the read-only configuration and the stateless transport and
//! decoder. Each call gets a [`CallId`] that tags its log lines.

mod layout;
mod rules;
mod scheme;
mod walker;

#[cfg(test)]
mod tests;

pub use layout::{FIXED_LAYOUT_MAX_WIDTH, apply_layout};
pub use scheme::{secure_url, upgrade_src};

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::MipConfig;
use crate::debug;
use crate::dom::parse_document;
use crate::error::TransformError;
use crate::probe::{Decode, Fetch, HttpFetcher, ImageDecoder, ImageProber};
use rules::RuleEngine;
use walker::TreeWalker;

/// Correlation token of one transformation call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(u64);

impl CallId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The transformation engine.
///
/// Cheap to clone; clones share configuration, transport and call counter.
pub struct Miperize<F = HttpFetcher, D = ImageDecoder> {
    config: Arc<MipConfig>,
    prober: Arc<ImageProber<F, D>>,
    calls: Arc<AtomicU64>,
}

impl<F, D> Clone for Miperize<F, D> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            prober: Arc::clone(&self.prober),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl Miperize {
    /// Engine with the built-in defaults and the HTTP transport.
    pub fn new() -> Result<Self, TransformError> {
        Self::with_config(MipConfig::default())
    }

    /// Engine with `config` and the HTTP transport.
    pub fn with_config(config: MipConfig) -> Result<Self, TransformError> {
        let fetcher = HttpFetcher::new(&config.probe)?;
        Ok(Self::with_parts(config, fetcher, ImageDecoder))
    }
}

impl<F: Fetch, D: Decode> Miperize<F, D> {
    /// Engine with a custom transport and decoder.
    pub fn with_parts(config: MipConfig, fetcher: F, decoder: D) -> Self {
        let prober = ImageProber::new(fetcher, decoder, config.probe.timeout());
        Self {
            config: Arc::new(config),
            prober: Arc::new(prober),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    pub fn config(&self) -> &MipConfig {
        &self.config
    }

    fn next_call(&self) -> CallId {
        CallId(self.calls.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Rewrite `html` into MIP markup.
    ///
    /// Fails only when the markup cannot be parsed or a rule needs a tag
    /// missing from the configuration. Images that cannot be probed stay
    /// plain `<img>` elements and do not fail the call.
    pub async fn transform(&self, html: &str) -> Result<String, TransformError> {
        let call = self.next_call();
        debug!("transform"; "{} started ({} bytes)", call, html.len());

        let roots = parse_document(html)?;
        let rules = RuleEngine::new(&self.config, &self.prober, call);
        let result = TreeWalker::new(rules).walk(roots).await;

        match &result {
            Ok(output) => debug!("transform"; "{} finished ({} bytes)", call, output.len()),
            Err(err) => debug!("transform"; "{} aborted: {}", call, err),
        }
        result
    }

    /// Run [`transform`](Self::transform) in the background and hand the
    /// result to `callback`, exactly once.
    ///
    /// Errors synchronously, before any work is scheduled, when `callback`
    /// is `None` or when called outside a tokio runtime.
    pub fn transform_with_callback<C>(
        &self,
        html: impl Into<String>,
        callback: Option<C>,
    ) -> Result<JoinHandle<()>, TransformError>
    where
        C: FnOnce(Result<String, TransformError>) + Send + 'static,
    {
        let callback = callback.ok_or(TransformError::MissingCallback)?;
        let runtime = Handle::try_current().map_err(|_| TransformError::NoRuntime)?;

        let engine = self.clone();
        let html = html.into();
        Ok(runtime.spawn(async move {
            let result = engine.transform(&html).await;
            callback(result);
        }))
    }
}
