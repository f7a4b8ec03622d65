//! Miperize - rewrite HTML into MIP mobile-page markup.
//!
//! Media elements are replaced by their framework counterparts and given
//! the sizing attributes the framework requires:
//!
//! - `<img>` -> `<mip-img>` / `<mip-anim>` (`.gif`), remote images are
//!   fetched to read their real dimensions
//! - `<iframe>` -> `<mip-iframe>` with width/height/sandbox defaults
//! - `<audio>` -> `<mip-audio>`
//! - every `src` is upgraded to `https` where possible
//!
//! # Example
//!
//! ```ignore
//! let engine = miperize::Miperize::new()?;
//! let html = engine.transform(r#"<img src="http://example.com/a.jpg">"#).await?;
//! // <mip-img src="https://example.com/a.jpg" width="50" height="50" layout="fixed"></mip-img>
//! ```
//!
//! # Architecture
//!
//! ```text
//! html ──tl──> dom::Node tree ──TreeWalker──> String
//!                                  │
//!                              RuleEngine ──> ImageProber (reqwest + image)
//!                                  │
//!                        layout / scheme rewriting
//! ```

pub mod config;
pub mod dom;
pub mod error;
pub mod logger;
pub mod probe;
pub mod transform;

pub use config::{ConfigError, ConfigOverrides, MipConfig, ProbeConfig, TagDefaults, TagOverride};
pub use error::{ProbeError, TransformError};
pub use transform::{CallId, Miperize};
