//! Conversion configuration.
//!
//! Maps every target tag name to the attribute defaults the MIP framework
//! needs for it, plus the settings of the remote image prober.
//!
//! # Example
//!
//! ```toml
//! [mip-img]
//! layout = "fixed"    # used when the image has no layout and width >= 300
//! width = 320         # fallback width for local images
//!
//! [mip-iframe]
//! sandbox = "allow-scripts"
//!
//! [probe]
//! timeout_ms = 3000   # inactivity timeout for image requests
//! ```
//!
//! Every table is optional and every field inside it is optional: values
//! are deep-merged over the built-in defaults.

mod error;

pub use error::ConfigError;

use crate::log;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Tag names and layouts
// ============================================================================

pub const MIP_IMG: &str = "mip-img";
pub const MIP_ANIM: &str = "mip-anim";
pub const MIP_IFRAME: &str = "mip-iframe";
pub const MIP_AUDIO: &str = "mip-audio";

/// Layout values understood by the framework.
pub const LAYOUTS: &[&str] = &[
    "nodisplay",
    "fixed",
    "responsive",
    "fixed-height",
    "fill",
    "container",
    "flex-item",
    "intrinsic",
];

const DEFAULT_LAYOUT: &str = "responsive";
const DEFAULT_WIDTH: u32 = 600;
const DEFAULT_HEIGHT: u32 = 400;
const DEFAULT_SANDBOX: &str = "allow-script allow-same-origin";
const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; miperize)";

// ============================================================================
// Resolved configuration
// ============================================================================

/// Attribute defaults for one target tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDefaults {
    pub layout: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<String>,
}

impl Default for TagDefaults {
    fn default() -> Self {
        Self {
            layout: DEFAULT_LAYOUT.to_string(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            sandbox: None,
        }
    }
}

impl TagDefaults {
    fn apply(&mut self, patch: TagOverride) {
        if let Some(layout) = patch.layout {
            self.layout = layout;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(sandbox) = patch.sandbox {
            self.sandbox = Some(sandbox);
        }
    }
}

/// Remote image probe settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Inactivity timeout for the request and every body chunk.
    pub timeout_ms: u64,
    /// Sent as `User-Agent`; some origins reject unidentified clients.
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Resolved configuration, immutable once handed to an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MipConfig {
    pub tags: BTreeMap<String, TagDefaults>,
    pub probe: ProbeConfig,
}

impl Default for MipConfig {
    fn default() -> Self {
        let media = TagDefaults::default();
        let iframe = TagDefaults {
            sandbox: Some(DEFAULT_SANDBOX.to_string()),
            ..TagDefaults::default()
        };

        let tags = BTreeMap::from([
            (MIP_IMG.to_string(), media.clone()),
            (MIP_ANIM.to_string(), media),
            (MIP_IFRAME.to_string(), iframe),
        ]);

        Self {
            tags,
            probe: ProbeConfig::default(),
        }
    }
}

impl MipConfig {
    /// Built-in defaults with `overrides` deep-merged on top, validated.
    pub fn merged(overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.merge(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML overrides and merge them over the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let overrides: ConfigOverrides = toml::from_str(content)?;
        Self::merged(overrides)
    }

    /// Parse a JSON options object and merge it over the defaults.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let overrides: ConfigOverrides = serde_json::from_str(content)?;
        Self::merged(overrides)
    }

    /// Load TOML overrides from a file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&content)
    }

    /// Deep-merge `overrides`: only the fields that are present replace
    /// existing values. Unknown tag names start from the media defaults.
    pub fn merge(&mut self, overrides: ConfigOverrides) {
        for (name, patch) in overrides.tags {
            if !self.tags.contains_key(&name) {
                log!("hint"; "adding defaults for new tag `{}`", name);
            }
            self.tags.entry(name).or_default().apply(patch);
        }

        if let Some(probe) = overrides.probe {
            if let Some(timeout_ms) = probe.timeout_ms {
                self.probe.timeout_ms = timeout_ms;
            }
            if let Some(user_agent) = probe.user_agent {
                self.probe.user_agent = user_agent;
            }
        }
    }

    /// Defaults for a target tag.
    #[inline]
    pub fn tag(&self, name: &str) -> Option<&TagDefaults> {
        self.tags.get(name)
    }

    /// Validate every tag entry and the probe settings.
    ///
    /// # Checks
    ///
    /// - `width` and `height` are positive
    /// - `layout` is one of [`LAYOUTS`]
    /// - `probe.timeout_ms` is positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        for (name, tag) in &self.tags {
            if tag.width == 0 {
                problems.push(format!("[{name}] width must be greater than 0"));
            }
            if tag.height == 0 {
                problems.push(format!("[{name}] height must be greater than 0"));
            }
            if !LAYOUTS.contains(&tag.layout.as_str()) {
                problems.push(format!(
                    "[{name}] unknown layout `{}`, expected one of: {}",
                    tag.layout,
                    LAYOUTS.join(", ")
                ));
            }
        }

        if self.probe.timeout_ms == 0 {
            problems.push("[probe] timeout_ms must be greater than 0".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(problems.join("; ")))
        }
    }
}

// ============================================================================
// Overrides
// ============================================================================

/// Partial tag entry supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagOverride {
    pub layout: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sandbox: Option<String>,
}

impl TagOverride {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(mut self, layout: impl Into<String>) -> Self {
        self.layout = Some(layout.into());
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn sandbox(mut self, sandbox: impl Into<String>) -> Self {
        self.sandbox = Some(sandbox.into());
        self
    }
}

/// Partial probe settings supplied by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeOverride {
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

/// Caller-supplied configuration, keyed by target tag name
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub probe: Option<ProbeOverride>,
    #[serde(flatten)]
    pub tags: BTreeMap<String, TagOverride>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(mut self, name: impl Into<String>, patch: TagOverride) -> Self {
        self.tags.insert(name.into(), patch);
        self
    }

    pub fn probe_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.probe.get_or_insert_with(ProbeOverride::default).timeout_ms = Some(timeout_ms);
        self
    }
}
