//! Per-tag rewrite rules.
//!
//! | Source tag | Target                    | Sizing                                  |
//! |------------|---------------------------|-----------------------------------------|
//! | `img`      | `mip-img` / `mip-anim`    | probed (remote) or defaults (local)     |
//! | `iframe`   | `mip-iframe`              | defaults fill missing width/height      |
//! | `audio`    | `mip-audio`               | untouched                               |
//! | other      | unchanged                 | untouched                               |
//!
//! Every rule upgrades `src` to `https` where possible.

use url::Url;

use super::CallId;
use super::layout::apply_layout;
use super::scheme::upgrade_src;
use crate::config::{MIP_ANIM, MIP_AUDIO, MIP_IFRAME, MIP_IMG, MipConfig, TagDefaults};
use crate::debug;
use crate::dom::Element;
use crate::error::TransformError;
use crate::probe::{Decode, Fetch, ImageProber};

/// Attributes that make an image fully sized already.
const SIZING_ATTRS: [&str; 3] = ["width", "height", "layout"];

/// Applies the rewrite rules to one element at a time
pub struct RuleEngine<'a, F, D> {
    config: &'a MipConfig,
    prober: &'a ImageProber<F, D>,
    call: CallId,
}

impl<'a, F: Fetch, D: Decode> RuleEngine<'a, F, D> {
    pub fn new(config: &'a MipConfig, prober: &'a ImageProber<F, D>, call: CallId) -> Self {
        Self {
            config,
            prober,
            call,
        }
    }

    /// Finalize the name and attributes of `elem` before it is rendered.
    pub async fn enter(&self, elem: &mut Element) -> Result<(), TransformError> {
        match elem.name.as_str() {
            "img" => self.image(elem).await,
            "iframe" => self.iframe(elem),
            "audio" => {
                elem.name = MIP_AUDIO.to_string();
                upgrade_src(elem);
                Ok(())
            }
            _ => {
                upgrade_src(elem);
                Ok(())
            }
        }
    }

    fn defaults(&self, tag: &str) -> Result<&'a TagDefaults, TransformError> {
        self.config
            .tag(tag)
            .ok_or_else(|| TransformError::MissingTagDefaults(tag.to_string()))
    }

    async fn image(&self, elem: &mut Element) -> Result<(), TransformError> {
        let Some(src) = elem.get_attr("src").filter(|s| !s.is_empty()) else {
            return Ok(());
        };

        let target = if src.ends_with(".gif") { MIP_ANIM } else { MIP_IMG };
        let remote = remote_url(src);
        let defaults = self.defaults(target)?;

        elem.name = target.to_string();

        if SIZING_ATTRS.iter().all(|attr| elem.has_value(attr)) {
            upgrade_src(elem);
            return Ok(());
        }

        match remote {
            Some(url) => {
                debug!("probe"; "{} measuring {}", self.call, url);
                match self.prober.probe(&url).await {
                    Ok(dims) => {
                        debug!("probe"; "{} {} is {}x{}", self.call, url, dims.width, dims.height);
                        elem.set_attr("width", dims.width.to_string());
                        elem.set_attr("height", dims.height.to_string());
                    }
                    Err(err) => {
                        debug!("probe"; "{} {} failed ({}), keeping <img>", self.call, url, err);
                        elem.name = "img".to_string();
                        return Ok(());
                    }
                }
            }
            None => {
                elem.set_attr("width", defaults.width.to_string());
                elem.set_attr("height", defaults.height.to_string());
            }
        }

        apply_layout(elem, &defaults.layout);
        upgrade_src(elem);
        Ok(())
    }

    fn iframe(&self, elem: &mut Element) -> Result<(), TransformError> {
        if !elem.has_value("src") {
            return Ok(());
        }
        let defaults = self.defaults(MIP_IFRAME)?;

        elem.name = MIP_IFRAME.to_string();
        elem.set_attr_if_absent("width", defaults.width.to_string());
        elem.set_attr_if_absent("height", defaults.height.to_string());
        apply_layout(elem, &defaults.layout);
        if let Some(sandbox) = &defaults.sandbox {
            elem.set_attr_if_absent("sandbox", sandbox.as_str());
        }
        upgrade_src(elem);
        Ok(())
    }
}

/// `src` as an absolute `http`/`https` URL, the only kind worth probing.
fn remote_url(src: &str) -> Option<Url> {
    Url::parse(src)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}
