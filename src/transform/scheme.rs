//! Secure-scheme rewriting for `src` attributes.
//!
//! The framework's validator rejects resources loaded over plain HTTP, so
//! every `src` we can fix is moved to `https`. Forms we cannot fix (relative
//! paths, data URIs) are left alone and may still fail validation.

use crate::dom::Element;

const HTTP: &str = "http://";
const HTTPS: &str = "https://";

/// Rewrite `src` to a secure scheme in place, if it has one we can upgrade.
pub fn upgrade_src(elem: &mut Element) {
    let Some(src) = elem.get_attr("src") else {
        return;
    };

    if let Some(upgraded) = secure_url(src) {
        elem.set_attr("src", upgraded);
    }
}

/// The `https` form of `url`, or `None` when it is already secure or
/// cannot be upgraded.
pub fn secure_url(url: &str) -> Option<String> {
    if url.starts_with(HTTPS) {
        return None;
    }
    if let Some(rest) = url.strip_prefix(HTTP) {
        return Some(format!("{HTTPS}{rest}"));
    }
    // Protocol-relative embeds (`//giphy.com/embed/...`)
    if url.starts_with("//") {
        return Some(format!("https:{url}"));
    }
    None
}
