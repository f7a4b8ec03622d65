//! `layout` attribute computation.

use crate::dom::Element;

/// Media narrower than this would be stretched by a responsive layout.
pub const FIXED_LAYOUT_MAX_WIDTH: f64 = 300.0;

/// Set `layout` unless the element already carries one.
///
/// A numeric `width` below [`FIXED_LAYOUT_MAX_WIDTH`] forces `fixed`;
/// otherwise `default_layout` is used. Widths that are not plain numbers
/// (`auto`, `50px`) count as absent.
pub fn apply_layout(elem: &mut Element, default_layout: &str) {
    if elem.has_value("layout") {
        return;
    }

    let layout = match elem.get_attr("width").and_then(parse_width) {
        Some(width) if width < FIXED_LAYOUT_MAX_WIDTH => "fixed",
        _ => default_layout,
    };
    elem.set_attr("layout", layout);
}

fn parse_width(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|w| w.is_finite())
}
