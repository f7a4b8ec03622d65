//! HTML serialization for owned nodes.
//!
//! Text and attribute values are kept as raw source text (the parser does
//! not decode entities), so only the attribute quote character needs
//! escaping on the way out.

use std::borrow::Cow;

use super::Element;

/// Check if an HTML tag is a void element (no close tag).
#[inline]
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Escape the double quote inside an attribute value.
#[inline]
fn escape_quotes(s: &str) -> Cow<'_, str> {
    if s.contains('"') {
        Cow::Owned(s.replace('"', "&quot;"))
    } else {
        Cow::Borrowed(s)
    }
}

/// Append `<name key="value" ...>` to `out`.
///
/// Boolean attributes are written with an empty value (`autoplay=""`).
pub fn render_open_tag(elem: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&elem.name);
    for (key, value) in elem.attrs.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_quotes(value));
        out.push('"');
    }
    out.push('>');
}

/// The close tag for `elem`, or `None` for void elements.
pub fn close_tag(elem: &Element) -> Option<String> {
    if is_void_element(&elem.name) {
        None
    } else {
        Some(format!("</{}>", elem.name))
    }
}

/// Append a comment to `out`, adding delimiters if the parser stripped them.
pub fn render_comment(comment: &str, out: &mut String) {
    if comment.starts_with("<!--") {
        out.push_str(comment);
    } else {
        out.push_str("<!--");
        out.push_str(comment);
        out.push_str("-->");
    }
}

// =============================================================================
// Attribute Parsing
// =============================================================================

/// Parse HTML-style attributes from a string.
///
/// Input: `src="a.png" width=100 controls`
/// Output: `vec![("src", "a.png"), ("width", "100"), ("controls", "")]`
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        // Read attribute name
        let mut name = String::new();
        name.push(c);
        while let Some(&next) = chars.peek() {
            if next == '=' || next == '/' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        if chars.peek() != Some(&'=') {
            // Boolean attribute
            attrs.push((name, String::new()));
            continue;
        }
        chars.next();

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let value: String = match chars.peek().copied() {
            Some(quote @ ('"' | '\'')) => {
                chars.next();
                chars.by_ref().take_while(|&c| c != quote).collect()
            }
            _ => {
                let mut val = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    val.push(c);
                    chars.next();
                }
                val
            }
        };

        attrs.push((name, value));
    }

    attrs
}

/// The attribute section of the first tag in `raw`: everything between the
/// tag name and the first `>` outside of quotes.
pub fn opening_tag_attributes(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix('<') else {
        return "";
    };
    let name_end = rest
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(rest.len());
    let rest = &rest[name_end..];

    let mut quote = None;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return &rest[..i],
            _ => {}
        }
    }
    rest
}
