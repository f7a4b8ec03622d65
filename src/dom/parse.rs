//! `tl` document -> owned node tree.
//!
//! The source first goes through [`balance`](super::balance), which makes
//! the markup well-formed for `tl`; the `tl` tree is then copied into owned
//! nodes and the raw-text bodies taken out by the pre-pass are put back.

use tl::NodeHandle;

use super::balance::{Balanced, RAW_TEXT_ELEMENTS, balance, split_prolog};
use super::render::{opening_tag_attributes, parse_attributes};
use super::{Attrs, Element, Node};
use crate::error::TransformError;

/// Element under construction and the child handles still to convert
struct Pending {
    element: Element,
    children: std::vec::IntoIter<NodeHandle>,
}

/// Parse `html` into an owned tree.
///
/// Conversion uses an explicit stack, so nesting depth is bounded by heap
/// rather than call stack. Tag and attribute names are lowercased; text and
/// attribute values are kept verbatim. A leading `<!doctype>` is kept as a
/// text node.
pub fn parse_document(html: &str) -> Result<Vec<Node>, TransformError> {
    let (prolog, markup) = split_prolog(html);
    let Balanced { source, raw_bodies } = balance(markup);

    let dom = tl::parse(&source, tl::ParserOptions::default())
        .map_err(|e| TransformError::Parse(format!("{e:?}")))?;
    let parser = dom.parser();

    let mut roots = Vec::new();
    if !prolog.is_empty() {
        roots.push(Node::Text(prolog.to_string()));
    }

    let mut top_level = dom.children().to_vec().into_iter();
    let mut stack: Vec<Pending> = Vec::new();

    loop {
        let next = match stack.last_mut() {
            Some(pending) => pending.children.next(),
            None => top_level.next(),
        };

        let Some(handle) = next else {
            match stack.pop() {
                Some(done) => attach(&mut stack, &mut roots, Node::Element(done.element)),
                None => break,
            }
            continue;
        };

        let Some(node) = handle.get(parser) else {
            continue;
        };

        match node {
            tl::Node::Tag(tag) => {
                let mut element = convert_tag(tag);

                if RAW_TEXT_ELEMENTS.contains(&element.name.as_str()) {
                    let body = raw_body(&tag.inner_text(parser), &raw_bodies);
                    if !body.is_empty() {
                        element.children.push(Node::Text(body));
                    }
                    attach(&mut stack, &mut roots, Node::Element(element));
                    continue;
                }

                let children: Vec<NodeHandle> = tag.children().top().iter().copied().collect();
                stack.push(Pending {
                    element,
                    children: children.into_iter(),
                });
            }
            tl::Node::Raw(bytes) => {
                let text = bytes.as_utf8_str().into_owned();
                attach(&mut stack, &mut roots, Node::Text(text));
            }
            tl::Node::Comment(bytes) => {
                let comment = bytes.as_utf8_str().into_owned();
                attach(&mut stack, &mut roots, Node::Comment(comment));
            }
        }
    }

    Ok(roots)
}

/// Add a finished node to the innermost open element, or to the roots.
fn attach(stack: &mut [Pending], roots: &mut Vec<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.element.children.push(node),
        None => roots.push(node),
    }
}

fn convert_tag(tag: &tl::HTMLTag<'_>) -> Element {
    let name = tag.name().as_utf8_str().to_lowercase();

    // `tl` does not keep attribute order; read them from the source text
    let raw = tag.raw().as_utf8_str();
    let attrs: Attrs = parse_attributes(opening_tag_attributes(&raw))
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value))
        .collect();

    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

/// The raw-text body stored under the index `marker`.
fn raw_body(marker: &str, bodies: &[String]) -> String {
    marker
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|index| bodies.get(index))
        .cloned()
        .unwrap_or_else(|| marker.to_string())
}
