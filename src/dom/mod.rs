//! Owned document tree.
//!
//! The parser output is copied into plain owned nodes so the walker can move
//! each element out of its parent, mutate it during its visit and render it,
//! without any shared or reference-counted state.
//!
//! - `balance`: source pre-pass that makes lenient HTML well-formed for `tl`
//! - `parse`: `tl` document -> `Vec<Node>`
//! - `render`: open/close tag serialization

mod balance;
mod parse;
mod render;

pub use parse::parse_document;
pub use render::{close_tag, is_void_element, render_comment, render_open_tag};

/// A parsed markup unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Raw text, kept exactly as it appeared in the source.
    Text(String),
    Comment(String),
}

/// An element with a renamable tag and exclusively owned children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Attrs,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Attrs::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.set(key, value);
        self
    }

    #[inline]
    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key)
    }

    /// Attribute is present and not empty.
    #[inline]
    pub fn has_value(&self, key: &str) -> bool {
        self.get_attr(key).is_some_and(|v| !v.is_empty())
    }

    #[inline]
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.set(key, value);
    }

    /// Set `key` only when the element has no value for it yet.
    pub fn set_attr_if_absent(&mut self, key: &str, value: impl Into<String>) {
        if !self.has_value(key) {
            self.attrs.set(key, value);
        }
    }
}

/// Attribute list in source order.
///
/// Keys are unique; setting an existing key replaces its value in place so
/// output keeps the author's ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attrs(Vec<(String, String)>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Collects attributes as the browser reads them: the first occurrence of a
/// key wins and later duplicates are dropped.
impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        for (k, v) in iter {
            let key = k.into();
            if attrs.get(&key).is_none() {
                attrs.0.push((key, v.into()));
            }
        }
        attrs
    }
}
