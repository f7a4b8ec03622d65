//! Order-preserving tree walk.
//!
//! The walk is a depth-first fold driven by an explicit stack of frames
//! instead of recursion. Each frame owns the remaining siblings of one level
//! and the close tag to emit when they are exhausted. Before descending into
//! an element's children the walker yields to the runtime, which keeps deep
//! documents off the call stack and lets pending timers and I/O of other
//! transformations make progress.
//!
//! Siblings are strictly sequential: the next sibling is not entered until
//! the previous one, including its whole subtree and any image probe, is done.

use std::vec::IntoIter;

use super::rules::RuleEngine;
use crate::dom::{Element, Node, close_tag, render_comment, render_open_tag};
use crate::error::TransformError;
use crate::probe::{Decode, Fetch};

/// One level of the walk
struct Frame {
    pending: IntoIter<Node>,
    close: Option<String>,
}

pub struct TreeWalker<'a, F, D> {
    rules: RuleEngine<'a, F, D>,
    out: String,
}

impl<'a, F: Fetch, D: Decode> TreeWalker<'a, F, D> {
    pub fn new(rules: RuleEngine<'a, F, D>) -> Self {
        Self {
            rules,
            out: String::new(),
        }
    }

    /// Rewrite and serialize `roots`, stopping at the first error.
    pub async fn walk(mut self, roots: Vec<Node>) -> Result<String, TransformError> {
        let mut stack = vec![Frame {
            pending: roots.into_iter(),
            close: None,
        }];

        while let Some(frame) = stack.last_mut() {
            let Some(node) = frame.pending.next() else {
                if let Some(close) = stack.pop().and_then(|done| done.close) {
                    self.out.push_str(&close);
                }
                continue;
            };

            match node {
                Node::Text(text) => self.out.push_str(&text),
                Node::Comment(comment) => render_comment(&comment, &mut self.out),
                Node::Element(elem) => {
                    if let Some(children) = self.visit(elem).await? {
                        tokio::task::yield_now().await;
                        stack.push(children);
                    }
                }
            }
        }

        Ok(self.out)
    }

    /// Run the rules on `elem` and emit its open tag.
    ///
    /// Returns the frame for its children, or `None` when the element is
    /// already complete.
    async fn visit(&mut self, mut elem: Element) -> Result<Option<Frame>, TransformError> {
        self.rules.enter(&mut elem).await?;

        render_open_tag(&elem, &mut self.out);
        let close = close_tag(&elem);

        if elem.children.is_empty() {
            if let Some(close) = close {
                self.out.push_str(&close);
            }
            return Ok(None);
        }

        Ok(Some(Frame {
            pending: std::mem::take(&mut elem.children).into_iter(),
            close,
        }))
    }
}
