//! Source pre-pass that makes lenient HTML well-formed for `tl`.
//!
//! `tl` nests elements by exact end tags: an end tag that does not match
//! the innermost open element is dropped, only lowercase void elements are
//! recognized, optional end tags never close and script bodies are read as
//! markup. The pre-pass tracks the open elements itself and rewrites the
//! source so that every element `tl` sees is closed explicitly:
//!
//! - start and end tag names are lowercased
//! - end tags implied by a start tag (`<p>`, `<li>`, `<td>`, ...) are inserted
//! - an end tag also closes everything opened inside its element; an end
//!   tag that matches no open element is dropped
//! - raw-text bodies are replaced by their index in a side table
//! - a `<` that starts no tag is written as `&lt;`
//! - markup declarations and processing instructions are split off as the
//!   prolog when leading, and dropped elsewhere

use super::render::is_void_element;

/// Elements whose content is text up to the matching end tag.
pub const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Balanced source plus the raw-text bodies taken out of it
#[derive(Debug, Default)]
pub struct Balanced {
    pub source: String,
    pub raw_bodies: Vec<String>,
}

/// Rewrite `markup` so that its element structure survives `tl`.
pub fn balance(markup: &str) -> Balanced {
    let mut balancer = Balancer::default();

    let mut rest = markup;
    while let Some(lt) = rest.find('<') {
        let (text, tail) = rest.split_at(lt);
        balancer.out.source.push_str(text);
        rest = balancer.token(tail);
    }
    balancer.out.source.push_str(rest);

    balancer.out
}

#[derive(Default)]
struct Balancer {
    out: Balanced,
    /// Names of the elements currently open, innermost last.
    open: Vec<String>,
}

impl Balancer {
    /// Consume the token at the start of `tail` and return what follows it.
    fn token<'a>(&mut self, tail: &'a str) -> &'a str {
        if let Some(comment) = tail.strip_prefix("<!--") {
            let len = comment.find("-->").map_or(tail.len(), |end| end + 7);
            self.out.source.push_str(&tail[..len]);
            return &tail[len..];
        }

        match tail[1..].chars().next() {
            Some('!' | '?') => &tail[tag_len(tail)..],
            Some('/') => {
                let len = tag_len(tail);
                self.end_tag(&tail[2..len]);
                &tail[len..]
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let len = tag_len(tail);
                self.start_tag(&tail[1..len], &tail[len..])
            }
            _ => {
                self.out.source.push_str("&lt;");
                &tail[1..]
            }
        }
    }

    /// `token` runs from the tag name through the closing `>`.
    fn start_tag<'a>(&mut self, token: &str, rest: &'a str) -> &'a str {
        let name = tag_name(token);
        let body = &token[name.len()..];
        let mut attrs = body.strip_suffix('>').unwrap_or(body);

        while self
            .open
            .last()
            .is_some_and(|top| ends_implicitly(top, &name))
        {
            self.close_to(self.open.len() - 1);
        }

        let raw_text = RAW_TEXT_ELEMENTS.contains(&name.as_str());
        if raw_text {
            // a self-closing slash does not end a raw-text element
            attrs = attrs.trim_end().trim_end_matches('/');
        }
        let self_closing = attrs.trim_end().ends_with('/');

        let source = &mut self.out.source;
        source.push('<');
        source.push_str(&name);
        if !attrs.is_empty() && !attrs.starts_with(char::is_whitespace) {
            source.push(' ');
        }
        source.push_str(attrs);
        source.push('>');

        if raw_text {
            let end = find_end_tag(rest, &name).unwrap_or(rest.len());
            source.push_str(&self.out.raw_bodies.len().to_string());
            self.out.raw_bodies.push(rest[..end].to_string());
            self.open.push(name);
            return &rest[end..];
        }

        if !is_void_element(&name) && !self_closing {
            self.open.push(name);
        }
        rest
    }

    /// `token` runs from after `</` through the closing `>`.
    fn end_tag(&mut self, token: &str) {
        let name = tag_name(token);
        if let Some(depth) = self.open.iter().rposition(|open| *open == name) {
            self.close_to(depth);
        }
    }

    /// Close open elements until `depth` remain.
    fn close_to(&mut self, depth: usize) {
        while self.open.len() > depth {
            if let Some(name) = self.open.pop() {
                self.out.source.push_str("</");
                self.out.source.push_str(&name);
                self.out.source.push('>');
            }
        }
    }
}

/// Whether a start tag `next` implies the end tag of the open element `open`.
fn ends_implicitly(open: &str, next: &str) -> bool {
    match open {
        "p" => matches!(
            next,
            "address"
                | "article"
                | "aside"
                | "blockquote"
                | "dd"
                | "details"
                | "div"
                | "dl"
                | "dt"
                | "fieldset"
                | "figcaption"
                | "figure"
                | "footer"
                | "form"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "header"
                | "hgroup"
                | "hr"
                | "li"
                | "main"
                | "menu"
                | "nav"
                | "ol"
                | "p"
                | "pre"
                | "section"
                | "table"
                | "ul"
        ),
        "li" => next == "li",
        "dt" | "dd" => matches!(next, "dt" | "dd"),
        "option" => matches!(next, "option" | "optgroup"),
        "optgroup" => next == "optgroup",
        "tr" => matches!(next, "tr" | "tbody" | "thead" | "tfoot"),
        "td" | "th" => matches!(next, "td" | "th" | "tr" | "tbody" | "thead" | "tfoot"),
        "thead" | "tbody" => matches!(next, "tbody" | "tfoot"),
        _ => false,
    }
}

/// Lowercased tag name at the start of `token`.
fn tag_name(token: &str) -> String {
    let end = token
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(token.len());
    token[..end].to_ascii_lowercase()
}

/// Length of the tag starting at `tag`, through the first `>` outside quotes.
fn tag_len(tag: &str) -> usize {
    let mut quote = None;
    for (i, c) in tag.char_indices().skip(1) {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    tag.len()
}

/// Byte offset of the end tag of `name` in `text`, case-insensitively.
fn find_end_tag(text: &str, name: &str) -> Option<usize> {
    let lower = text.to_ascii_lowercase();
    let needle = format!("</{name}");

    let mut from = 0;
    while let Some(i) = lower[from..].find(&needle) {
        let at = from + i;
        let after = lower.as_bytes().get(at + needle.len());
        if after.is_none_or(|b| b.is_ascii_whitespace() || *b == b'>' || *b == b'/') {
            return Some(at);
        }
        from = at + needle.len();
    }
    None
}

/// Split leading markup declarations off `html`.
///
/// The prolog runs up to the end of the last `<!...>` or `<?...?>`
/// declaration preceded only by whitespace, comments and other
/// declarations. Without one the prolog is empty.
pub fn split_prolog(html: &str) -> (&str, &str) {
    let mut end = 0;
    let mut cursor = 0;

    loop {
        let rest = &html[cursor..];
        let trimmed = rest.trim_start();
        let start = cursor + (rest.len() - trimmed.len());

        let (len, declaration) = if trimmed.starts_with("<!--") {
            match trimmed.find("-->") {
                Some(i) => (i + 3, false),
                None => break,
            }
        } else if trimmed.starts_with("<!") || trimmed.starts_with("<?") {
            match trimmed.find('>') {
                Some(i) => (i + 1, true),
                None => break,
            }
        } else {
            break;
        };

        cursor = start + len;
        if declaration {
            end = cursor;
        }
    }

    html.split_at(end)
}
