//! Lenient HTML fragment parser.
//!
//! Handles the subset the runtime needs: elements with quoted or bare
//! attributes, void and self-closing elements, comments, raw-text `script`
//! and `style`, character references, and a few implied end tags. Malformed
//! input never fails; stray end tags are dropped and unclosed elements are
//! closed at the end of input.

use crate::document::Document;
use crate::node::{is_raw_text_element, is_void_element, NodeId};

struct Scanner<'src> {
    source: &'src str,
    pos: usize,
}

impl<'src> Scanner<'src> {
    fn rest(&self) -> &'src str {
        &self.source[self.pos..]
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, prefix: &str) -> bool {
        if self.rest().starts_with(prefix) {
            self.pos += prefix.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    /// Consume up to (not including) `needle`, or to the end of input
    fn take_until(&mut self, needle: &str) -> &'src str {
        let rest = self.rest();
        let len = rest.find(needle).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'src str {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.bump();
        }
        &self.source[start..self.pos]
    }
}

fn is_tag_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'
}

fn is_attribute_name_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'' | '<')
}

/// Whether opening `incoming` implicitly closes an open `current`
fn closes_implicitly(current: &str, incoming: &str) -> bool {
    match current {
        "li" => incoming == "li",
        "option" => matches!(incoming, "option" | "optgroup"),
        "tr" => incoming == "tr",
        "td" | "th" => matches!(incoming, "td" | "th" | "tr"),
        "p" => matches!(
            incoming,
            "p" | "div" | "ul" | "ol" | "table" | "section" | "header" | "footer" | "form" | "h1"
                | "h2" | "h3" | "h4" | "h5" | "h6"
        ),
        _ => false,
    }
}

/// Parse `html` and append the resulting nodes under `parent`.
/// Returns the top-level nodes created.
pub fn parse_into(document: &mut Document, parent: NodeId, html: &str) -> Vec<NodeId> {
    let mut scanner = Scanner {
        source: html,
        pos: 0,
    };
    let mut stack: Vec<(NodeId, String)> = Vec::new();
    let mut top_level = Vec::new();

    let mut attach = |document: &mut Document, stack: &[(NodeId, String)], node: NodeId| {
        let target = stack.last().map(|(id, _)| *id).unwrap_or(parent);
        if target == parent {
            top_level.push(node);
        }
        if let Err(error) = document.append_child(target, node) {
            tracing::warn!(%error, "failed to attach parsed node");
        }
    };

    while !scanner.is_eof() {
        if scanner.eat("<!--") {
            let content = scanner.take_until("-->");
            scanner.eat("-->");
            let comment = document.create_comment(content);
            attach(document, &stack, comment);
            continue;
        }

        if scanner.rest().starts_with("<!") || scanner.rest().starts_with("<?") {
            scanner.take_until(">");
            scanner.eat(">");
            continue;
        }

        if scanner.rest().starts_with("</") {
            scanner.eat("</");
            let name = scanner.take_while(is_tag_name_char).to_ascii_lowercase();
            scanner.take_until(">");
            scanner.eat(">");
            if let Some(index) = stack.iter().rposition(|(_, tag)| *tag == name) {
                stack.truncate(index);
            }
            continue;
        }

        let opens_tag = {
            let mut chars = scanner.rest().chars();
            chars.next() == Some('<') && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        };

        if opens_tag {
            scanner.eat("<");
            let tag = scanner.take_while(is_tag_name_char).to_ascii_lowercase();

            while let Some((_, open)) = stack.last() {
                if closes_implicitly(open, &tag) {
                    stack.pop();
                } else {
                    break;
                }
            }

            let element = document.create_element(&tag);
            let self_closing = parse_attributes(&mut scanner, document, element);
            attach(document, &stack, element);

            if is_raw_text_element(&tag) && !self_closing {
                let content = take_raw_text(&mut scanner, &tag);
                if !content.is_empty() {
                    let text = document.create_text(content);
                    if let Err(error) = document.append_child(element, text) {
                        tracing::warn!(%error, "failed to attach raw text");
                    }
                }
            } else if !self_closing && !is_void_element(&tag) {
                stack.push((element, tag));
            }
            continue;
        }

        // Text run; a `<` that does not start markup is literal
        let start = scanner.pos;
        scanner.bump();
        scanner.take_until("<");
        let text = decode_entities(&html[start..scanner.pos]);
        let node = document.create_text(&text);
        attach(document, &stack, node);
    }

    top_level
}

/// Parse attributes up to and including the closing `>`.
/// Returns whether the tag was written self-closing.
fn parse_attributes(scanner: &mut Scanner<'_>, document: &mut Document, element: NodeId) -> bool {
    loop {
        scanner.skip_whitespace();
        match scanner.peek() {
            None => return false,
            Some('>') => {
                scanner.bump();
                return false;
            }
            Some('/') => {
                scanner.bump();
                if scanner.eat(">") {
                    return true;
                }
                continue;
            }
            _ => {}
        }

        let name = scanner.take_while(is_attribute_name_char);
        if name.is_empty() {
            // Unparseable character, skip it
            scanner.bump();
            continue;
        }
        let name = name.to_ascii_lowercase();

        scanner.skip_whitespace();
        let value = if scanner.eat("=") {
            scanner.skip_whitespace();
            match scanner.peek() {
                Some(quote @ ('"' | '\'')) => {
                    scanner.bump();
                    let raw = scanner.take_until(if quote == '"' { "\"" } else { "'" });
                    scanner.bump();
                    decode_entities(raw)
                }
                _ => decode_entities(scanner.take_while(|c| !c.is_whitespace() && c != '>')),
            }
        } else {
            String::new()
        };

        if document.attribute(element, &name).is_none() {
            if let Err(error) = document.set_attribute(element, &name, &value) {
                tracing::warn!(%error, "failed to set parsed attribute");
            }
        }
    }
}

fn take_raw_text<'src>(scanner: &mut Scanner<'src>, tag: &str) -> &'src str {
    let rest = scanner.rest();
    let closing = format!("</{tag}");
    let end = rest
        .to_ascii_lowercase()
        .find(&closing)
        .unwrap_or(rest.len());
    scanner.pos += end;
    if !scanner.is_eof() {
        scanner.take_until(">");
        scanner.eat(">");
    }
    &rest[..end]
}

/// Decode the common named references plus numeric ones
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(index) = rest.find('&') {
        out.push_str(&rest[..index]);
        rest = &rest[index..];

        let decoded = rest.find(';').filter(|end| *end <= 10).and_then(|end| {
            let name = &rest[1..end];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name.strip_prefix('#').and_then(|num| {
                    let code = match num.strip_prefix(['x', 'X']) {
                        Some(hex) => u32::from_str_radix(hex, 16).ok(),
                        None => num.parse().ok(),
                    };
                    code.and_then(char::from_u32)
                }),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

impl Document {
    /// Parse an HTML fragment into a fresh document
    pub fn parse(html: &str) -> Self {
        let mut document = Document::new();
        let root = document.root();
        parse_into(&mut document, root, html);
        document
    }

    /// Parse `html` and append it under `parent`
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        parse_into(self, parent, html)
    }
}
