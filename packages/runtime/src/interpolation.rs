//! `{expr}` interpolation with `{{` / `}}` escapes.
//!
//! Escapes are swapped for private-use placeholders before the `{expr}` scan
//! and restored afterwards, so `{{literal}}` renders as `{literal}`.

const OPEN_ESCAPE: char = '\u{E000}';
const CLOSE_ESCAPE: char = '\u{E001}';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Expression(String),
}

fn protect(text: &str) -> String {
    text.replace("{{", &OPEN_ESCAPE.to_string())
        .replace("}}", &CLOSE_ESCAPE.to_string())
}

fn restore(text: &str, inside_expression: bool) -> String {
    let (open, close) = if inside_expression { ("{{", "}}") } else { ("{", "}") };
    text.replace(OPEN_ESCAPE, open).replace(CLOSE_ESCAPE, close)
}

/// Byte offset of the `}` closing the `{` at `open`, skipping nested braces
/// and quoted strings
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (offset, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split `text` into literal runs and `{expr}` expressions
pub fn parse_segments(text: &str) -> Vec<Segment> {
    let protected = protect(text);
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while let Some(rel) = protected[pos..].find('{') {
        let open = pos + rel;
        let Some(close) = matching_brace(&protected, open) else {
            break;
        };
        literal.push_str(&protected[pos..open]);
        let expression = protected[open + 1..close].trim();
        if expression.is_empty() {
            literal.push_str(&protected[open..=close]);
        } else {
            if !literal.is_empty() {
                segments.push(Segment::Literal(restore(&literal, false)));
                literal.clear();
            }
            segments.push(Segment::Expression(restore(expression, true)));
        }
        pos = close + 1;
    }
    literal.push_str(&protected[pos..]);
    if !literal.is_empty() {
        segments.push(Segment::Literal(restore(&literal, false)));
    }
    segments
}

/// Whether `text` contains at least one `{expr}` run
pub fn has_interpolation(text: &str) -> bool {
    text.contains('{')
        && parse_segments(text)
            .iter()
            .any(|s| matches!(s, Segment::Expression(_)))
}

/// The inner expression when `text` is exactly one `{expr}`
pub fn whole_expression(text: &str) -> Option<String> {
    let mut segments = parse_segments(text.trim());
    match (segments.pop(), segments.is_empty()) {
        (Some(Segment::Expression(expression)), true) => Some(expression),
        _ => None,
    }
}

/// Directive values are always expressions; braces are optional
pub fn unwrap_braces(text: &str) -> String {
    whole_expression(text).unwrap_or_else(|| text.trim().to_string())
}

/// Substitute every `{expr}` with `render(expr)`
pub fn interpolate(text: &str, mut render: impl FnMut(&str) -> String) -> String {
    parse_segments(text)
        .into_iter()
        .map(|segment| match segment {
            Segment::Literal(literal) => literal,
            Segment::Expression(expression) => render(&expression),
        })
        .collect()
}
