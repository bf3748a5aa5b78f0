//! Line-ending canonicalization for text parts.
//!
//! S/MIME digests are computed over the canonical (CRLF) form so that relays
//! rewriting line endings do not break verification.

use std::borrow::Cow;

use crate::domain::mime::{Body, MimeNode};

pub struct Canonicalizer; // stateless

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canonicalizer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Normalize every `text/*` node with a textual body, depth first.
    ///
    /// Returns the number of text nodes visited.
    pub fn canonicalize(&self, node: &mut MimeNode) -> usize {
        let is_text = node.mime_type().starts_with("text/");
        match node.body_mut() {
            Body::Text(text) if is_text => {
                let replacement = match normalize_line_endings(text) {
                    Cow::Owned(normalized) => Some(normalized),
                    Cow::Borrowed(_) => None,
                };
                if let Some(normalized) = replacement {
                    *text = normalized;
                }
                1
            }
            Body::Multipart(children) => children
                .iter_mut()
                .map(|child| self.canonicalize(child))
                .sum(),
            _ => 0,
        }
    }
}

/// Rewrite `\r\n`, bare `\r` and bare `\n` as `\r\n`.
///
/// Borrows the input when it is already canonical.
#[must_use]
pub fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    let canonical = bytes.iter().enumerate().all(|(i, &b)| match b {
        b'\r' => bytes.get(i + 1) == Some(&b'\n'),
        b'\n' => i > 0 && bytes[i - 1] == b'\r',
        _ => true,
    });
    if canonical {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + text.len() / 16);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("\r\n");
            }
            '\n' => out.push_str("\r\n"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_bare_terminator(text: &str) -> bool {
        normalize_line_endings(text) != text
    }

    #[test]
    fn normalizes_all_terminators() {
        assert_eq!(normalize_line_endings("a\nb\rc\r\nd"), "a\r\nb\r\nc\r\nd");
        assert_eq!(normalize_line_endings("\r\r\n\n"), "\r\n\r\n\r\n");
        assert_eq!(normalize_line_endings("hello"), "hello");
    }

    #[test]
    fn canonical_input_is_borrowed() {
        assert!(matches!(
            normalize_line_endings("a\r\nb\r\n"),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn canonicalization_is_idempotent() {
        for input in ["x\ny", "\r", "\n\n\r", "a\r\n\rb", "plain"] {
            let once = normalize_line_endings(input).into_owned();
            let twice = normalize_line_endings(&once).into_owned();
            assert_eq!(once, twice, "input {input:?}");
            assert!(!has_bare_terminator(&once));
        }
    }

    #[test]
    fn walks_tree_and_skips_non_text() {
        let mut root = MimeNode::multipart("multipart/mixed");
        root.append_child(MimeNode::text("text/plain", "line1\nline2\n"))
            .unwrap();
        root.append_child(MimeNode::text("TEXT/HTML; charset=utf-8", "<p>\r</p>"))
            .unwrap();
        root.append_child(MimeNode::text("application/json", "{\n}"))
            .unwrap();
        root.append_child(MimeNode::binary("text/plain", b"raw\nbytes".to_vec()))
            .unwrap();

        let visited = Canonicalizer::new().canonicalize(&mut root);
        assert_eq!(visited, 2);

        let children = root.children();
        assert_eq!(children[0].body(), &Body::Text("line1\r\nline2\r\n".into()));
        assert_eq!(children[1].body(), &Body::Text("<p>\r\n</p>".into()));
        assert_eq!(children[2].body(), &Body::Text("{\n}".into()));
        assert_eq!(children[3].body(), &Body::Binary(b"raw\nbytes".to_vec()));
    }
}
