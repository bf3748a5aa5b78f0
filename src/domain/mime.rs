//! Buildable MIME node tree.
//!
//! `MimeNode` is the message abstraction the signing pipeline consumes: a
//! content type, an ordered header list, and either an inline/streamed body
//! or child nodes. Composing the unsigned message (addresses, attachments,
//! encodings) is the caller's job.
//!
//! `build` serializes a node and its descendants. Multipart boundaries are
//! fixed when the node is constructed so repeated builds are byte-identical,
//! which is what lets the signature computed over one build verify against
//! the bytes emitted by the final one.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use base64::Engine;

use crate::domain::constants::BASE64_LINE_LENGTH;
use crate::infra::error::BuildError;

/// Boxed future returned by [`MimeNode::build`].
pub type BuildFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, BuildError>> + Send + 'a>>;

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Textual content, written verbatim.
    Text(String),
    /// Pre-encoded or binary content, base64 encoded at build time.
    Binary(Vec<u8>),
    /// Attachment streamed from disk at build time, base64 encoded.
    File(PathBuf),
    /// Child parts.
    Multipart(Vec<MimeNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeNode {
    headers: Vec<(String, String)>,
    body: Body,
}

impl MimeNode {
    /// Create a node with the given `Content-Type` header value.
    ///
    /// Multipart nodes without a `boundary` parameter get a random one.
    #[must_use]
    pub fn new(content_type: impl Into<String>, body: Body) -> Self {
        let mut content_type = content_type.into();
        if matches!(body, Body::Multipart(_)) && !has_param(&content_type, "boundary") {
            content_type = format!("{content_type}; boundary=\"{}\"", generate_boundary());
        }
        Self {
            headers: vec![("Content-Type".to_string(), content_type)],
            body,
        }
    }

    #[must_use]
    pub fn text(content_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(content_type, Body::Text(text.into()))
    }

    #[must_use]
    pub fn binary(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(content_type, Body::Binary(bytes))
    }

    #[must_use]
    pub fn file(content_type: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(content_type, Body::File(path.into()))
    }

    #[must_use]
    pub fn multipart(content_type: impl Into<String>) -> Self {
        Self::new(content_type, Body::Multipart(Vec::new()))
    }

    /// Builder-style header append.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First value of a header, matched case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Replace the first header with this name, or append it.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Remove every header with this name, returning the removed pairs.
    pub fn remove_header(&mut self, name: &str) -> Vec<(String, String)> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.headers)
            .into_iter()
            .partition(|(key, _)| key.eq_ignore_ascii_case(name));
        self.headers = kept;
        removed
    }

    /// Move out every header whose name is not in `keep` (case-insensitive).
    pub fn take_headers_except(&mut self, keep: &[&str]) -> Vec<(String, String)> {
        let (kept, taken): (Vec<_>, Vec<_>) = std::mem::take(&mut self.headers)
            .into_iter()
            .partition(|(key, _)| keep.iter().any(|k| key.eq_ignore_ascii_case(k)));
        self.headers = kept;
        taken
    }

    /// Insert headers ahead of the existing ones, preserving their order.
    pub fn prepend_headers(&mut self, headers: Vec<(String, String)>) {
        let existing = std::mem::replace(&mut self.headers, headers);
        self.headers.extend(existing);
    }

    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Lower-cased media type without parameters; `text/plain` when absent.
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.header("content-type")
            .map(|value| {
                value
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase()
            })
            .unwrap_or_else(|| "text/plain".to_string())
    }

    /// Value of a `Content-Type` parameter, unquoted.
    #[must_use]
    pub fn content_type_param(&self, name: &str) -> Option<String> {
        self.header("content-type")
            .and_then(|value| param_value(value, name))
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Child nodes; empty for leaf nodes.
    #[must_use]
    pub fn children(&self) -> &[MimeNode] {
        match &self.body {
            Body::Multipart(children) => children,
            _ => &[],
        }
    }

    pub fn append_child(&mut self, child: MimeNode) -> Result<(), BuildError> {
        if let Body::Multipart(children) = &mut self.body {
            children.push(child);
            return Ok(());
        }
        Err(BuildError::NotMultipart(self.mime_type()))
    }

    /// Serialize this node and its descendants.
    ///
    /// File bodies are read asynchronously, so the whole build is a future.
    pub fn build(&self) -> BuildFuture<'_> {
        Box::pin(async move {
            let (body, needs_base64) = match &self.body {
                Body::Text(text) => (text.as_bytes().to_vec(), false),
                Body::Binary(bytes) => (encode_base64_lines(bytes), true),
                Body::File(path) => {
                    let bytes = tokio::fs::read(path).await.map_err(|e| BuildError::Io {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                    (encode_base64_lines(&bytes), true)
                }
                Body::Multipart(children) => {
                    let boundary = self
                        .content_type_param("boundary")
                        .ok_or(BuildError::MissingBoundary)?;
                    let mut out = Vec::new();
                    for child in children {
                        out.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
                        out.extend_from_slice(&child.build().await?);
                        out.extend_from_slice(b"\r\n");
                    }
                    out.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
                    (out, false)
                }
            };

            let mut out = Vec::with_capacity(body.len() + 256);
            for (name, value) in &self.headers {
                write_header(&mut out, name, value);
            }
            if needs_base64 && self.header("content-transfer-encoding").is_none() {
                write_header(&mut out, "Content-Transfer-Encoding", "base64");
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&body);
            Ok(out)
        })
    }
}

fn write_header(out: &mut Vec<u8>, name: &str, value: &str) {
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value.as_bytes());
    out.extend_from_slice(b"\r\n");
}

fn param_value(header_value: &str, name: &str) -> Option<String> {
    header_value.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

fn has_param(header_value: &str, name: &str) -> bool {
    param_value(header_value, name).is_some()
}

fn generate_boundary() -> String {
    format!("----=_smime_{}", hex::encode(rand::random::<[u8; 12]>()))
}

fn encode_base64_lines(bytes: &[u8]) -> Vec<u8> {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    let mut out = Vec::with_capacity(encoded.len() + encoded.len() / BASE64_LINE_LENGTH * 2 + 2);
    for line in encoded.as_bytes().chunks(BASE64_LINE_LENGTH) {
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}
