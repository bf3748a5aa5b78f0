//! `multipart/signed` envelope assembly.
//!
//! Wraps the signed content part and the detached signature in a new root and
//! hoists the envelope-level headers (addressing, subject, ...) onto it.

use crate::domain::cms::SignedEnvelope;
use crate::domain::constants;
use crate::domain::mime::{Body, MimeNode};

/// Headers that describe the content itself and stay on the nested part.
const CONTENT_LOCAL_HEADERS: &[&str] = &["content-type", "content-transfer-encoding"];

pub struct EnvelopeAssembler; // stateless

impl Default for EnvelopeAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeAssembler {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Move the envelope-level headers off `node`, leaving only the
    /// headers that describe its content.
    pub fn split_envelope_headers(&self, node: &mut MimeNode) -> Vec<(String, String)> {
        let hoisted = node.take_headers_except(CONTENT_LOCAL_HEADERS);
        log::debug!(
            "Hoisting {} header(s) to multipart/signed root",
            hoisted.len()
        );
        hoisted
    }

    /// Build the new message root from the content part (already stripped by
    /// [`split_envelope_headers`](Self::split_envelope_headers)), the headers
    /// taken off it and the detached signature.
    #[must_use]
    pub fn assemble(
        &self,
        content: MimeNode,
        envelope_headers: Vec<(String, String)>,
        signature: SignedEnvelope,
    ) -> MimeNode {
        let signature_part = MimeNode::binary(
            format!(
                "{}; name=\"{}\"",
                constants::PKCS7_SIGNATURE_TYPE,
                constants::SIGNATURE_FILENAME
            ),
            signature.into_der(),
        )
        .with_header(
            "Content-Disposition",
            format!("attachment; filename=\"{}\"", constants::SIGNATURE_FILENAME),
        )
        .with_header("Content-Description", "S/MIME Cryptographic Signature");

        let mut root = MimeNode::new(
            constants::MULTIPART_SIGNED,
            Body::Multipart(vec![content, signature_part]),
        );
        root.prepend_headers(envelope_headers);
        root
    }
}
