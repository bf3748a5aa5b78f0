//! `SignWorkflow` orchestrates the signing pipeline.
//!
//! canonicalize -> hoist envelope headers -> build content part -> sign
//! (blocking pool) -> assemble. Every stage short-circuits on error and no
//! partially signed tree is ever returned.

use crate::{
    domain::{cms::SignatureMode, identity::SigningIdentity, mime::MimeNode},
    services::{
        canonicalizer::Canonicalizer, content_signer::ContentSigner,
        envelope_assembler::EnvelopeAssembler,
    },
    SignError, SmimeError, SmimeResult,
};

const RECIPIENT_HEADERS: &[&str] = &["to", "cc", "bcc"];

pub struct SignWorkflow {
    signer: ContentSigner,
    require_recipients: bool,
}

impl SignWorkflow {
    #[must_use]
    pub fn new(mode: SignatureMode) -> Self {
        Self {
            signer: ContentSigner::new(mode),
            require_recipients: true,
        }
    }

    /// Refuse messages without `To`/`Cc`/`Bcc` (default: on).
    #[must_use]
    pub fn with_require_recipients(mut self, require: bool) -> Self {
        self.require_recipients = require;
        self
    }

    #[must_use]
    pub fn mode(&self) -> SignatureMode {
        self.signer.mode()
    }

    /// Sign `message` and return the `multipart/signed` root replacing it.
    pub async fn sign_message(
        &self,
        mut message: MimeNode,
        identity: &SigningIdentity,
    ) -> SmimeResult<MimeNode> {
        if self.require_recipients && !has_recipients(&message) {
            return Err(SmimeError::Configuration(
                "No recipients defined".to_string(),
            ));
        }

        // 1. Canonical line endings for text parts
        let text_parts = Canonicalizer::new().canonicalize(&mut message);
        log::debug!("Canonicalized {text_parts} text part(s)");

        // 2. Envelope headers leave the content part before it is built, so the
        //    signed bytes are exactly the nested part as transmitted.
        let assembler = EnvelopeAssembler::new();
        let hoisted = assembler.split_envelope_headers(&mut message);

        // 3. Serialize the content part
        let content = message.build().await?;
        log::info!("Built content part for signing: {} bytes", content.len());

        // 4. Detached CMS signature, off the async executor
        let signer = self.signer;
        let identity = identity.clone();
        let envelope =
            tokio::task::spawn_blocking(move || signer.sign(&content, &identity))
                .await
                .map_err(|e| SignError::SigningFailed(format!("signing task aborted: {e}")))??;

        // 5. multipart/signed root
        let root = assembler.assemble(message, hoisted, envelope);
        log::info!("Assembled multipart/signed message");
        Ok(root)
    }
}

fn has_recipients(message: &MimeNode) -> bool {
    RECIPIENT_HEADERS.iter().any(|name| {
        message
            .header(name)
            .is_some_and(|value| !value.trim().is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct_workflow() {
        let wf = SignWorkflow::new(SignatureMode::Minimal);
        assert_eq!(wf.mode(), SignatureMode::Minimal);
        assert!(wf.require_recipients);
    }

    #[test]
    fn recipient_detection() {
        let no_rcpt = MimeNode::text("text/plain", "x").with_header("Subject", "Hi");
        assert!(!has_recipients(&no_rcpt));
        let blank = MimeNode::text("text/plain", "x").with_header("To", "  ");
        assert!(!has_recipients(&blank));
        let bcc = MimeNode::text("text/plain", "x").with_header("Bcc", "a@example.com");
        assert!(has_recipients(&bcc));
    }

    // Full pipeline tests with real key material are in tests/
}
