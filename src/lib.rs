//! S/MIME Signer Library
//!
//! Wraps an outgoing MIME message in a `multipart/signed` envelope carrying a
//! detached CMS `SignedData` signature (RSA, SHA-256). The signing identity
//! comes from PEM files, a PKCS#12 archive or already parsed objects.
//!
//! Layering follows the usual split:
//! - `domain`: MIME tree, identity, CMS envelope and OID constants
//! - `services`: stateless building blocks (resolver, canonicalizer, signer, assembler)
//! - `pipelines`: the `SignWorkflow` orchestration
//! - `infra`: errors and configuration

pub mod domain;
pub mod infra;
pub mod pipelines;
pub mod services;

pub use domain::cms::{SignatureMode, SignedEnvelope};
pub use domain::identity::{Passphrase, RawIdentitySource, SigningIdentity};
pub use domain::mime::{Body, MimeNode};
pub use infra::config::{ConfigManager, SmimeConfiguration};
pub use infra::error::{
    BuildError, IdentityError, KeyRole, SignError, SmimeError, SmimeResult,
};
pub use pipelines::sign::SignWorkflow;
pub use services::IdentityCache;

use std::sync::Arc;

/// Outgoing-mail hook: resolves the identity once and signs every message
/// handed to it.
pub struct SmimeSigner {
    identity: IdentityCache,
    workflow: SignWorkflow,
}

impl SmimeSigner {
    #[must_use]
    pub fn new(source: RawIdentitySource, mode: SignatureMode) -> Self {
        Self {
            identity: IdentityCache::new(source),
            workflow: SignWorkflow::new(mode),
        }
    }

    /// Build a signer from configuration; fails when no identity source is configured.
    pub fn from_config(config: &SmimeConfiguration) -> SmimeResult<Self> {
        let source = config.identity_source()?;
        Ok(Self {
            identity: IdentityCache::new(source),
            workflow: SignWorkflow::new(config.signature_mode)
                .with_require_recipients(config.require_recipients),
        })
    }

    #[must_use]
    pub fn with_require_recipients(mut self, require: bool) -> Self {
        self.workflow = self.workflow.with_require_recipients(require);
        self
    }

    /// The resolved signing identity (resolved on first call).
    pub async fn identity(&self) -> SmimeResult<Arc<SigningIdentity>> {
        Ok(self.identity.get().await?)
    }

    /// Sign `message`, returning the `multipart/signed` root that replaces it.
    pub async fn sign(&self, message: MimeNode) -> SmimeResult<MimeNode> {
        let identity = self.identity().await?;
        log::info!("Signing message as {}", identity.subject());
        self.workflow.sign_message(message, &identity).await
    }
}
