//! Service layer module root.
//! Contains identity resolution, canonicalization, CMS signing and envelope assembly.

pub mod canonicalizer;
pub mod content_signer;
pub mod envelope_assembler;
pub mod identity_cache;
pub mod identity_resolver;

pub use canonicalizer::{normalize_line_endings, Canonicalizer};
pub use content_signer::{detach_content, ContentSigner};
pub use envelope_assembler::EnvelopeAssembler;
pub use identity_cache::IdentityCache;
pub use identity_resolver::IdentityResolver;
