//! Opt-in, read-only identity cache.
//!
//! Resolving a PKCS#12 archive means file I/O plus key derivation and
//! decryption; a long-running sender can resolve once and share the result.
//! The cached `SigningIdentity` is handed out behind an `Arc` and is never
//! mutated after resolution.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::domain::identity::{RawIdentitySource, SigningIdentity};
use crate::infra::error::IdentityError;
use crate::services::identity_resolver::IdentityResolver;

pub struct IdentityCache {
    source: RawIdentitySource,
    cell: OnceCell<Arc<SigningIdentity>>,
}

impl IdentityCache {
    #[must_use]
    pub fn new(source: RawIdentitySource) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    /// Resolve on first use; later calls share the same identity.
    ///
    /// A failed resolution is not cached, so the next call retries.
    pub async fn get(&self) -> Result<Arc<SigningIdentity>, IdentityError> {
        let identity = self
            .cell
            .get_or_try_init(|| async {
                log::debug!("Identity cache miss, resolving {} source", self.source.kind());
                IdentityResolver::new()
                    .resolve(self.source.clone())
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(Arc::clone(identity))
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.initialized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::Passphrase;

    #[tokio::test]
    async fn failed_resolution_is_not_cached() {
        let cache = IdentityCache::new(RawIdentitySource::Pkcs12Archive {
            path: "/nonexistent/id.p12".into(),
            passphrase: Passphrase::new("secret"),
        });
        assert!(cache.get().await.is_err());
        assert!(!cache.is_resolved());
        assert!(cache.get().await.is_err());
    }
}
