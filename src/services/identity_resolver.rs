//! Identity resolver service.
//!
//! Turns a `RawIdentitySource` into a validated `SigningIdentity`:
//! - direct objects are checked for key type and key/certificate pairing
//! - PEM file pairs are read and parsed independently, so failures name the
//!   offending file
//! - PKCS#12 archives are decoded, MAC-verified with the passphrase and
//!   searched for a certificate bag and a key bag. OpenSSL's parser walks
//!   every SafeBag and accepts both the plain `keyBag` and the
//!   `pkcs8ShroudedKeyBag` forms.

use std::io::ErrorKind;
use std::path::Path;

use openssl::error::ErrorStack;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, Private};
use openssl::x509::X509;

use crate::domain::identity::{Passphrase, RawIdentitySource, SigningIdentity};
use crate::infra::error::{IdentityError, KeyRole};

pub struct IdentityResolver; // stateless

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolve and validate the identity described by `source`.
    pub async fn resolve(
        &self,
        source: RawIdentitySource,
    ) -> Result<SigningIdentity, IdentityError> {
        log::info!("Resolving signing identity from {} source", source.kind());
        let identity = match source {
            RawIdentitySource::DirectPem {
                certificate,
                private_key,
                chain,
            } => validate(certificate, private_key, chain)?,
            RawIdentitySource::SeparateFiles {
                cert_path,
                key_path,
                chain_paths,
            } => self.resolve_files(&cert_path, &key_path, &chain_paths).await?,
            RawIdentitySource::Pkcs12Archive { path, passphrase } => {
                self.resolve_archive(&path, &passphrase).await?
            }
        };
        log::info!(
            "Resolved signing identity: {} (chain length {})",
            identity.subject(),
            identity.chain().len()
        );
        Ok(identity)
    }

    async fn resolve_files(
        &self,
        cert_path: &Path,
        key_path: &Path,
        chain_paths: &[std::path::PathBuf],
    ) -> Result<SigningIdentity, IdentityError> {
        let cert_pem = read_input(cert_path, KeyRole::Certificate).await?;
        let certificate = X509::from_pem(&cert_pem).map_err(|e| IdentityError::ParseError {
            role: KeyRole::Certificate,
            reason: e.to_string(),
        })?;

        let key_pem = read_input(key_path, KeyRole::PrivateKey).await?;
        let private_key =
            PKey::private_key_from_pem(&key_pem).map_err(|e| IdentityError::ParseError {
                role: KeyRole::PrivateKey,
                reason: e.to_string(),
            })?;

        let mut chain = Vec::new();
        for path in chain_paths {
            let pem = read_input(path, KeyRole::Chain).await?;
            let certs = X509::stack_from_pem(&pem).map_err(|e| IdentityError::ParseError {
                role: KeyRole::Chain,
                reason: e.to_string(),
            })?;
            if certs.is_empty() {
                return Err(IdentityError::ParseError {
                    role: KeyRole::Chain,
                    reason: format!("no certificates found in {}", path.display()),
                });
            }
            log::debug!("Loaded {} chain certificate(s) from {}", certs.len(), path.display());
            chain.extend(certs);
        }

        validate(certificate, private_key, chain)
    }

    async fn resolve_archive(
        &self,
        path: &Path,
        passphrase: &Passphrase,
    ) -> Result<SigningIdentity, IdentityError> {
        let der = read_input(path, KeyRole::Certificate).await?;
        log::debug!("Read PKCS#12 archive: {} bytes", der.len());

        let archive = Pkcs12::from_der(&der)
            .map_err(|e| IdentityError::MalformedArchive(e.to_string()))?;
        let parsed = archive
            .parse2(passphrase.as_str())
            .map_err(|e| classify_archive_failure(&e))?;

        let private_key = parsed.pkey.ok_or(IdentityError::MissingPrivateKey)?;
        let chain: Vec<X509> = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();
        // PKCS12_parse only fills `cert` with the certificate matching the key;
        // any other certificate bag lands in `ca`.
        let certificate = match parsed.cert {
            Some(certificate) => certificate,
            None if chain.is_empty() => return Err(IdentityError::MissingCertificate),
            None => return Err(IdentityError::KeyMismatch),
        };

        validate(certificate, private_key, chain)
    }
}

async fn read_input(path: &Path, role: KeyRole) -> Result<Vec<u8>, IdentityError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => IdentityError::FileNotFound {
            role,
            path: path.to_path_buf(),
        },
        _ => IdentityError::ParseError {
            role,
            reason: format!("failed to read {}: {e}", path.display()),
        },
    })
}

/// Enforce the identity invariants: RSA key, matching certificate.
fn validate(
    certificate: X509,
    private_key: PKey<Private>,
    chain: Vec<X509>,
) -> Result<SigningIdentity, IdentityError> {
    if private_key.id() != Id::RSA {
        return Err(IdentityError::InvalidKeyType(format!(
            "expected RSA private key, found key type id {}",
            private_key.id().as_raw()
        )));
    }
    let public_key = certificate.public_key().map_err(|e| IdentityError::ParseError {
        role: KeyRole::Certificate,
        reason: format!("certificate public key unreadable: {e}"),
    })?;
    if !public_key.public_eq(&private_key) {
        return Err(IdentityError::KeyMismatch);
    }
    Ok(SigningIdentity::new(certificate, private_key, chain))
}

/// A failed `PKCS12_parse` is a passphrase problem unless OpenSSL reports
/// a structural decoding error for the decrypted contents.
fn classify_archive_failure(stack: &ErrorStack) -> IdentityError {
    let reasons: Vec<String> = stack
        .errors()
        .iter()
        .filter_map(|e| e.reason().map(str::to_ascii_lowercase))
        .collect();
    let auth = reasons
        .iter()
        .any(|r| r.contains("mac verify") || r.contains("decrypt") || r.contains("bad password"));
    let structural = reasons
        .iter()
        .any(|r| r.contains("asn1") || r.contains("decode") || r.contains("wrong tag"));
    if structural && !auth {
        log::debug!("PKCS#12 content is malformed: {stack}");
        IdentityError::MalformedArchive(stack.to_string())
    } else {
        log::debug!("PKCS#12 MAC/decryption failed: {stack}");
        IdentityError::AuthenticationFailed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_file_is_tagged() {
        let resolver = IdentityResolver::new();
        let err = resolver
            .resolve(RawIdentitySource::SeparateFiles {
                cert_path: "/nonexistent/cert.pem".into(),
                key_path: "/nonexistent/key.pem".into(),
                chain_paths: Vec::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IdentityError::FileNotFound {
                role: KeyRole::Certificate,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn missing_archive_is_file_not_found() {
        let resolver = IdentityResolver::new();
        let err = resolver
            .resolve(RawIdentitySource::Pkcs12Archive {
                path: "/nonexistent/id.p12".into(),
                passphrase: Passphrase::new("secret"),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::FileNotFound { .. }));
    }
}
