//! Signing identity domain types.
//!
//! A `SigningIdentity` is the validated triple (certificate, RSA key, chain)
//! the content signer consumes. It is only constructed by the identity
//! resolver, which checks the key type and key/certificate pairing, and it
//! exposes no mutating accessors so it can be shared read-only between
//! concurrent signing operations.

use std::fmt;
use std::path::PathBuf;

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

/// Validated signer material.
#[derive(Clone)]
pub struct SigningIdentity {
    certificate: X509,
    private_key: PKey<Private>,
    chain: Vec<X509>,
}

impl SigningIdentity {
    pub(crate) fn new(certificate: X509, private_key: PKey<Private>, chain: Vec<X509>) -> Self {
        Self {
            certificate,
            private_key,
            chain,
        }
    }

    #[must_use]
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    #[must_use]
    pub fn private_key(&self) -> &PKey<Private> {
        &self.private_key
    }

    /// Additional certificates, in the order they were supplied.
    #[must_use]
    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    /// Signer certificate first, then the chain.
    pub fn certificates(&self) -> impl Iterator<Item = &X509> {
        std::iter::once(&self.certificate).chain(self.chain.iter())
    }

    /// Human readable subject of the signer certificate.
    #[must_use]
    pub fn subject(&self) -> String {
        describe_name(self.certificate.subject_name())
    }

    /// Human readable issuer of the signer certificate.
    #[must_use]
    pub fn issuer(&self) -> String {
        describe_name(self.certificate.issuer_name())
    }

    /// Signer certificate serial number as hex, empty if unreadable.
    #[must_use]
    pub fn serial_hex(&self) -> String {
        self.certificate
            .serial_number()
            .to_bn()
            .map(|bn| hex::encode(bn.to_vec()))
            .unwrap_or_default()
    }
}

/// `CN=..., O=...` rendering of an X.509 name.
#[must_use]
pub fn describe_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries()
        .map(|entry| {
            let key = entry.object().nid().short_name().unwrap_or("?");
            format!("{key}={}", entry.data().to_string().unwrap_or_default())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SigningIdentity(subject={}, chain={})",
            self.subject(),
            self.chain.len()
        )
    }
}

/// Archive passphrase; never printed.
#[derive(Clone)]
pub struct Passphrase(String);

impl Passphrase {
    #[must_use]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self(passphrase.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase(***)")
    }
}

/// How the caller supplied the signing identity.
#[derive(Clone)]
pub enum RawIdentitySource {
    /// Already parsed objects.
    DirectPem {
        certificate: X509,
        private_key: PKey<Private>,
        chain: Vec<X509>,
    },
    /// PEM certificate and key files, plus optional PEM chain files.
    SeparateFiles {
        cert_path: PathBuf,
        key_path: PathBuf,
        chain_paths: Vec<PathBuf>,
    },
    /// Password-protected PKCS#12 archive.
    Pkcs12Archive {
        path: PathBuf,
        passphrase: Passphrase,
    },
}

impl RawIdentitySource {
    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            RawIdentitySource::DirectPem { .. } => "direct",
            RawIdentitySource::SeparateFiles { .. } => "pem-files",
            RawIdentitySource::Pkcs12Archive { .. } => "pkcs12",
        }
    }
}

impl fmt::Debug for RawIdentitySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawIdentitySource::DirectPem { chain, .. } => {
                write!(f, "DirectPem(chain={})", chain.len())
            }
            RawIdentitySource::SeparateFiles {
                cert_path,
                key_path,
                chain_paths,
            } => f
                .debug_struct("SeparateFiles")
                .field("cert_path", cert_path)
                .field("key_path", key_path)
                .field("chain_paths", chain_paths)
                .finish(),
            RawIdentitySource::Pkcs12Archive { path, .. } => f
                .debug_struct("Pkcs12Archive")
                .field("path", path)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passphrase_is_redacted() {
        let pass = Passphrase::new("secret");
        assert_eq!(format!("{pass:?}"), "Passphrase(***)");
        assert_eq!(pass.as_str(), "secret");

        let source = RawIdentitySource::Pkcs12Archive {
            path: PathBuf::from("id.p12"),
            passphrase: pass,
        };
        let printed = format!("{source:?}");
        assert!(printed.contains("id.p12"));
        assert!(!printed.contains("secret"));
        assert_eq!(source.kind(), "pkcs12");
    }

    #[test]
    fn name_rendering() {
        let mut builder = openssl::x509::X509NameBuilder::new().unwrap();
        builder
            .append_entry_by_nid(openssl::nid::Nid::COMMONNAME, "sender@example.com")
            .unwrap();
        builder
            .append_entry_by_nid(openssl::nid::Nid::ORGANIZATIONNAME, "Example")
            .unwrap();
        let name = builder.build();
        assert_eq!(describe_name(&name), "CN=sender@example.com, O=Example");
    }
}
