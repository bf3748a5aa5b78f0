//! Error types for S/MIME signing operations.
//!
//! Each pipeline stage has its own error enum so callers can react to, say,
//! a bad passphrase differently from a corrupt archive. `SmimeError` is the
//! umbrella type returned by the workflow and the facade.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for S/MIME operations
pub type SmimeResult<T> = Result<T, SmimeError>;

/// Which input an identity failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    Certificate,
    PrivateKey,
    Chain,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRole::Certificate => f.write_str("certificate"),
            KeyRole::PrivateKey => f.write_str("private key"),
            KeyRole::Chain => f.write_str("certificate chain"),
        }
    }
}

/// Failures while resolving a signing identity.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum IdentityError {
    #[error("{role} file not found: {}", path.display())]
    FileNotFound { role: KeyRole, path: PathBuf },

    #[error("Failed to parse {role}: {reason}")]
    ParseError { role: KeyRole, reason: String },

    #[error("Invalid key type: {0}")]
    #[diagnostic(help("only RSA private keys can produce sha256/RSA S/MIME signatures"))]
    InvalidKeyType(String),

    #[error("Private key does not match the certificate public key")]
    KeyMismatch,

    #[error("PKCS#12 authentication failed: wrong passphrase or unreadable archive MAC")]
    #[diagnostic(help("check the archive passphrase"))]
    AuthenticationFailed,

    #[error("PKCS#12 archive contains no certificate")]
    MissingCertificate,

    #[error("PKCS#12 archive contains no private key")]
    MissingPrivateKey,

    #[error("Malformed PKCS#12 archive: {0}")]
    MalformedArchive(String),
}

/// Failures while serializing a MIME tree.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum BuildError {
    #[error("Failed to read MIME body from {}: {reason}", path.display())]
    Io { path: PathBuf, reason: String },

    #[error("Multipart node has no boundary parameter")]
    MissingBoundary,

    #[error("Cannot append a child to a non-multipart node ({0})")]
    NotMultipart(String),
}

/// Failures while producing the CMS signature.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SignError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),
}

impl From<der::Error> for SignError {
    fn from(error: der::Error) -> Self {
        SignError::SigningFailed(format!("ASN.1 encoding error: {error}"))
    }
}

impl From<openssl::error::ErrorStack> for SignError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SignError::SigningFailed(format!("OpenSSL error: {error}"))
    }
}

/// Top-level error for the signing pipeline.
#[derive(Error, Debug, miette::Diagnostic)]
pub enum SmimeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sign(#[from] SignError),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SmimeError {
    fn from(error: std::io::Error) -> Self {
        SmimeError::Io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = IdentityError::ParseError {
            role: KeyRole::PrivateKey,
            reason: "no PEM block".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to parse private key: no PEM block");

        let error = IdentityError::FileNotFound {
            role: KeyRole::Certificate,
            path: PathBuf::from("/tmp/cert.pem"),
        };
        assert_eq!(
            error.to_string(),
            "certificate file not found: /tmp/cert.pem"
        );
    }

    #[test]
    fn test_error_conversion() {
        let smime: SmimeError = IdentityError::AuthenticationFailed.into();
        assert!(matches!(
            smime,
            SmimeError::Identity(IdentityError::AuthenticationFailed)
        ));

        let smime: SmimeError = SignError::SigningFailed("boom".into()).into();
        assert_eq!(smime.to_string(), "Signing failed: boom");
    }
}
