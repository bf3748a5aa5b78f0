//! CMS `SignedData` domain wrapper.
//! Minimal newtype around the detached DER output plus the signing mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// DER-encoded detached CMS `ContentInfo(SignedData)`.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    der: Vec<u8>,
}

impl SignedEnvelope {
    #[must_use]
    pub fn from_der(der: Vec<u8>) -> Self {
        Self { der }
    }
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }
    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.der.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.der.is_empty()
    }
}

impl fmt::Debug for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedEnvelope(len={})", self.der.len())
    }
}

/// Which `SignerInfo` shape to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureMode {
    /// content-type, message-digest and signing-time signed attributes.
    #[default]
    Full,
    /// No signed attributes; the signature covers the content digest directly.
    Minimal,
}

impl SignatureMode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMode::Full => "full",
            SignatureMode::Minimal => "minimal",
        }
    }
}

impl FromStr for SignatureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(SignatureMode::Full),
            "minimal" => Ok(SignatureMode::Minimal),
            other => Err(format!("unknown signature mode: {other}")),
        }
    }
}
