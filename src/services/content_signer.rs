//! Detached CMS `SignedData` construction.
//!
//! Produces the `application/pkcs7-signature` payload for a `multipart/signed`
//! message:
//! - digest algorithm SHA-256, signature RSA PKCS#1 v1.5 (via OpenSSL)
//! - certificate set: signer certificate, then the chain in supplied order
//! - one `SignerInfo` identified by issuer and serial number
//! - in full mode the signed attributes content-type, message-digest and
//!   signing-time; in minimal mode no signed attributes
//!
//! The structure is assembled with typed `cms` values and the content is
//! removed from `encapContentInfo` by [`detach_content`] before encoding.

use std::time::SystemTime;

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedData, SignerIdentifier, SignerInfo,
    SignerInfos,
};
use const_oid::ObjectIdentifier;
use der::asn1::{GeneralizedTime, OctetString, SetOfVec, UtcTime};
use der::{Any, Decode, Encode, Tag};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::rsa::Padding;
use openssl::sign::Signer;
use openssl::x509::X509Ref;
use sha2::{Digest, Sha256};
use spki::AlgorithmIdentifierOwned;
use x509_cert::attr::Attribute;
use x509_cert::Certificate;

use crate::domain::cms::{SignatureMode, SignedEnvelope};
use crate::domain::constants;
use crate::domain::identity::SigningIdentity;
use crate::infra::error::SignError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSigner {
    mode: SignatureMode,
}

impl ContentSigner {
    #[must_use]
    pub fn new(mode: SignatureMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> SignatureMode {
        self.mode
    }

    /// Sign `content` with the current time as signing-time.
    pub fn sign(
        &self,
        content: &[u8],
        identity: &SigningIdentity,
    ) -> Result<SignedEnvelope, SignError> {
        self.sign_at(content, identity, SystemTime::now())
    }

    /// Sign `content`, stamping `signing_time` into the signed attributes.
    pub fn sign_at(
        &self,
        content: &[u8],
        identity: &SigningIdentity,
        signing_time: SystemTime,
    ) -> Result<SignedEnvelope, SignError> {
        let digest = Sha256::digest(content);
        log::debug!(
            "Signing {} content bytes, sha256={} mode={}",
            content.len(),
            hex::encode(digest),
            self.mode.as_str()
        );

        let signer_cert = to_x509_cert(identity.certificate())?;
        let mut certificates = Vec::new();
        let mut seen: Vec<Vec<u8>> = Vec::new();
        for cert in identity.certificates() {
            let der = cert.to_der()?;
            if seen.contains(&der) {
                log::warn!("Skipping duplicate certificate in signing chain");
                continue;
            }
            certificates.push(CertificateChoices::Certificate(Certificate::from_der(&der)?));
            seen.push(der);
        }

        let (signed_attrs, signature) = match self.mode {
            SignatureMode::Full => {
                let attrs = signed_attributes(&digest, signing_time)?;
                // The signature covers the DER SET OF encoding, not the [0] IMPLICIT form.
                let tbs = attrs.to_der()?;
                let signature = rsa_sha256_sign(&tbs, identity)?;
                (Some(attrs), signature)
            }
            SignatureMode::Minimal => (None, rsa_sha256_sign(content, identity)?),
        };
        log::debug!("RSA signature: {} bytes", signature.len());

        let signer_info = SignerInfo {
            version: CmsVersion::V1,
            sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                issuer: signer_cert.tbs_certificate.issuer.clone(),
                serial_number: signer_cert.tbs_certificate.serial_number.clone(),
            }),
            digest_alg: sha256_algorithm(),
            signed_attrs,
            signature_algorithm: rsa_encryption_algorithm()?,
            signature: OctetString::new(signature)?,
            unsigned_attrs: None,
        };

        let mut signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![sha256_algorithm()])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: constants::ID_DATA,
                econtent: Some(Any::encode_from(&OctetString::new(content)?)?),
            },
            certificates: Some(CertificateSet(SetOfVec::try_from(certificates)?)),
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(vec![signer_info])?),
        };

        detach_content(&mut signed_data);

        let content_info = ContentInfo {
            content_type: constants::ID_SIGNED_DATA,
            content: Any::encode_from(&signed_data)?,
        };
        let der = content_info.to_der()?;
        log::info!("Created detached CMS signature: {} bytes", der.len());
        Ok(SignedEnvelope::from_der(der))
    }
}

/// Clear `encapContentInfo.eContent`, leaving only the content type.
///
/// The content travels once, as the sibling MIME part of `multipart/signed`.
pub fn detach_content(signed_data: &mut SignedData) -> Option<Any> {
    let removed = signed_data.encap_content_info.econtent.take();
    if let Some(content) = &removed {
        log::debug!("Detached eContent ({} bytes)", content.value().len());
    }
    removed
}

/// content-type, message-digest, signing-time.
///
/// The SET OF encoder emits them in DER order regardless of insertion order.
fn signed_attributes(
    digest: &[u8],
    signing_time: SystemTime,
) -> Result<SetOfVec<Attribute>, der::Error> {
    let content_type = attribute(
        constants::ID_CONTENT_TYPE,
        Any::encode_from(&constants::ID_DATA)?,
    )?;
    let message_digest = attribute(
        constants::ID_MESSAGE_DIGEST,
        Any::encode_from(&OctetString::new(digest)?)?,
    )?;
    let signing_time = attribute(constants::ID_SIGNING_TIME, encode_time(signing_time)?)?;
    SetOfVec::try_from(vec![content_type, message_digest, signing_time])
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute, der::Error> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// UTCTime through 2049, GeneralizedTime afterwards.
fn encode_time(time: SystemTime) -> Result<Any, der::Error> {
    match UtcTime::from_system_time(time) {
        Ok(utc) => Any::encode_from(&utc),
        Err(_) => Any::encode_from(&GeneralizedTime::from_system_time(time)?),
    }
}

fn sha256_algorithm() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: constants::ID_SHA_256,
        parameters: None,
    }
}

fn rsa_encryption_algorithm() -> Result<AlgorithmIdentifierOwned, der::Error> {
    Ok(AlgorithmIdentifierOwned {
        oid: constants::RSA_ENCRYPTION,
        parameters: Some(Any::new(Tag::Null, Vec::<u8>::new())?),
    })
}

fn to_x509_cert(cert: &X509Ref) -> Result<Certificate, SignError> {
    let der = cert.to_der()?;
    Ok(Certificate::from_der(&der)?)
}

fn rsa_sha256_sign(data: &[u8], identity: &SigningIdentity) -> Result<Vec<u8>, ErrorStack> {
    let mut signer = Signer::new(MessageDigest::sha256(), identity.private_key())?;
    signer.set_rsa_padding(Padding::PKCS1)?;
    signer.update(data)?;
    signer.sign_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use der::Tagged;
    use std::time::Duration;

    #[test]
    fn detach_clears_econtent() {
        let mut signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![sha256_algorithm()]).unwrap(),
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: constants::ID_DATA,
                econtent: Some(
                    Any::encode_from(&OctetString::new(b"hello".to_vec()).unwrap()).unwrap(),
                ),
            },
            certificates: None,
            crls: None,
            signer_infos: SignerInfos(SetOfVec::new()),
        };
        let removed = detach_content(&mut signed_data).expect("content present");
        assert_eq!(removed.value(), b"hello");
        assert!(signed_data.encap_content_info.econtent.is_none());
        assert!(detach_content(&mut signed_data).is_none());
    }

    #[test]
    fn signed_attributes_are_der_sorted() {
        let attrs = signed_attributes(&[0u8; 32], SystemTime::UNIX_EPOCH).unwrap();
        let oids: Vec<_> = attrs.iter().map(|a| a.oid).collect();
        assert_eq!(oids.len(), 3);
        assert!(oids.contains(&constants::ID_CONTENT_TYPE));
        assert!(oids.contains(&constants::ID_MESSAGE_DIGEST));
        assert!(oids.contains(&constants::ID_SIGNING_TIME));

        let encoded: Vec<Vec<u8>> = attrs.iter().map(|a| a.to_der().unwrap()).collect();
        let mut sorted = encoded.clone();
        sorted.sort();
        assert_eq!(encoded, sorted);
    }

    #[test]
    fn far_future_signing_time_uses_generalized_time() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(2_600_000_000);
        let any = encode_time(time).unwrap();
        assert_eq!(any.tag(), Tag::GeneralizedTime);
        let recent = encode_time(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)).unwrap();
        assert_eq!(recent.tag(), Tag::UtcTime);
    }
}
