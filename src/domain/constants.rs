//! Centralized constants for OIDs and MIME literals used by the signing pipeline.
//! Keep this intentionally small; only broadly reused literals should live here.

use const_oid::ObjectIdentifier;

// === CMS content types ===

/// id-data (1.2.840.113549.1.7.1)
pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");

/// id-signedData (1.2.840.113549.1.7.2)
pub const ID_SIGNED_DATA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");

// === PKCS#9 signed attribute types ===

/// id-contentType (1.2.840.113549.1.9.3)
pub const ID_CONTENT_TYPE: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");

/// id-messageDigest (1.2.840.113549.1.9.4)
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");

/// id-signingTime (1.2.840.113549.1.9.5)
pub const ID_SIGNING_TIME: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

// === Algorithms ===

/// SHA-256 (2.16.840.1.101.3.4.2.1)
pub const ID_SHA_256: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// rsaEncryption (1.2.840.113549.1.1.1), used as the SignerInfo signature algorithm
pub const RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

// === MIME ===

/// Content type of the wrapping root node, without the boundary parameter.
pub const MULTIPART_SIGNED: &str =
    "multipart/signed; protocol=\"application/pkcs7-signature\"; micalg=sha256";

/// Signature part content type.
pub const PKCS7_SIGNATURE_TYPE: &str = "application/pkcs7-signature";

/// File name of the detached signature part.
pub const SIGNATURE_FILENAME: &str = "smime.p7s";

/// `micalg` value announced for SHA-256.
pub const MICALG_SHA256: &str = "sha256";

/// Line length for base64 bodies.
pub const BASE64_LINE_LENGTH: usize = 76;
