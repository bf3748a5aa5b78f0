//! Shared fixtures for integration tests.
//!
//! Key material is generated on the fly with OpenSSL: RSA/EC keys, self-signed
//! and CA-issued certificates, and PKCS#12 archives in both key bag forms.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use openssl::asn1::Asn1Time;
use openssl::bn::{BigNum, MsbOption};
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Builder, X509NameBuilder, X509};

pub const PASSPHRASE: &str = "secret";

pub fn rsa_key() -> PKey<Private> {
    let rsa = Rsa::generate(2048).expect("generate RSA key");
    PKey::from_rsa(rsa).expect("wrap RSA key")
}

pub fn ec_key() -> PKey<Private> {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).expect("P-256 group");
    let ec = EcKey::generate(&group).expect("generate EC key");
    PKey::from_ec_key(ec).expect("wrap EC key")
}

/// Certificate for `key` with common name `cn`, signed by `issuer` (or self-signed).
pub fn certificate(
    key: &PKey<Private>,
    cn: &str,
    issuer: Option<(&X509, &PKey<Private>)>,
) -> X509 {
    let mut name = X509NameBuilder::new().expect("name builder");
    name.append_entry_by_nid(Nid::COMMONNAME, cn).expect("CN");
    name.append_entry_by_nid(Nid::ORGANIZATIONNAME, "S/MIME Test")
        .expect("O");
    let name = name.build();

    let mut serial = BigNum::new().expect("bignum");
    serial
        .rand(64, MsbOption::MAYBE_ZERO, false)
        .expect("random serial");

    let mut builder = X509Builder::new().expect("x509 builder");
    builder.set_version(2).expect("version");
    builder
        .set_serial_number(&serial.to_asn1_integer().expect("serial"))
        .expect("set serial");
    builder.set_subject_name(&name).expect("subject");
    builder.set_pubkey(key).expect("pubkey");
    builder
        .set_not_before(&Asn1Time::days_from_now(0).expect("not before"))
        .expect("set not before");
    builder
        .set_not_after(&Asn1Time::days_from_now(365).expect("not after"))
        .expect("set not after");

    match issuer {
        Some((issuer_cert, issuer_key)) => {
            builder
                .set_issuer_name(issuer_cert.subject_name())
                .expect("issuer");
            builder
                .sign(issuer_key, MessageDigest::sha256())
                .expect("sign certificate");
        }
        None => {
            builder.set_issuer_name(&name).expect("issuer");
            builder
                .sign(key, MessageDigest::sha256())
                .expect("self-sign certificate");
        }
    }
    builder.build()
}

/// Signer key plus self-signed certificate.
pub fn signer() -> (PKey<Private>, X509) {
    let key = rsa_key();
    let cert = certificate(&key, "sender@example.com", None);
    (key, cert)
}

/// Signer issued by a freshly generated CA; returns `(key, cert, ca_cert)`.
pub fn signer_with_ca() -> (PKey<Private>, X509, X509) {
    let ca_key = rsa_key();
    let ca_cert = certificate(&ca_key, "Test CA", None);
    let key = rsa_key();
    let cert = certificate(&key, "sender@example.com", Some((&ca_cert, &ca_key)));
    (key, cert, ca_cert)
}

/// PKCS#12 archive with a shrouded (encrypted) key bag.
pub fn pkcs12(key: &PKey<Private>, cert: &X509, ca: &[X509], passphrase: &str) -> Vec<u8> {
    pkcs12_bags(Some(key), Some(cert), ca, passphrase)
}

/// PKCS#12 archive with an arbitrary bag set; `ca` entries become extra certificate bags.
pub fn pkcs12_bags(
    key: Option<&PKey<Private>>,
    cert: Option<&X509>,
    ca: &[X509],
    passphrase: &str,
) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder.name("sender");
    if let Some(key) = key {
        builder.pkey(key);
    }
    if let Some(cert) = cert {
        builder.cert(cert);
    }
    if !ca.is_empty() {
        let mut stack = Stack::new().expect("stack");
        for cert in ca {
            stack.push(cert.clone()).expect("push certificate");
        }
        builder.ca(stack);
    }
    builder
        .build2(passphrase)
        .expect("build PKCS#12")
        .to_der()
        .expect("encode PKCS#12")
}

/// PKCS#12 archive whose private key sits in a plain (unencrypted) key bag.
pub fn pkcs12_plain_key_bag(key: &PKey<Private>, cert: &X509, passphrase: &str) -> Vec<u8> {
    let mut builder = Pkcs12::builder();
    builder
        .name("sender")
        .pkey(key)
        .cert(cert)
        .key_algorithm(Nid::from_raw(-1));
    builder
        .build2(passphrase)
        .expect("build PKCS#12")
        .to_der()
        .expect("encode PKCS#12")
}

pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

/// Write `cert.pem` and `key.pem` into `dir`.
pub fn write_pem_pair(dir: &Path, key: &PKey<Private>, cert: &X509) -> (PathBuf, PathBuf) {
    let cert_path = write_file(dir, "cert.pem", &cert.to_pem().expect("cert PEM"));
    let key_path = write_file(
        dir,
        "key.pem",
        &key.private_key_to_pem_pkcs8().expect("key PEM"),
    );
    (cert_path, key_path)
}

/// Verify a detached PKCS#7 signature over `content`, without chain validation.
pub fn verify_detached(signature_der: &[u8], content: &[u8]) -> bool {
    let pkcs7 = Pkcs7::from_der(signature_der).expect("parse PKCS#7");
    let certs: Stack<X509> = Stack::new().expect("stack");
    let store = X509StoreBuilder::new().expect("store").build();
    pkcs7
        .verify(
            &certs,
            &store,
            Some(content),
            None,
            Pkcs7Flags::NOVERIFY | Pkcs7Flags::BINARY,
        )
        .is_ok()
}
