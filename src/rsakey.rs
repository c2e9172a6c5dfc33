//! Raw-RSA <-> DER/PEM conversions: PKCS#8 and PKCS#1 private keys,
//! SubjectPublicKeyInfo and bare `RSAPublicKey` public keys.

extern crate alloc;
use alloc::{string::String, vec::Vec};

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::error::SecError;

/// A raw RSA private key in the container format this simulator stores:
/// modulus, public exponent, private exponent, and the two primes (needed
/// to reconstruct the CRT parameters `rsa::RsaPrivateKey` requires).
pub struct RawRsaPrivate {
    pub n: Vec<u8>,
    pub e: Vec<u8>,
    pub d: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
}

pub struct RawRsaPublic {
    pub n: Vec<u8>,
    pub e: Vec<u8>,
}

pub fn raw_private_to_key(raw: &RawRsaPrivate) -> Result<RsaPrivateKey, SecError> {
    let n = BigUint::from_bytes_be(&raw.n);
    let e = BigUint::from_bytes_be(&raw.e);
    let d = BigUint::from_bytes_be(&raw.d);
    let p = BigUint::from_bytes_be(&raw.p);
    let q = BigUint::from_bytes_be(&raw.q);
    let mut key = RsaPrivateKey::from_components(n, e, d, alloc::vec![p, q]).map_err(|_| SecError::InvalidParameters)?;
    key.validate().map_err(|_| SecError::InvalidParameters)?;
    Ok(key)
}

pub fn key_to_raw_private(key: &RsaPrivateKey) -> RawRsaPrivate {
    let primes = key.primes();
    RawRsaPrivate {
        n: key.n().to_bytes_be(),
        e: key.e().to_bytes_be(),
        d: key.d().to_bytes_be(),
        p: primes[0].to_bytes_be(),
        q: primes[1].to_bytes_be(),
    }
}

pub fn raw_public_to_key(raw: &RawRsaPublic) -> Result<RsaPublicKey, SecError> {
    let n = BigUint::from_bytes_be(&raw.n);
    let e = BigUint::from_bytes_be(&raw.e);
    RsaPublicKey::new(n, e).map_err(|_| SecError::InvalidParameters)
}

pub fn key_to_raw_public(key: &RsaPublicKey) -> RawRsaPublic {
    RawRsaPublic {
        n: key.n().to_bytes_be(),
        e: key.e().to_bytes_be(),
    }
}

/// DER PKCS#8 private key.
pub fn pkcs8_der_to_private(der: &[u8]) -> Result<RsaPrivateKey, SecError> {
    RsaPrivateKey::from_pkcs8_der(der).map_err(|_| SecError::InvalidParameters)
}

pub fn private_to_pkcs8_der(key: &RsaPrivateKey) -> Result<Vec<u8>, SecError> {
    key.to_pkcs8_der().map(|doc| doc.as_bytes().to_vec()).map_err(|_| SecError::Failure)
}

/// Auto-detected raw DER private key: PKCS#8 first (the common modern
/// encoding), falling back to bare PKCS#1 `RSAPrivateKey` DER.
pub fn der_auto_private(der: &[u8]) -> Result<RsaPrivateKey, SecError> {
    if let Ok(key) = RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(key);
    }
    RsaPrivateKey::from_pkcs1_der(der).map_err(|_| SecError::InvalidParameters)
}

/// DER public key: bare `RSAPublicKey` (PKCS#1) attempted first; on
/// failure, `SubjectPublicKeyInfo` (PKCS#8-style) is attempted.
pub fn der_auto_public(der: &[u8]) -> Result<RsaPublicKey, SecError> {
    if let Ok(key) = RsaPublicKey::from_pkcs1_der(der) {
        return Ok(key);
    }
    RsaPublicKey::from_public_key_der(der).map_err(|_| SecError::InvalidParameters)
}

pub fn public_to_spki_der(key: &RsaPublicKey) -> Result<Vec<u8>, SecError> {
    key.to_public_key_der().map(|doc| doc.as_bytes().to_vec()).map_err(|_| SecError::Failure)
}

pub fn public_to_pkcs1_der(key: &RsaPublicKey) -> Result<Vec<u8>, SecError> {
    key.to_pkcs1_der().map(|doc| doc.as_bytes().to_vec()).map_err(|_| SecError::Failure)
}

/// PEM private key. Passphrase-protected PEM is not supported — the
/// decode callback always rejects an encrypted container outright rather
/// than prompting, matching spec.md's "always-rejecting passphrase
/// callback" behavior.
pub fn pem_to_private(pem: &str) -> Result<RsaPrivateKey, SecError> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|_| SecError::InvalidParameters)
}

pub fn private_to_pem(key: &RsaPrivateKey) -> Result<String, SecError> {
    key.to_pkcs8_pem(Default::default())
        .map(|zstr| zstr.to_string())
        .map_err(|_| SecError::Failure)
}

pub fn pem_to_public(pem: &str) -> Result<RsaPublicKey, SecError> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|_| SecError::InvalidParameters)
}

pub fn public_to_pem(key: &RsaPublicKey) -> Result<String, SecError> {
    key.to_public_key_pem(Default::default()).map_err(|_| SecError::Failure)
}
