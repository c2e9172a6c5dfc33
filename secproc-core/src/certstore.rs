//! Certificate pipeline: PEM or DER X.509 in, normalized to DER, sealed
//! with an HMAC-SHA-256 tag under the cert-MAC key. Grounded on the same
//! store shape as `provision`, against `x509-cert` for the PEM/DER
//! normalization step.

use der::{Decode, DecodePem, Encode};
use rsa::RsaPublicKey;
use x509_cert::Certificate;

use secproc_crypto::error::SecError;
use secproc_crypto::primitives::mac::{mac_oneshot, verify, MacAlg};
use secproc_crypto::rsakey;

use crate::types::CertRecord;

/// Parse PEM or DER X.509 and normalize to DER bytes.
fn normalize_to_der(pem_or_der: &[u8]) -> Result<Vec<u8>, SecError> {
    if let Ok(text) = core::str::from_utf8(pem_or_der) {
        if text.trim_start().starts_with("-----BEGIN") {
            let cert = Certificate::from_pem(text).map_err(|_| SecError::InvalidParameters)?;
            return cert.to_der().map_err(|_| SecError::Failure);
        }
    }
    // Round-trip through the parser even for DER input, rejecting anything
    // that isn't a well-formed certificate before it's ever sealed.
    let cert = Certificate::from_der(pem_or_der).map_err(|_| SecError::InvalidParameters)?;
    cert.to_der().map_err(|_| SecError::Failure)
}

/// Seal PEM-or-DER X.509 bytes into a `CertRecord` under `cert_mac_key`.
pub fn provision_certificate(cert_mac_key: &[u8], pem_or_der: &[u8]) -> Result<CertRecord, SecError> {
    let cert_bytes = normalize_to_der(pem_or_der)?;
    let tag = mac_oneshot(MacAlg::HmacSha256, cert_mac_key, &cert_bytes)?;
    let mac: [u8; 32] = tag.try_into().map_err(|_| SecError::Failure)?;
    Ok(CertRecord { cert_bytes, mac })
}

/// Recompute and compare the record's MAC; `VERIFICATION_FAILED` on
/// mismatch, matching spec.md §8 scenario 4 (a single flipped byte on
/// disk must surface, never pass silently).
pub fn verify_certificate(cert_mac_key: &[u8], record: &CertRecord) -> Result<(), SecError> {
    let actual = mac_oneshot(MacAlg::HmacSha256, cert_mac_key, &record.cert_bytes)?;
    verify(&record.mac, &actual)
}

/// Extract the embedded RSA public key in the canonical raw-RSA layout.
pub fn extract_public_key(record: &CertRecord) -> Result<rsakey::RawRsaPublic, SecError> {
    let cert = Certificate::from_der(&record.cert_bytes).map_err(|_| SecError::InvalidParameters)?;
    let spki_der = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|_| SecError::Failure)?;
    let public_key = rsakey::der_auto_public(&spki_der)?;
    Ok(rsakey::key_to_raw_public(&public_key))
}

/// Verify the certificate's own X.509 signature against a caller-supplied
/// public key (typically the issuer's, extracted from another certificate
/// or key handle).
pub fn verify_signature(record: &CertRecord, issuer_public_key: &RsaPublicKey) -> Result<(), SecError> {
    use rsa::pkcs1v15::{Signature, VerifyingKey};
    use rsa::signature::Verifier;
    use sha2::Sha256;

    let cert = Certificate::from_der(&record.cert_bytes).map_err(|_| SecError::InvalidParameters)?;
    let tbs_der = cert.tbs_certificate.to_der().map_err(|_| SecError::Failure)?;
    let sig_bytes = cert.signature.raw_bytes();
    let signature = Signature::try_from(sig_bytes).map_err(|_| SecError::InvalidParameters)?;

    let verifying_key = VerifyingKey::<Sha256>::new(issuer_public_key.clone());
    verifying_key
        .verify(&tbs_der, &signature)
        .map_err(|_| SecError::VerificationFailed)
}
