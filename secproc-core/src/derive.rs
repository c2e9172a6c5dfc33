//! Key-derivation engine: binds `secproc_crypto::kdf`'s four derivation
//! functions to the per-nonce base-key provisioning ladder, storing both
//! the ephemeral base keys and the final derived output as ordinary sealed
//! key records. Grounded on spec.md §4.6's `_ProvisionBaseKey` + four-KDF
//! flow.

use secproc_crypto::envelope;
use secproc_crypto::error::SecError;
use secproc_crypto::kdf;
use secproc_crypto::primitives::digest::DigestAlg;

use crate::provision::{provision, KeyContainerInput, SealingKeys};
use crate::types::{KeyRecord, KeyType};

/// The four derivation requests spec.md §4.6 names, each producing one
/// new sealed key record.
pub enum KdfRequest<'a> {
    Hkdf { digest_alg: DigestAlg, salt: &'a [u8], info: &'a [u8], output_key_type: KeyType },
    ConcatKdf { digest_alg: DigestAlg, other_info: &'a [u8], output_key_type: KeyType },
    Pbkdf2 { digest_alg: DigestAlg, salt: &'a [u8], iterations: u32, output_key_type: KeyType },
    VendorAes128 { input: &'a [u8] },
    KeyLadderAes128 { root: &'a str, input1: [u8; 16], input2: [u8; 16] },
}

/// `_ProvisionBaseKey(nonce)`: runs the ladder, then seals the resulting
/// 16 bytes as two RAM-soft-wrapped records — AES-128 and HMAC-128 — both
/// holding the same clear material, per spec.md §4.6 step 3.
pub fn provision_base_keys(
    keys: &SealingKeys<'_>,
    root: &[u8; 16],
    nonce: &[u8],
    derivation_string: &str,
    cipher_string: &str,
    digest_alg: DigestAlg,
) -> Result<(KeyRecord, KeyRecord), SecError> {
    let material = kdf::provision_base_key_material(root, nonce, derivation_string, cipher_string, digest_alg);
    let base_aes = provision(keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Aes128, bytes: &material })?;
    let base_mac = provision(keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Hmac128, bytes: &material })?;
    Ok((base_aes, base_mac))
}

fn unwrap_clear(keys: &SealingKeys<'_>, record: &KeyRecord) -> Result<Vec<u8>, SecError> {
    let payload = envelope::validate(&record.envelope_bytes, keys.k_store, keys.k_mac)?;
    Ok(payload.to_vec())
}

/// Run `_ProvisionBaseKey(nonce)` then the requested KDF, sealing the
/// result as a new key record. Re-provisions the base key on every call —
/// the same `nonce` always yields the same base material (spec.md §4.6's
/// determinism requirement). Returns the base AES/HMAC records alongside
/// the derived one so the caller can place them at the reserved base-key
/// identifiers (spec.md §4.6 step 3).
pub fn derive(
    keys: &SealingKeys<'_>,
    root: &[u8; 16],
    nonce: &[u8],
    derivation_string: &str,
    cipher_string: &str,
    request: KdfRequest<'_>,
) -> Result<(KeyRecord, KeyRecord, KeyRecord), SecError> {
    let digest_alg = match &request {
        KdfRequest::Hkdf { digest_alg, .. }
        | KdfRequest::ConcatKdf { digest_alg, .. }
        | KdfRequest::Pbkdf2 { digest_alg, .. } => *digest_alg,
        KdfRequest::VendorAes128 { .. } | KdfRequest::KeyLadderAes128 { .. } => DigestAlg::Sha256,
    };
    let (base_aes, base_mac) = provision_base_keys(keys, root, nonce, derivation_string, cipher_string, digest_alg)?;

    let derived = match request {
        KdfRequest::Hkdf { digest_alg, salt, info, output_key_type } => {
            let base_mac_clear = unwrap_clear(keys, &base_mac)?;
            let out_len = output_key_type.symmetric_len().ok_or(SecError::InvalidParameters)?;
            let derived = kdf::hkdf(digest_alg, &base_mac_clear, salt, info, out_len)?;
            provision(keys, KeyContainerInput::RawSymmetric { key_type: output_key_type, bytes: &derived })?
        }
        KdfRequest::ConcatKdf { digest_alg, other_info, output_key_type } => {
            let base_aes_clear = unwrap_clear(keys, &base_aes)?;
            let out_len = output_key_type.symmetric_len().ok_or(SecError::InvalidParameters)?;
            let derived = kdf::concat_kdf(digest_alg, &base_aes_clear, other_info, out_len);
            provision(keys, KeyContainerInput::RawSymmetric { key_type: output_key_type, bytes: &derived })?
        }
        KdfRequest::Pbkdf2 { digest_alg, salt, iterations, output_key_type } => {
            let base_mac_clear = unwrap_clear(keys, &base_mac)?;
            let out_len = output_key_type.symmetric_len().ok_or(SecError::InvalidParameters)?;
            let derived = kdf::pbkdf2(digest_alg, &base_mac_clear, salt, iterations, out_len)?;
            provision(keys, KeyContainerInput::RawSymmetric { key_type: output_key_type, bytes: &derived })?
        }
        KdfRequest::VendorAes128 { input } => {
            let container = kdf::vendor_aes128(input);
            provision(keys, KeyContainerInput::Derived { input1: container.input1, input2: container.input2 })?
        }
        KdfRequest::KeyLadderAes128 { root: ladder_root, input1, input2 } => {
            let container = kdf::key_ladder_aes128(ladder_root, Some(input1), Some(input2), None, None)?;
            provision(keys, KeyContainerInput::Derived { input1: container.input1, input2: container.input2 })?
        }
    };
    Ok((base_aes, base_mac, derived))
}
