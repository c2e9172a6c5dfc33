//! Key-container provisioner: maps `(container_type, bytes)` to a
//! `KeyRecord`, sealed in the key-store envelope. Grounded on the teacher's
//! `keystore.rs` generate/activate orchestration shape, generalized from
//! "one key type" to the full multi-encoding ingester spec.md §4.3 names.

extern crate alloc;

use secproc_crypto::envelope;
use secproc_crypto::error::SecError;
use secproc_crypto::ladder::DerivedContainer;
use secproc_crypto::rsakey::{
    self, RawRsaPrivate, RawRsaPublic,
};
use secproc_crypto::wire::InnerContainerKind;

use crate::types::{KeyContainerType, KeyInfo, KeyRecord, KeyType};

/// Payloads longer than this are rejected outright, before any parsing.
pub const MAX_CONTAINER_BYTES: usize = 2048;

/// The two soft-wrapped keys that seal every key-store envelope, plus the
/// IV for this particular seal call (the processor draws it from the
/// random primitive before calling in).
pub struct SealingKeys<'a> {
    pub k_store: &'a [u8; 16],
    pub k_mac: &'a [u8; 16],
    pub iv: [u8; 16],
}

/// Everything the provisioner can ingest, one variant per spec.md §4.3
/// container type. Lifetimes borrow the caller's buffers; nothing here
/// outlives the `provision` call.
pub enum KeyContainerInput<'a> {
    RawSymmetric { key_type: KeyType, bytes: &'a [u8] },
    RawRsaPrivate { key_type: KeyType, raw: RawRsaPrivate },
    RawRsaPublic { key_type: KeyType, raw: RawRsaPublic },
    DerRsaPrivate { key_type: KeyType, der: &'a [u8] },
    DerRsaPublic { key_type: KeyType, der: &'a [u8] },
    PemRsaPrivate { key_type: KeyType, pem: &'a str },
    PemRsaPublic { key_type: KeyType, pem: &'a str },
    PreWrappedStore { envelope_bytes: &'a [u8] },
    Derived { input1: [u8; 16], input2: [u8; 16] },
}

pub fn provision(keys: &SealingKeys<'_>, input: KeyContainerInput<'_>) -> Result<KeyRecord, SecError> {
    match input {
        KeyContainerInput::RawSymmetric { key_type, bytes } => {
            provision_raw_symmetric(keys, key_type, bytes, KeyContainerType::RawSymmetric)
        }
        KeyContainerInput::RawRsaPrivate { key_type, raw } => {
            provision_raw_rsa_private(keys, key_type, &raw, KeyContainerType::RawRsaPrivate)
        }
        KeyContainerInput::RawRsaPublic { key_type, raw } => {
            provision_raw_rsa_public(keys, key_type, &raw, KeyContainerType::RawRsaPublic)
        }
        KeyContainerInput::DerRsaPrivate { key_type, der } => {
            let rsa_key = rsakey::der_auto_private(der)?;
            let raw = rsakey::key_to_raw_private(&rsa_key);
            provision_raw_rsa_private(keys, key_type, &raw, KeyContainerType::DerRsaPrivate)
        }
        KeyContainerInput::DerRsaPublic { key_type, der } => {
            let rsa_key = rsakey::der_auto_public(der)?;
            let raw = rsakey::key_to_raw_public(&rsa_key);
            provision_raw_rsa_public(keys, key_type, &raw, KeyContainerType::DerRsaPublic)
        }
        KeyContainerInput::PemRsaPrivate { key_type, pem } => {
            let rsa_key = rsakey::pem_to_private(pem)?;
            let raw = rsakey::key_to_raw_private(&rsa_key);
            provision_raw_rsa_private(keys, key_type, &raw, KeyContainerType::PemRsaPrivate)
        }
        KeyContainerInput::PemRsaPublic { key_type, pem } => {
            let rsa_key = rsakey::pem_to_public(pem)?;
            let raw = rsakey::key_to_raw_public(&rsa_key);
            provision_raw_rsa_public(keys, key_type, &raw, KeyContainerType::PemRsaPublic)
        }
        KeyContainerInput::Derived { input1, input2 } => {
            let container = DerivedContainer::new(input1, input2);
            let payload = container.to_bytes();
            seal_record(keys, KeyType::Aes128, KeyContainerType::Derived, InnerContainerKind::Derived, &payload)
        }
        KeyContainerInput::PreWrappedStore { envelope_bytes } => provision_pre_wrapped(keys, envelope_bytes),
    }
}

fn check_length(bytes: &[u8]) -> Result<(), SecError> {
    if bytes.len() > MAX_CONTAINER_BYTES {
        return Err(SecError::InvalidInputSize);
    }
    Ok(())
}

fn provision_raw_symmetric(
    keys: &SealingKeys<'_>,
    key_type: KeyType,
    bytes: &[u8],
    original_container_type: KeyContainerType,
) -> Result<KeyRecord, SecError> {
    check_length(bytes)?;
    let expected_len = key_type.symmetric_len().ok_or(SecError::InvalidParameters)?;
    if bytes.len() != expected_len {
        return Err(SecError::InvalidInputSize);
    }
    seal_record(keys, key_type, original_container_type, InnerContainerKind::Raw, bytes)
}

fn provision_raw_rsa_private(
    keys: &SealingKeys<'_>,
    key_type: KeyType,
    raw: &RawRsaPrivate,
    original_container_type: KeyContainerType,
) -> Result<KeyRecord, SecError> {
    let modulus_len = key_type.rsa_modulus_bytes().ok_or(SecError::InvalidParameters)?;
    if raw.n.len() != modulus_len {
        return Err(SecError::InvalidInputSize);
    }
    // Round-trip through the primitive library: re-derives a validated
    // key, then re-serializes canonically rather than trusting the
    // caller's byte layout verbatim.
    let rsa_key = rsakey::raw_private_to_key(raw)?;
    let canonical_raw = rsakey::key_to_raw_private(&rsa_key);
    let payload = encode_raw_rsa_private(&canonical_raw);
    check_length(&payload)?;
    seal_record(keys, key_type, original_container_type, InnerContainerKind::Raw, &payload)
}

fn provision_raw_rsa_public(
    keys: &SealingKeys<'_>,
    key_type: KeyType,
    raw: &RawRsaPublic,
    original_container_type: KeyContainerType,
) -> Result<KeyRecord, SecError> {
    let modulus_len = key_type.rsa_modulus_bytes().ok_or(SecError::InvalidParameters)?;
    if raw.n.len() != modulus_len {
        return Err(SecError::InvalidInputSize);
    }
    let rsa_key = rsakey::raw_public_to_key(raw)?;
    let canonical_raw = rsakey::key_to_raw_public(&rsa_key);
    let payload = encode_raw_rsa_public(&canonical_raw);
    check_length(&payload)?;
    seal_record(keys, key_type, original_container_type, InnerContainerKind::Raw, &payload)
}

/// The pre-wrapped blob is already a complete envelope; it is only
/// length- and MAC-validated against `K_mac`, never decrypted, then
/// stored verbatim (spec.md §4.3).
fn provision_pre_wrapped(keys: &SealingKeys<'_>, envelope_bytes: &[u8]) -> Result<KeyRecord, SecError> {
    check_length(envelope_bytes)?;
    let view = secproc_crypto::wire::decode_envelope(envelope_bytes)?;
    let tag = secproc_crypto::primitives::mac::mac_oneshot(
        secproc_crypto::primitives::mac::MacAlg::HmacSha256,
        keys.k_mac,
        view.mac_input,
    )?;
    secproc_crypto::primitives::mac::verify(view.mac, &tag)?;

    let key_type = KeyType::from_tag(view.header.key_type_tag).ok_or(SecError::InvalidParameters)?;
    let original_container_type = KeyContainerType::from_byte(view.header.original_container_type);
    Ok(KeyRecord {
        info: KeyInfo {
            key_type,
            original_container_type,
            inner_container_kind: view.header.inner_kind,
        },
        envelope_bytes: envelope_bytes.to_vec(),
    })
}

fn seal_record(
    keys: &SealingKeys<'_>,
    key_type: KeyType,
    original_container_type: KeyContainerType,
    inner_kind: InnerContainerKind,
    payload: &[u8],
) -> Result<KeyRecord, SecError> {
    let envelope_bytes = envelope::seal(
        keys.k_store,
        keys.k_mac,
        keys.iv,
        original_container_type.to_byte(),
        inner_kind,
        key_type.tag(),
        payload,
    )?;
    Ok(KeyRecord {
        info: KeyInfo { key_type, original_container_type, inner_container_kind: inner_kind },
        envelope_bytes,
    })
}

/// Canonical raw-RSA-private layout: five length-prefixed big-endian
/// fields, `n || e || d || p || q`, each preceded by a 2-byte big-endian
/// length.
fn encode_raw_rsa_private(raw: &RawRsaPrivate) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::new();
    for field in [&raw.n, &raw.e, &raw.d, &raw.p, &raw.q] {
        encode_field(&mut out, field);
    }
    out
}

fn encode_raw_rsa_public(raw: &RawRsaPublic) -> alloc::vec::Vec<u8> {
    let mut out = alloc::vec::Vec::new();
    for field in [&raw.n, &raw.e] {
        encode_field(&mut out, field);
    }
    out
}

fn encode_field(out: &mut alloc::vec::Vec<u8>, field: &[u8]) {
    out.extend_from_slice(&(field.len() as u16).to_be_bytes());
    out.extend_from_slice(field);
}

fn decode_field(bytes: &[u8], cursor: &mut usize) -> Result<alloc::vec::Vec<u8>, SecError> {
    if bytes.len() < *cursor + 2 {
        return Err(SecError::InvalidInputSize);
    }
    let len = u16::from_be_bytes([bytes[*cursor], bytes[*cursor + 1]]) as usize;
    *cursor += 2;
    if bytes.len() < *cursor + len {
        return Err(SecError::InvalidInputSize);
    }
    let field = bytes[*cursor..*cursor + len].to_vec();
    *cursor += len;
    Ok(field)
}

/// Reverse of [`encode_raw_rsa_private`], used by the processor when
/// reconstituting an RSA private key from an unwrapped envelope payload.
pub fn decode_raw_rsa_private(bytes: &[u8]) -> Result<RawRsaPrivate, SecError> {
    let mut cursor = 0usize;
    let n = decode_field(bytes, &mut cursor)?;
    let e = decode_field(bytes, &mut cursor)?;
    let d = decode_field(bytes, &mut cursor)?;
    let p = decode_field(bytes, &mut cursor)?;
    let q = decode_field(bytes, &mut cursor)?;
    Ok(RawRsaPrivate { n, e, d, p, q })
}

/// Reverse of [`encode_raw_rsa_public`].
pub fn decode_raw_rsa_public(bytes: &[u8]) -> Result<RawRsaPublic, SecError> {
    let mut cursor = 0usize;
    let n = decode_field(bytes, &mut cursor)?;
    let e = decode_field(bytes, &mut cursor)?;
    Ok(RawRsaPublic { n, e })
}
