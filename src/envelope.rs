//! Key-store envelope: seal/validate over the `wire` byte layout. Keyed by
//! two soft-wrapped derived keys, `K_store` (AES-128-CBC) and `K_mac`
//! (HMAC-SHA-256), both provisioned at boot via the two-step AES-ECB ladder.

extern crate alloc;
use alloc::vec::Vec;

use zeroize::Zeroizing;

use crate::error::SecError;
use crate::primitives::cipher::{cbc_decrypt_pkcs7, cbc_encrypt_pkcs7};
use crate::primitives::mac::{self, mac_oneshot, MacAlg};
use crate::wire::{self, EnvelopeView, InnerContainerKind, UserHeader};

/// Seal `payload` into a key-store envelope under `k_store`/`k_mac`
/// (both 16 bytes), using the caller-supplied IV.
pub fn seal(
    k_store: &[u8; 16],
    k_mac: &[u8; 16],
    iv: [u8; 16],
    original_container_type: u8,
    inner_kind: InnerContainerKind,
    key_type_tag: u8,
    payload: &[u8],
) -> Result<Vec<u8>, SecError> {
    if payload.len() > u32::MAX as usize {
        return Err(SecError::InvalidInputSize);
    }
    let header = UserHeader {
        original_container_type,
        inner_kind,
        key_type_tag,
        payload_length: payload.len() as u32,
    };
    let ciphertext = cbc_encrypt_pkcs7(k_store, &iv, payload)?;

    let header_bytes = header.to_bytes();
    let mut mac_input = Vec::with_capacity(header_bytes.len() + iv.len() + ciphertext.len());
    mac_input.extend_from_slice(&header_bytes);
    mac_input.extend_from_slice(&iv);
    mac_input.extend_from_slice(&ciphertext);
    let tag = mac_oneshot(MacAlg::HmacSha256, k_mac, &mac_input)?;
    let tag: [u8; 32] = tag.try_into().map_err(|_| SecError::Failure)?;

    Ok(wire::encode_envelope(header, &iv, &ciphertext, &tag))
}

/// Validate and open a key-store envelope. Recomputes the MAC with a
/// constant-time compare before attempting to decrypt; the unwrapped
/// payload is returned zeroizing-on-drop.
pub fn validate(data: &[u8], k_store: &[u8; 16], k_mac: &[u8; 16]) -> Result<Zeroizing<Vec<u8>>, SecError> {
    let EnvelopeView {
        header,
        iv,
        ciphertext,
        mac: expected_tag,
        mac_input,
    } = wire::decode_envelope(data)?;

    let actual_tag = mac_oneshot(MacAlg::HmacSha256, k_mac, mac_input)?;
    mac::verify(expected_tag, &actual_tag)?;

    let mut payload = Zeroizing::new(cbc_decrypt_pkcs7(k_store, iv, ciphertext)?);
    if payload.len() != header.payload_length as usize {
        payload.clear();
        return Err(SecError::InvalidInputSize);
    }
    Ok(payload)
}
