//! Key-store envelope wire format.
//!
//! ```text
//! magic[8] || header[8] || iv[16] || ciphertext[n] || mac[32]
//! ```
//!
//! `header` records the original container type, the inner container kind
//! (raw vs. derived), a key-type tag, and the payload length. `ciphertext`
//! is AES-128-CBC over the PKCS#7-padded payload, so its length is always a
//! multiple of 16 and at least 16. `mac` is HMAC-SHA-256 over
//! `header || iv || ciphertext` — `magic` is a framing tag, not authenticated
//! data, since it never varies.

extern crate alloc;
use alloc::vec::Vec;

use crate::error::SecError;

pub const MAGIC: &[u8; 8] = b"SECSTORE";
pub const HEADER_BYTES: usize = 8;
pub const IV_BYTES: usize = 16;
pub const MAC_BYTES: usize = 32;
pub const BLOCK_BYTES: usize = 16;

pub const MIN_ENVELOPE_BYTES: usize = MAGIC.len() + HEADER_BYTES + IV_BYTES + BLOCK_BYTES + MAC_BYTES;

/// Inner container kind: whether the sealed payload is a raw key/cert body
/// or a derived-container placeholder (spec.md §3 "inner container kind").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerContainerKind {
    Raw,
    Derived,
}

impl InnerContainerKind {
    fn to_byte(self) -> u8 {
        match self {
            InnerContainerKind::Raw => 0,
            InnerContainerKind::Derived => 1,
        }
    }

    fn from_byte(b: u8) -> Result<Self, SecError> {
        match b {
            0 => Ok(InnerContainerKind::Raw),
            1 => Ok(InnerContainerKind::Derived),
            _ => Err(SecError::InvalidParameters),
        }
    }
}

/// The small, fixed user header carried in the clear ahead of the IV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserHeader {
    /// The original container type the payload was provisioned from.
    pub original_container_type: u8,
    pub inner_kind: InnerContainerKind,
    /// Tags the key type the unwrapped payload will be interpreted as.
    pub key_type_tag: u8,
    pub payload_length: u32,
}

impl UserHeader {
    pub fn to_bytes(self) -> [u8; HEADER_BYTES] {
        let mut out = [0u8; HEADER_BYTES];
        out[0] = self.original_container_type;
        out[1] = self.inner_kind.to_byte();
        out[2] = self.key_type_tag;
        out[3] = 0;
        out[4..8].copy_from_slice(&self.payload_length.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_BYTES]) -> Result<Self, SecError> {
        Ok(Self {
            original_container_type: bytes[0],
            inner_kind: InnerContainerKind::from_byte(bytes[1])?,
            key_type_tag: bytes[2],
            payload_length: u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        })
    }
}

/// Borrowed view over a parsed envelope.
pub struct EnvelopeView<'a> {
    pub header: UserHeader,
    pub iv: &'a [u8; IV_BYTES],
    pub ciphertext: &'a [u8],
    pub mac: &'a [u8; MAC_BYTES],
    /// The region the MAC is computed over: `header || iv || ciphertext`.
    pub mac_input: &'a [u8],
}

pub fn decode_envelope(data: &[u8]) -> Result<EnvelopeView<'_>, SecError> {
    if data.len() < MIN_ENVELOPE_BYTES {
        return Err(SecError::InvalidInputSize);
    }
    if &data[..MAGIC.len()] != MAGIC.as_slice() {
        return Err(SecError::InvalidParameters);
    }

    let header_start = MAGIC.len();
    let header_end = header_start + HEADER_BYTES;
    let header_bytes: &[u8; HEADER_BYTES] = data[header_start..header_end]
        .try_into()
        .map_err(|_| SecError::InvalidInputSize)?;
    let header = UserHeader::from_bytes(header_bytes)?;

    let iv_start = header_end;
    let iv_end = iv_start + IV_BYTES;
    let iv: &[u8; IV_BYTES] = data[iv_start..iv_end]
        .try_into()
        .map_err(|_| SecError::InvalidInputSize)?;

    let mac_start = data.len() - MAC_BYTES;
    let ciphertext = &data[iv_end..mac_start];
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_BYTES != 0 {
        return Err(SecError::InvalidInputSize);
    }

    // Total length is recoverable from the header and embedded lengths; a
    // store blob whose self-described length disagrees with the byte count
    // is rejected outright, before any cryptographic work happens. PKCS#7
    // padding always adds between 1 and BLOCK_BYTES bytes, so the claimed
    // plaintext length must fall in `[ciphertext_len - BLOCK_BYTES, ciphertext_len - 1]`.
    let header_says = header.payload_length as usize;
    let min_valid = ciphertext.len() - BLOCK_BYTES;
    let max_valid = ciphertext.len() - 1;
    if header_says < min_valid || header_says > max_valid {
        return Err(SecError::InvalidInputSize);
    }

    let mac: &[u8; MAC_BYTES] = data[mac_start..]
        .try_into()
        .map_err(|_| SecError::InvalidInputSize)?;

    Ok(EnvelopeView {
        header,
        iv,
        ciphertext,
        mac,
        mac_input: &data[header_start..mac_start],
    })
}

pub fn encode_envelope(
    header: UserHeader,
    iv: &[u8; IV_BYTES],
    ciphertext: &[u8],
    mac: &[u8; MAC_BYTES],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAGIC.len() + HEADER_BYTES + IV_BYTES + ciphertext.len() + MAC_BYTES);
    out.extend_from_slice(MAGIC.as_slice());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);
    out.extend_from_slice(mac);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header(payload_len: u32) -> UserHeader {
        UserHeader {
            original_container_type: 3,
            inner_kind: InnerContainerKind::Raw,
            key_type_tag: 1,
            payload_length: payload_len,
        }
    }

    #[test]
    fn header_roundtrips_through_bytes() {
        let header = sample_header(24);
        let bytes = header.to_bytes();
        let restored = UserHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header, restored);
    }

    #[test]
    fn envelope_roundtrips_and_mac_input_excludes_magic() {
        let header = sample_header(11);
        let iv = [0x5au8; IV_BYTES];
        let ciphertext = [0x11u8; 16];
        let mac = [0x22u8; MAC_BYTES];
        let encoded = encode_envelope(header, &iv, &ciphertext, &mac);
        let view = decode_envelope(&encoded).unwrap();
        assert_eq!(view.header, header);
        assert_eq!(view.ciphertext, &ciphertext);
        assert_eq!(view.mac_input.len(), HEADER_BYTES + IV_BYTES + ciphertext.len());
        assert!(!view.mac_input.starts_with(MAGIC.as_slice()));
    }

    #[test]
    fn decode_rejects_bad_magic() {
        let mut encoded = encode_envelope(sample_header(11), &[0u8; IV_BYTES], &[0u8; 16], &[0u8; MAC_BYTES]);
        encoded[0] ^= 0xFF;
        assert_eq!(decode_envelope(&encoded).unwrap_err(), SecError::InvalidParameters);
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        // One block of ciphertext (16 bytes) can only unpad to 0..=15
        // plaintext bytes; 32 is out of range regardless of padding.
        let header = sample_header(32);
        let encoded = encode_envelope(header, &[0u8; IV_BYTES], &[0u8; 16], &[0u8; MAC_BYTES]);
        assert_eq!(decode_envelope(&encoded).unwrap_err(), SecError::InvalidInputSize);
    }

    #[test]
    fn decode_rejects_short_buffer() {
        assert_eq!(decode_envelope(&[0u8; 4]).unwrap_err(), SecError::InvalidInputSize);
    }
}
