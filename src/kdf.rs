//! The four key-derivation functions fronted by the per-nonce base-key
//! provisioning ladder: HKDF, Concat-KDF, PBKDF2, VendorAes128, and
//! KeyLadderAes128.

extern crate alloc;
use alloc::{string::String, vec, vec::Vec};

use hkdf::Hkdf;
use sha1::Sha1;
use sha2::{Digest as _, Sha256};

use crate::error::SecError;
use crate::ladder::DerivedContainer;
use crate::primitives::cipher::aes128_ecb_encrypt_block;
use crate::primitives::digest::DigestAlg;
use crate::primitives::mac::{mac_oneshot, MacAlg};

fn mac_alg_for(alg: DigestAlg) -> MacAlg {
    match alg {
        DigestAlg::Sha1 => MacAlg::HmacSha1,
        DigestAlg::Sha256 => MacAlg::HmacSha256,
    }
}

// ---------------------------------------------------------------------------
// Base-key provisioning ladder
// ---------------------------------------------------------------------------

/// Derive the four 16-byte ladder inputs `c1..c4` from
/// `(nonce, derivation_string, cipher_string, digest_alg)`. The helper is
/// deterministic but otherwise unspecified by the source beyond its name
/// ("SIV-SHA-1") — it is built here from SHA-1 over the tagged inputs.
fn ladder_inputs(nonce: &[u8], derivation_string: &str, cipher_string: &str, digest_alg: DigestAlg) -> [[u8; 16]; 4] {
    let digest_tag = match digest_alg {
        DigestAlg::Sha1 => "sha1",
        DigestAlg::Sha256 => "sha256",
    };
    let mut out = [[0u8; 16]; 4];
    for (i, slot) in out.iter_mut().enumerate() {
        let mut hasher = Sha1::new();
        sha1::Digest::update(&mut hasher, nonce);
        sha1::Digest::update(&mut hasher, derivation_string.as_bytes());
        sha1::Digest::update(&mut hasher, cipher_string.as_bytes());
        sha1::Digest::update(&mut hasher, digest_tag.as_bytes());
        sha1::Digest::update(&mut hasher, &[(i + 1) as u8]);
        let digest = sha1::Digest::finalize(hasher);
        slot.copy_from_slice(&digest[..16]);
    }
    out
}

/// `_ProvisionBaseKey(nonce)` math: chain four AES-ECB encryptions starting
/// from the device root key, each keyed by the previous step's output and
/// enciphering the next ladder input. The final 16 bytes are provisioned
/// (by the caller, in `secproc-core`) as both the AES-128 and HMAC-128
/// base keys.
pub fn provision_base_key_material(
    root: &[u8; 16],
    nonce: &[u8],
    derivation_string: &str,
    cipher_string: &str,
    digest_alg: DigestAlg,
) -> [u8; 16] {
    let inputs = ladder_inputs(nonce, derivation_string, cipher_string, digest_alg);
    let mut key = *root;
    for c in inputs {
        key = aes128_ecb_encrypt_block(&key, &c);
    }
    key
}

// ---------------------------------------------------------------------------
// HKDF
// ---------------------------------------------------------------------------

pub fn hkdf(digest_alg: DigestAlg, base_mac_key: &[u8], salt: &[u8], info: &[u8], out_len: usize) -> Result<Vec<u8>, SecError> {
    let mut okm = vec![0u8; out_len];
    match digest_alg {
        DigestAlg::Sha1 => {
            let hk = Hkdf::<Sha1>::new(Some(salt), base_mac_key);
            hk.expand(info, &mut okm).map_err(|_| SecError::InvalidInputSize)?;
        }
        DigestAlg::Sha256 => {
            let hk = Hkdf::<Sha256>::new(Some(salt), base_mac_key);
            hk.expand(info, &mut okm).map_err(|_| SecError::InvalidInputSize)?;
        }
    }
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Concat-KDF (digest-based, SP 800-56A-style concatenation with BE32 counter)
// ---------------------------------------------------------------------------

pub fn concat_kdf(digest_alg: DigestAlg, base_key_aes_clear: &[u8], other_info: &[u8], out_len: usize) -> Vec<u8> {
    let h = digest_alg.output_len();
    let rounds = (out_len + h - 1) / h;
    let mut out = Vec::with_capacity(rounds * h);
    for i in 1..=rounds as u32 {
        let counter = i.to_be_bytes();
        let block = match digest_alg {
            DigestAlg::Sha1 => {
                let mut hasher = Sha1::new();
                sha1::Digest::update(&mut hasher, counter);
                sha1::Digest::update(&mut hasher, base_key_aes_clear);
                sha1::Digest::update(&mut hasher, other_info);
                sha1::Digest::finalize(hasher).to_vec()
            }
            DigestAlg::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(counter);
                hasher.update(base_key_aes_clear);
                hasher.update(other_info);
                hasher.finalize().to_vec()
            }
        };
        out.extend_from_slice(&block);
    }
    out.truncate(out_len);
    out
}

// ---------------------------------------------------------------------------
// PBKDF2 (MAC-driven, per the literal U_1/U_j/T_i construction)
// ---------------------------------------------------------------------------

pub fn pbkdf2(
    digest_alg: DigestAlg,
    base_key_mac: &[u8],
    salt: &[u8],
    iterations: u32,
    out_len: usize,
) -> Result<Vec<u8>, SecError> {
    if iterations == 0 {
        return Err(SecError::InvalidParameters);
    }
    let mac_alg = mac_alg_for(digest_alg);
    let h = digest_alg.output_len();
    let rounds = (out_len + h - 1) / h;
    let mut out = Vec::with_capacity(rounds * h);

    for i in 1..=rounds as u32 {
        let mut block_input = Vec::with_capacity(salt.len() + 4);
        block_input.extend_from_slice(salt);
        block_input.extend_from_slice(&i.to_be_bytes());

        let mut u = mac_oneshot(mac_alg, base_key_mac, &block_input)?;
        let mut t = u.clone();
        for _ in 1..iterations {
            u = mac_oneshot(mac_alg, base_key_mac, &u)?;
            for (t_byte, u_byte) in t.iter_mut().zip(u.iter()) {
                *t_byte ^= u_byte;
            }
        }
        out.extend_from_slice(&t);
    }
    out.truncate(out_len);
    Ok(out)
}

// ---------------------------------------------------------------------------
// VendorAes128
// ---------------------------------------------------------------------------

pub fn vendor_aes128(input: &[u8]) -> DerivedContainer {
    let digest = Sha256::digest(input);
    let mut input1 = [0u8; 16];
    let mut input2 = [0u8; 16];
    input1.copy_from_slice(&digest[..16]);
    input2.copy_from_slice(&digest[16..]);
    DerivedContainer::new(input1, input2)
}

// ---------------------------------------------------------------------------
// KeyLadderAes128
// ---------------------------------------------------------------------------

pub const UNIQUE_ROOT: &str = "UNIQUE";

pub fn key_ladder_aes128(
    root: &str,
    input1: Option<[u8; 16]>,
    input2: Option<[u8; 16]>,
    input3: Option<[u8; 16]>,
    input4: Option<[u8; 16]>,
) -> Result<DerivedContainer, SecError> {
    if root != UNIQUE_ROOT {
        return Err(SecError::InvalidParameters);
    }
    if input3.is_some() || input4.is_some() {
        return Err(SecError::InvalidParameters);
    }
    match (input1, input2) {
        (Some(a), Some(b)) => Ok(DerivedContainer::new(a, b)),
        _ => Err(SecError::InvalidParameters),
    }
}
