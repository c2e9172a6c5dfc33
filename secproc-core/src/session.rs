//! Three-call `GetInstance`/`Update`/`Release` cryptographic sessions bound
//! to stored key handles. State lives behind `RefCell` rather than a lock —
//! the processor is single-threaded by spec.md §5, so interior mutability
//! without synchronization is sufficient. Grounded on the teacher's
//! `threat.rs` mutable-state-behind-`RefCell` pattern.

use std::cell::RefCell;

use rsa::{RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use secproc_crypto::envelope;
use secproc_crypto::error::SecError;
use secproc_crypto::primitives::cipher::{CipherDirection, CipherMode, CipherSession};
use secproc_crypto::primitives::digest::{DigestAlg, DigestSession};
use secproc_crypto::primitives::mac::{MacAlg, MacSession};
use secproc_crypto::primitives::signature;

use crate::types::{KeyRecord, KeyType};

fn unwrap_symmetric(record: &KeyRecord, k_store: &[u8; 16], k_mac: &[u8; 16]) -> Result<Zeroizing<Vec<u8>>, SecError> {
    envelope::validate(&record.envelope_bytes, k_store, k_mac)
}

/// spec.md §4.5's closing sentence: every session validates the stored
/// key's type against the requested algorithm before allocating state.
fn cipher_key_type_compatible(key_type: KeyType) -> bool {
    matches!(key_type, KeyType::Aes128 | KeyType::Aes256)
}

fn mac_key_type_compatible(alg: MacAlg, key_type: KeyType) -> bool {
    match alg {
        MacAlg::CmacAes128 => matches!(key_type, KeyType::Aes128),
        MacAlg::HmacSha1 | MacAlg::HmacSha256 => {
            matches!(key_type, KeyType::Hmac128 | KeyType::Hmac160 | KeyType::Hmac256)
        }
    }
}

// ---------------------------------------------------------------------------
// Cipher
// ---------------------------------------------------------------------------

pub struct CipherHandle {
    inner: RefCell<Option<CipherSession>>,
}

impl CipherHandle {
    pub fn get_instance(
        record: &KeyRecord,
        k_store: &[u8; 16],
        k_mac: &[u8; 16],
        iv: [u8; 16],
        mode: CipherMode,
        direction: CipherDirection,
    ) -> Result<Self, SecError> {
        if !cipher_key_type_compatible(record.info.key_type) {
            return Err(SecError::InvalidParameters);
        }
        let clear = unwrap_symmetric(record, k_store, k_mac)?;
        let session = CipherSession::get_instance(&clear, iv, mode, direction)?;
        Ok(Self { inner: RefCell::new(Some(session)) })
    }

    pub fn update(&self, data: &[u8], last: bool) -> Result<Vec<u8>, SecError> {
        let mut guard = self.inner.borrow_mut();
        let session = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        session.update(data, last)
    }

    pub fn release(&self) {
        self.inner.borrow_mut().take();
    }
}

// ---------------------------------------------------------------------------
// Digest
// ---------------------------------------------------------------------------

pub struct DigestHandle {
    inner: RefCell<Option<DigestSession>>,
}

impl DigestHandle {
    pub fn get_instance(alg: DigestAlg) -> Self {
        Self { inner: RefCell::new(Some(DigestSession::get_instance(alg))) }
    }

    pub fn update(&self, data: &[u8]) -> Result<(), SecError> {
        let mut guard = self.inner.borrow_mut();
        let session = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        session.update(data)
    }

    /// Feeds a stored key's unwrapped clear bytes into the digest. The
    /// clear buffer is zeroized the instant this call returns.
    pub fn update_with_key(&self, record: &KeyRecord, k_store: &[u8; 16], k_mac: &[u8; 16]) -> Result<(), SecError> {
        let clear = unwrap_symmetric(record, k_store, k_mac)?;
        let mut guard = self.inner.borrow_mut();
        let session = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        session.update(&clear)
    }

    pub fn release(&self) -> Result<Vec<u8>, SecError> {
        let session = self.inner.borrow_mut().take().ok_or(SecError::InvalidHandle)?;
        Ok(session.finish())
    }
}

// ---------------------------------------------------------------------------
// MAC
// ---------------------------------------------------------------------------

pub struct MacHandle {
    inner: RefCell<Option<MacSession>>,
}

impl MacHandle {
    pub fn get_instance(
        alg: MacAlg,
        key_record: &KeyRecord,
        k_store: &[u8; 16],
        k_mac: &[u8; 16],
    ) -> Result<Self, SecError> {
        if !mac_key_type_compatible(alg, key_record.info.key_type) {
            return Err(SecError::InvalidParameters);
        }
        let clear = unwrap_symmetric(key_record, k_store, k_mac)?;
        let session = MacSession::get_instance(alg, &clear)?;
        Ok(Self { inner: RefCell::new(Some(session)) })
    }

    pub fn update(&self, data: &[u8]) -> Result<(), SecError> {
        let mut guard = self.inner.borrow_mut();
        let session = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        session.update(data)
    }

    pub fn update_with_key(&self, record: &KeyRecord, k_store: &[u8; 16], k_mac: &[u8; 16]) -> Result<(), SecError> {
        let clear = unwrap_symmetric(record, k_store, k_mac)?;
        let mut guard = self.inner.borrow_mut();
        let session = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        session.update(&clear)
    }

    pub fn release(&self) -> Result<Vec<u8>, SecError> {
        let session = self.inner.borrow_mut().take().ok_or(SecError::InvalidHandle)?;
        Ok(session.finish())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFlavor {
    /// Hash the accumulated message internally before signing/verifying.
    Data,
    /// The accumulated bytes already are the digest.
    Digest,
}

/// Accumulates message/digest bytes across `Update` calls; `release_sign`
/// or `release_verify` finalizes and consumes the session. The L0
/// `signature` module is single-shot, so accumulation happens at this
/// layer.
pub struct SignatureSession {
    buffer: RefCell<Option<Vec<u8>>>,
    flavor: SignatureFlavor,
    alg: DigestAlg,
}

impl SignatureSession {
    pub fn get_instance(flavor: SignatureFlavor, alg: DigestAlg) -> Self {
        Self { buffer: RefCell::new(Some(Vec::new())), flavor, alg }
    }

    pub fn update(&self, data: &[u8]) -> Result<(), SecError> {
        let mut guard = self.buffer.borrow_mut();
        let buf = guard.as_mut().ok_or(SecError::InvalidHandle)?;
        if self.flavor == SignatureFlavor::Digest && !buf.is_empty() {
            return Err(SecError::InvalidParameters);
        }
        buf.extend_from_slice(data);
        Ok(())
    }

    pub fn release_sign(&self, privkey: &RsaPrivateKey) -> Result<Vec<u8>, SecError> {
        let buf = self.buffer.borrow_mut().take().ok_or(SecError::InvalidHandle)?;
        match self.flavor {
            SignatureFlavor::Data => signature::sign_data(privkey, self.alg, &buf),
            SignatureFlavor::Digest => signature::sign_digest(privkey, self.alg, &buf),
        }
    }

    pub fn release_verify(&self, pubkey: &RsaPublicKey, sig: &[u8]) -> Result<(), SecError> {
        let buf = self.buffer.borrow_mut().take().ok_or(SecError::InvalidHandle)?;
        match self.flavor {
            SignatureFlavor::Data => signature::verify_data(pubkey, self.alg, &buf, sig),
            SignatureFlavor::Digest => signature::verify_digest(pubkey, self.alg, &buf, sig),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::{provision, KeyContainerInput, SealingKeys};
    use crate::types::KeyType;
    use rand_core::OsRng;

    #[test]
    fn cipher_handle_round_trips_ecb_block() {
        let k_store = [1u8; 16];
        let k_mac = [2u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let key_bytes: [u8; 16] = core::array::from_fn(|i| i as u8);
        let record = provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Aes128, bytes: &key_bytes })
            .unwrap();

        let plaintext: [u8; 16] = core::array::from_fn(|i| (i + 0x10) as u8);
        let enc = CipherHandle::get_instance(
            &record,
            &k_store,
            &k_mac,
            [0u8; 16],
            CipherMode::EcbNoPad,
            CipherDirection::Encrypt,
        )
        .unwrap();
        let ciphertext = enc.update(&plaintext, true).unwrap();
        enc.release();

        let dec = CipherHandle::get_instance(
            &record,
            &k_store,
            &k_mac,
            [0u8; 16],
            CipherMode::EcbNoPad,
            CipherDirection::Decrypt,
        )
        .unwrap();
        let recovered = dec.update(&ciphertext, true).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn cipher_handle_rejects_second_update_after_last() {
        let k_store = [3u8; 16];
        let k_mac = [4u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let record =
            provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Aes128, bytes: &[0u8; 16] }).unwrap();

        let session = CipherHandle::get_instance(
            &record,
            &k_store,
            &k_mac,
            [0u8; 16],
            CipherMode::Ctr,
            CipherDirection::Encrypt,
        )
        .unwrap();
        session.update(b"first", true).unwrap();
        assert_eq!(session.update(b"second", false).unwrap_err(), SecError::Failure);
    }

    #[test]
    fn cipher_handle_rejects_mismatched_key_type() {
        let k_store = [11u8; 16];
        let k_mac = [12u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let record =
            provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Hmac128, bytes: &[0u8; 16] }).unwrap();

        let err = CipherHandle::get_instance(
            &record,
            &k_store,
            &k_mac,
            [0u8; 16],
            CipherMode::EcbNoPad,
            CipherDirection::Encrypt,
        )
        .unwrap_err();
        assert_eq!(err, SecError::InvalidParameters);
    }

    #[test]
    fn mac_handle_rejects_mismatched_key_type() {
        let k_store = [13u8; 16];
        let k_mac = [14u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let record =
            provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Aes128, bytes: &[0u8; 16] }).unwrap();

        let err = MacHandle::get_instance(MacAlg::HmacSha256, &record, &k_store, &k_mac).unwrap_err();
        assert_eq!(err, SecError::InvalidParameters);

        let err = MacHandle::get_instance(MacAlg::CmacAes128, &record, &k_store, &k_mac);
        assert!(err.is_ok(), "CMAC-AES128 over an AES-128 key must still be accepted");
    }

    #[test]
    fn mac_handle_over_stored_key() {
        let k_store = [5u8; 16];
        let k_mac = [6u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let record =
            provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Hmac256, bytes: &[7u8; 32] }).unwrap();

        let session = MacHandle::get_instance(MacAlg::HmacSha256, &record, &k_store, &k_mac).unwrap();
        session.update(b"message").unwrap();
        let tag_a = session.release().unwrap();

        let session_b = MacHandle::get_instance(MacAlg::HmacSha256, &record, &k_store, &k_mac).unwrap();
        session_b.update(b"message").unwrap();
        let tag_b = session_b.release().unwrap();
        assert_eq!(tag_a, tag_b);
    }

    #[test]
    fn digest_handle_accepts_key_handle_bytes() {
        let k_store = [7u8; 16];
        let k_mac = [8u8; 16];
        let keys = SealingKeys { k_store: &k_store, k_mac: &k_mac, iv: [0u8; 16] };
        let record =
            provision(&keys, KeyContainerInput::RawSymmetric { key_type: KeyType::Aes128, bytes: &[9u8; 16] }).unwrap();

        let session = DigestHandle::get_instance(DigestAlg::Sha256);
        session.update_with_key(&record, &k_store, &k_mac).unwrap();
        let digest = session.release().unwrap();
        assert_eq!(digest.len(), 32);
    }

    #[test]
    fn signature_session_sign_then_verify() {
        let privkey = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        let pubkey = RsaPublicKey::from(&privkey);

        let signer = SignatureSession::get_instance(SignatureFlavor::Data, DigestAlg::Sha256);
        signer.update(b"message to sign").unwrap();
        let sig = signer.release_sign(&privkey).unwrap();

        let verifier = SignatureSession::get_instance(SignatureFlavor::Data, DigestAlg::Sha256);
        verifier.update(b"message to sign").unwrap();
        verifier.release_verify(&pubkey, &sig).unwrap();
    }

    #[test]
    fn signature_session_digest_flavor_rejects_second_update() {
        let session = SignatureSession::get_instance(SignatureFlavor::Digest, DigestAlg::Sha256);
        session.update(&[0u8; 32]).unwrap();
        assert_eq!(session.update(&[1u8; 32]).unwrap_err(), SecError::InvalidParameters);
    }
}
