//! RSA-PKCS#1 signatures, "data" (hash-then-sign) and "digest" (sign a
//! caller-supplied digest directly) flavors, over SHA-1 or SHA-256.

extern crate alloc;
use alloc::vec::Vec;

use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::signature::{Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::SecError;
use crate::primitives::digest::DigestAlg;

/// Sign the message itself (hashes internally, then PKCS#1v1.5-signs).
pub fn sign_data(privkey: &RsaPrivateKey, alg: DigestAlg, message: &[u8]) -> Result<Vec<u8>, SecError> {
    match alg {
        DigestAlg::Sha1 => {
            let key = SigningKey::<Sha1>::new(privkey.clone());
            Ok(key.sign(message).to_vec())
        }
        DigestAlg::Sha256 => {
            let key = SigningKey::<Sha256>::new(privkey.clone());
            Ok(key.sign(message).to_vec())
        }
    }
}

/// Sign a caller-supplied digest directly (no internal hashing).
pub fn sign_digest(privkey: &RsaPrivateKey, alg: DigestAlg, digest: &[u8]) -> Result<Vec<u8>, SecError> {
    if digest.len() != alg.output_len() {
        return Err(SecError::InvalidInputSize);
    }
    match alg {
        DigestAlg::Sha1 => {
            let key = SigningKey::<Sha1>::new(privkey.clone());
            let sig = key.sign_prehash(digest).map_err(|_| SecError::Failure)?;
            Ok(sig.to_vec())
        }
        DigestAlg::Sha256 => {
            let key = SigningKey::<Sha256>::new(privkey.clone());
            let sig = key.sign_prehash(digest).map_err(|_| SecError::Failure)?;
            Ok(sig.to_vec())
        }
    }
}

pub fn verify_data(pubkey: &RsaPublicKey, alg: DigestAlg, message: &[u8], sig: &[u8]) -> Result<(), SecError> {
    let signature = Signature::try_from(sig).map_err(|_| SecError::InvalidParameters)?;
    let ok = match alg {
        DigestAlg::Sha1 => VerifyingKey::<Sha1>::new(pubkey.clone())
            .verify(message, &signature)
            .is_ok(),
        DigestAlg::Sha256 => VerifyingKey::<Sha256>::new(pubkey.clone())
            .verify(message, &signature)
            .is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(SecError::VerificationFailed)
    }
}

pub fn verify_digest(pubkey: &RsaPublicKey, alg: DigestAlg, digest: &[u8], sig: &[u8]) -> Result<(), SecError> {
    if digest.len() != alg.output_len() {
        return Err(SecError::InvalidInputSize);
    }
    let signature = Signature::try_from(sig).map_err(|_| SecError::InvalidParameters)?;
    let ok = match alg {
        DigestAlg::Sha1 => VerifyingKey::<Sha1>::new(pubkey.clone())
            .verify_prehash(digest, &signature)
            .is_ok(),
        DigestAlg::Sha256 => VerifyingKey::<Sha256>::new(pubkey.clone())
            .verify_prehash(digest, &signature)
            .is_ok(),
    };
    if ok {
        Ok(())
    } else {
        Err(SecError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    fn test_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&mut OsRng, 1024).unwrap()
    }

    #[test]
    fn sign_verify_data_roundtrip() {
        let privkey = test_key();
        let pubkey = RsaPublicKey::from(&privkey);
        let sig = sign_data(&privkey, DigestAlg::Sha256, b"message to sign").unwrap();
        assert!(verify_data(&pubkey, DigestAlg::Sha256, b"message to sign", &sig).is_ok());
    }

    #[test]
    fn verify_data_rejects_wrong_key() {
        let privkey = test_key();
        let other = RsaPublicKey::from(&test_key());
        let sig = sign_data(&privkey, DigestAlg::Sha256, b"message").unwrap();
        assert!(verify_data(&other, DigestAlg::Sha256, b"message", &sig).is_err());
    }

    #[test]
    fn sign_verify_digest_roundtrip() {
        let privkey = test_key();
        let pubkey = RsaPublicKey::from(&privkey);
        let digest = crate::primitives::digest::digest_oneshot(DigestAlg::Sha256, b"payload");
        let sig = sign_digest(&privkey, DigestAlg::Sha256, &digest).unwrap();
        assert!(verify_digest(&pubkey, DigestAlg::Sha256, &digest, &sig).is_ok());
    }
}
