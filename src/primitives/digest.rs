//! Digest primitives: SHA-1 and SHA-256 behind a three-call session.

extern crate alloc;
use alloc::vec::Vec;

use sha1::Sha1;
use sha2::{Digest as _, Sha256};

use crate::error::SecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlg {
    Sha1,
    Sha256,
}

impl DigestAlg {
    pub fn output_len(self) -> usize {
        match self {
            DigestAlg::Sha1 => 20,
            DigestAlg::Sha256 => 32,
        }
    }
}

enum Inner {
    Sha1(Sha1),
    Sha256(Sha256),
}

/// `GetInstance` → repeated `Update` → `Release`; the final call produces
/// the digest and consumes the session.
pub struct DigestSession {
    inner: Inner,
    finished: bool,
}

impl DigestSession {
    pub fn get_instance(alg: DigestAlg) -> Self {
        let inner = match alg {
            DigestAlg::Sha1 => Inner::Sha1(Sha1::new()),
            DigestAlg::Sha256 => Inner::Sha256(Sha256::new()),
        };
        Self { inner, finished: false }
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), SecError> {
        if self.finished {
            return Err(SecError::InvalidHandle);
        }
        match &mut self.inner {
            Inner::Sha1(h) => sha1::Digest::update(h, data),
            Inner::Sha256(h) => h.update(data),
        }
        Ok(())
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.finished = true;
        match self.inner {
            Inner::Sha1(h) => sha1::Digest::finalize(h).to_vec(),
            Inner::Sha256(h) => h.finalize().to_vec(),
        }
    }
}

pub fn digest_oneshot(alg: DigestAlg, data: &[u8]) -> Vec<u8> {
    let mut s = DigestSession::get_instance(alg);
    let _ = s.update(data);
    s.finish()
}
