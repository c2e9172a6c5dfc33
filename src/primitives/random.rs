//! Random number generation: `True` (cryptographic DRBG) vs `Prng`
//! (reproducible pseudo-random, seeded explicitly by the caller).

extern crate alloc;
use alloc::{vec, vec::Vec};

use rand_core::{OsRng, RngCore, SeedableRng};
use rand_core::impls::fill_bytes_via_next;

use crate::error::SecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomKind {
    /// Backed by the OS CSPRNG.
    True,
    /// Deterministic, seed-driven stream — for KAT-style reproducibility,
    /// never for key material meant to be unpredictable.
    Prng,
}

/// A minimal splitmix64-style deterministic generator for `RandomKind::Prng`.
/// Not cryptographically secure; used only where determinism is requested.
pub struct DeterministicRng(u64);

impl RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        fill_bytes_via_next(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for DeterministicRng {
    type Seed = [u8; 8];
    fn from_seed(seed: Self::Seed) -> Self {
        Self(u64::from_le_bytes(seed))
    }
}

pub fn generate(kind: RandomKind, len: usize, seed: Option<u64>) -> Result<Vec<u8>, SecError> {
    let mut out = vec![0u8; len];
    match kind {
        RandomKind::True => OsRng.fill_bytes(&mut out),
        RandomKind::Prng => {
            let seed = seed.ok_or(SecError::InvalidParameters)?;
            let mut rng = DeterministicRng::from_seed(seed.to_le_bytes());
            rng.fill_bytes(&mut out);
        }
    }
    Ok(out)
}
