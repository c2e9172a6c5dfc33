//! Key-ladder emulation: stands in for a hardware key ladder by chaining
//! two AES-ECB encryptions under the device root key.

use crate::error::SecError;
use crate::primitives::cipher::aes128_ecb_encrypt_block;

/// Both intentionally return 2: the ladder this simulator emulates is a
/// fixed two-stage ladder, not a configurable-depth one. Kept as observed
/// rather than "fixed" to a different depth with no basis in the spec.
pub const MIN_DEPTH: u32 = 2;
pub const MAX_DEPTH: u32 = 2;

/// A "derived" key container: two 16-byte ladder inputs that expand, under
/// the device root key, into a 16-byte AES-128 key. Stands in for the
/// hardware key ladder's intermediate state.
#[derive(Debug, Clone, Copy)]
pub struct DerivedContainer {
    pub input1: [u8; 16],
    pub input2: [u8; 16],
}

impl DerivedContainer {
    pub fn new(input1: [u8; 16], input2: [u8; 16]) -> Self {
        Self { input1, input2 }
    }

    /// 32-byte on-disk payload: `input1 || input2`.
    pub fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        out[..16].copy_from_slice(&self.input1);
        out[16..].copy_from_slice(&self.input2);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SecError> {
        if bytes.len() != 32 {
            return Err(SecError::InvalidInputSize);
        }
        let input1: [u8; 16] = bytes[..16].try_into().unwrap();
        let input2: [u8; 16] = bytes[16..].try_into().unwrap();
        Ok(Self { input1, input2 })
    }
}

/// Expand a derived container into a concrete AES-128 key using the two
/// chained AES-ECB steps: `step1 = E(root, input1)`, `key = E(step1, input2)`.
pub fn expand(root: &[u8; 16], container: DerivedContainer) -> [u8; 16] {
    let step1 = aes128_ecb_encrypt_block(root, &container.input1);
    aes128_ecb_encrypt_block(&step1, &container.input2)
}
