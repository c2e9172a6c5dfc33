//! L0 cryptographic primitives: cipher, digest, MAC, signature, random.
//! Each is a small three-call session type (`GetInstance` → `Update*` →
//! `Release`/`finish`) mirroring the teacher's state-machine idiom.

pub mod cipher;
pub mod digest;
pub mod mac;
pub mod random;
pub mod signature;
