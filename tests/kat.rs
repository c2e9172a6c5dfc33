//! Known-answer / structural tests for the key-store envelope wire format
//! and the key-ladder math, exercised as a whole crate rather than from
//! inside each module.

use secproc_crypto::envelope;
use secproc_crypto::kdf::{self, UNIQUE_ROOT};
use secproc_crypto::ladder::{self, DerivedContainer};
use secproc_crypto::primitives::digest::DigestAlg;
use secproc_crypto::wire::{self, InnerContainerKind, MIN_ENVELOPE_BYTES};

#[test]
fn test_envelope_constants() {
    assert_eq!(wire::MAGIC, b"SECSTORE");
    assert_eq!(wire::HEADER_BYTES, 8);
    assert_eq!(wire::IV_BYTES, 16);
    assert_eq!(wire::MAC_BYTES, 32);
    assert_eq!(wire::BLOCK_BYTES, 16);
    assert_eq!(MIN_ENVELOPE_BYTES, 8 + 8 + 16 + 16 + 32);
}

#[test]
fn test_envelope_wire_structure() {
    let k_store = [0x10u8; 16];
    let k_mac = [0x20u8; 16];
    let iv = [0x30u8; 16];
    let payload = b"known answer payload";

    let sealed = envelope::seal(&k_store, &k_mac, iv, 3, InnerContainerKind::Raw, 7, payload).unwrap();
    assert!(sealed.starts_with(wire::MAGIC.as_slice()));

    let view = wire::decode_envelope(&sealed).unwrap();
    assert_eq!(view.header.original_container_type, 3);
    assert_eq!(view.header.inner_kind, InnerContainerKind::Raw);
    assert_eq!(view.header.key_type_tag, 7);
    assert_eq!(view.header.payload_length as usize, payload.len());
    assert_eq!(view.iv, &iv);
}

#[test]
fn test_ladder_depth_is_fixed_at_two() {
    assert_eq!(ladder::MIN_DEPTH, 2);
    assert_eq!(ladder::MAX_DEPTH, 2);
}

#[test]
fn test_key_ladder_aes128_known_answer() {
    let input1 = [0x01u8; 16];
    let input2 = [0x02u8; 16];
    let container = kdf::key_ladder_aes128(UNIQUE_ROOT, Some(input1), Some(input2), None, None).unwrap();
    assert_eq!(container.input1, input1);
    assert_eq!(container.input2, input2);

    let root = [0xAAu8; 16];
    let expanded_a = ladder::expand(&root, container);
    let expanded_b = ladder::expand(&root, DerivedContainer::new(input1, input2));
    assert_eq!(expanded_a, expanded_b);
}

#[test]
fn test_concat_kdf_scenario_device_root() {
    // spec.md §8 scenario 3's fixed device root key and nonce.
    let root = [0x00u8, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F];
    let nonce = b"abcdefghijklmnopqr\0\0";
    let other_info = b"certMacKeyhmacSha256concatKdfSha1";

    let base = kdf::provision_base_key_material(&root, nonce, "certMacKey", "hmacSha256", DigestAlg::Sha1);
    let derived = kdf::concat_kdf(DigestAlg::Sha1, &base, other_info, 32);
    assert_eq!(derived.len(), 32);

    let derived_again = kdf::concat_kdf(DigestAlg::Sha1, &base, other_info, 32);
    assert_eq!(derived, derived_again);
}
