//! End-to-end round-trip and tamper tests over the key-store envelope,
//! exercised across the whole crate boundary.

use secproc_crypto::envelope;
use secproc_crypto::error::SecError;
use secproc_crypto::wire::InnerContainerKind;

fn setup() -> ([u8; 16], [u8; 16], [u8; 16]) {
    let k_store = [0x7Au8; 16];
    let k_mac = [0xC3u8; 16];
    let iv = [0x5Eu8; 16];
    (k_store, k_mac, iv)
}

#[test]
fn roundtrip_basic() {
    let (k_store, k_mac, iv) = setup();
    let payload = b"a 16-byte-ish secret";

    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, payload).unwrap();
    let opened = envelope::validate(&sealed, &k_store, &k_mac).unwrap();
    assert_eq!(&opened[..], payload);
}

#[test]
fn roundtrip_empty_payload() {
    let (k_store, k_mac, iv) = setup();
    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"").unwrap();
    let opened = envelope::validate(&sealed, &k_store, &k_mac).unwrap();
    assert_eq!(&opened[..], b"");
}

#[test]
fn roundtrip_large_payload() {
    let (k_store, k_mac, iv) = setup();
    let payload = vec![0xABu8; 65536];
    let sealed = envelope::seal(&k_store, &k_mac, iv, 2, InnerContainerKind::Derived, 9, &payload).unwrap();
    let opened = envelope::validate(&sealed, &k_store, &k_mac).unwrap();
    assert_eq!(&opened[..], payload.as_slice());
}

#[test]
fn wrong_mac_key_fails() {
    let (k_store, k_mac, iv) = setup();
    let wrong_mac = [0x99u8; 16];
    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"data").unwrap();
    assert_eq!(
        envelope::validate(&sealed, &k_store, &wrong_mac).unwrap_err(),
        SecError::VerificationFailed
    );
}

#[test]
fn wrong_store_key_fails() {
    let (k_store, k_mac, iv) = setup();
    let wrong_store = [0x88u8; 16];
    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"0123456789abcdef").unwrap();
    assert!(envelope::validate(&sealed, &wrong_store, &k_mac).is_err());
}

#[test]
fn tamper_ciphertext_fails() {
    let (k_store, k_mac, iv) = setup();
    let mut sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"tamper target").unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0x01;
    assert_eq!(
        envelope::validate(&sealed, &k_store, &k_mac).unwrap_err(),
        SecError::VerificationFailed
    );
}

#[test]
fn tamper_header_fails() {
    let (k_store, k_mac, iv) = setup();
    let mut sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"tamper target").unwrap();
    sealed[8] ^= 0x01; // first header byte, after the 8-byte magic
    assert_eq!(
        envelope::validate(&sealed, &k_store, &k_mac).unwrap_err(),
        SecError::VerificationFailed
    );
}

#[test]
fn truncated_fails() {
    let (k_store, k_mac, iv) = setup();
    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"data").unwrap();
    assert_eq!(
        envelope::validate(&sealed[..10], &k_store, &k_mac).unwrap_err(),
        SecError::InvalidInputSize
    );
    assert_eq!(
        envelope::validate(b"", &k_store, &k_mac).unwrap_err(),
        SecError::InvalidInputSize
    );
}

#[test]
fn all_errors_are_verification_failed_for_mac_mismatches() {
    let (k_store, k_mac, iv) = setup();
    let sealed = envelope::seal(&k_store, &k_mac, iv, 1, InnerContainerKind::Raw, 4, b"data").unwrap();

    let mut tampered_ciphertext = sealed.clone();
    let last = tampered_ciphertext.len() - 1;
    tampered_ciphertext[last] ^= 0x01;

    let mut tampered_header = sealed.clone();
    tampered_header[8] ^= 0x01;

    let err1 = envelope::validate(&tampered_ciphertext, &k_store, &k_mac).unwrap_err();
    let err2 = envelope::validate(&tampered_header, &k_store, &k_mac).unwrap_err();
    let err3 = envelope::validate(&sealed, &k_store, &[0x00u8; 16]).unwrap_err();

    assert_eq!(err1, SecError::VerificationFailed);
    assert_eq!(err2, SecError::VerificationFailed);
    assert_eq!(err3, SecError::VerificationFailed);
}
