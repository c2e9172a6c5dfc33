//! The `Processor` handle: owns the three object stores, the boot-derived
//! `K_store`/`K_mac` envelope keys and cert-MAC key, and exposes
//! provisioning, retrieval, derivation, and session creation as one
//! top-level API. Grounded on the teacher's `Keystore::new`/
//! `with_threat_config` dual-constructor pattern, generalized from one
//! storage backend to the three parallel stores spec.md §3 names.

use std::path::PathBuf;

use rsa::{RsaPrivateKey, RsaPublicKey};

use secproc_crypto::envelope;
use secproc_crypto::error::SecError;
use secproc_crypto::kdf;
use secproc_crypto::ladder;
use secproc_crypto::primitives::cipher::{CipherDirection, CipherMode};
use secproc_crypto::primitives::digest::DigestAlg;
use secproc_crypto::primitives::mac::MacAlg;
use secproc_crypto::primitives::random::{self, RandomKind};
use secproc_crypto::rsakey;
use secproc_crypto::wire::InnerContainerKind;

use crate::certstore;
use crate::derive::{self, KdfRequest};
use crate::provision::{self, KeyContainerInput, SealingKeys};
use crate::session::{CipherHandle, DigestHandle, MacHandle, SignatureSession};
use crate::store::ObjectStore;
use crate::types::{
    BundleRecord, CertRecord, KeyRecord, KeyType, ObjectId, StorageLocation, INVALID_OBJECT_ID,
    OBJECTID_AES_STORE_KEY, OBJECTID_BASE_KEY_AES, OBJECTID_BASE_KEY_MAC, OBJECTID_CERT_MAC_KEY,
    OBJECTID_MAC_GEN_STORE_KEY,
};

/// Hard-coded device id, used only when the caller supplies none at
/// construction (spec.md §8 scenario 1, §9's injectable-with-fallback note).
pub const DEFAULT_DEVICE_ID: [u8; 16] =
    [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0, 0, 0, 0, 0, 0, 0, 0];

/// Hard-coded device root key fallback. Matches spec.md §8 scenario 3's
/// literal test vector, so the fixed default doubles as a known-answer
/// root for the derivation engine's own documented scenario.
pub const DEFAULT_ROOT_KEY: [u8; 16] =
    [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F];

type UnknownContainerHook = dyn Fn(u8, &[u8]) -> Result<KeyRecord, SecError>;

/// Construction parameters. Absent directories fall back to per-platform
/// defaults under the system temp directory; absent device id/root key
/// fall back to [`DEFAULT_DEVICE_ID`]/[`DEFAULT_ROOT_KEY`].
#[derive(Default)]
pub struct ProcessorConfig {
    pub key_dir: Option<PathBuf>,
    pub cert_dir: Option<PathBuf>,
    pub bundle_dir: Option<PathBuf>,
    pub device_id: Option<[u8; 16]>,
    pub root_key: Option<[u8; 16]>,
    pub unknown_container_hook: Option<Box<UnknownContainerHook>>,
}

fn default_dir(leaf: &str) -> PathBuf {
    std::env::temp_dir().join("secproc").join(leaf)
}

fn fresh_iv() -> Result<[u8; 16], SecError> {
    let bytes = random::generate(RandomKind::True, 16, None)?;
    bytes.try_into().map_err(|_| SecError::Failure)
}

pub struct Processor {
    keys: ObjectStore<KeyRecord>,
    certs: ObjectStore<CertRecord>,
    bundles: ObjectStore<BundleRecord>,
    device_id: [u8; 16],
    root_key: [u8; 16],
    k_store: [u8; 16],
    k_mac: [u8; 16],
    cert_mac_key: Vec<u8>,
    unknown_container_hook: Option<Box<UnknownContainerHook>>,
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Result<Self, SecError> {
        let keys = ObjectStore::new(config.key_dir.unwrap_or_else(|| default_dir("keys")))?;
        let certs = ObjectStore::new(config.cert_dir.unwrap_or_else(|| default_dir("certs")))?;
        let bundles = ObjectStore::new(config.bundle_dir.unwrap_or_else(|| default_dir("bundles")))?;

        let device_id = config.device_id.unwrap_or(DEFAULT_DEVICE_ID);
        let root_key = config.root_key.unwrap_or(DEFAULT_ROOT_KEY);

        // The two soft-wrapped internal ladder keys are themselves derived
        // placeholders referring to the device root key (spec.md §4.2).
        // They seal every other envelope, so they cannot be wrapped in one
        // themselves — the processor holds their clear bytes directly
        // rather than storing them through the object store.
        let k_store = ladder::expand(&root_key, kdf::vendor_aes128(b"AES_STORE_KEY"));
        let k_mac = ladder::expand(&root_key, kdf::vendor_aes128(b"MAC_GEN_STORE_KEY"));

        let mut processor = Self {
            keys,
            certs,
            bundles,
            device_id,
            root_key,
            k_store,
            k_mac,
            cert_mac_key: Vec::new(),
            unknown_container_hook: config.unknown_container_hook,
        };
        processor.boot_provision_cert_mac_key()?;
        Ok(processor)
    }

    /// The cert-MAC key is a Concat-KDF output seeded at boot (spec.md
    /// §4.4/§4.6), using spec.md §8 scenario 3's literal nonce/derivation
    /// tags so the boot derivation and the documented test vector agree.
    fn boot_provision_cert_mac_key(&mut self) -> Result<(), SecError> {
        let sealing_keys = self.sealing_keys(fresh_iv()?);
        let (base_aes, base_mac, record) = derive::derive(
            &sealing_keys,
            &self.root_key,
            b"abcdefghijklmnopqr\0\0",
            "certMacKey",
            "hmacSha256",
            KdfRequest::ConcatKdf {
                digest_alg: DigestAlg::Sha1,
                other_info: b"certMacKeyhmacSha256concatKdfSha1",
                output_key_type: KeyType::Hmac256,
            },
        )?;
        let clear = envelope::validate(&record.envelope_bytes, &self.k_store, &self.k_mac)?;
        self.cert_mac_key = clear.to_vec();
        self.keys.store(OBJECTID_BASE_KEY_AES, StorageLocation::RamSoftWrapped, base_aes)?;
        self.keys.store(OBJECTID_BASE_KEY_MAC, StorageLocation::RamSoftWrapped, base_mac)?;
        self.keys.store(OBJECTID_CERT_MAC_KEY, StorageLocation::RamSoftWrapped, record)?;
        self.keys.store(
            OBJECTID_AES_STORE_KEY,
            StorageLocation::RamSoftWrapped,
            Self::placeholder_soft_wrapped_record(),
        )?;
        self.keys.store(
            OBJECTID_MAC_GEN_STORE_KEY,
            StorageLocation::RamSoftWrapped,
            Self::placeholder_soft_wrapped_record(),
        )?;
        Ok(())
    }

    /// `K_store`/`K_mac` are held directly by the processor (see
    /// `new`'s comment); these reserved identifiers exist only so a
    /// caller enumerating `list_keys()` sees the same reserved slots a
    /// hardware backend would expose. The placeholder carries no
    /// recoverable key material.
    fn placeholder_soft_wrapped_record() -> KeyRecord {
        KeyRecord {
            info: crate::types::KeyInfo {
                key_type: KeyType::Aes128,
                original_container_type: crate::types::KeyContainerType::Derived,
                inner_container_kind: InnerContainerKind::Derived,
            },
            envelope_bytes: Vec::new(),
        }
    }

    fn sealing_keys(&self, iv: [u8; 16]) -> SealingKeys<'_> {
        SealingKeys { k_store: &self.k_store, k_mac: &self.k_mac, iv }
    }

    pub fn device_id(&self) -> [u8; 16] {
        self.device_id
    }

    // -----------------------------------------------------------------
    // Keys
    // -----------------------------------------------------------------

    pub fn provision_key(
        &mut self,
        id: ObjectId,
        location: StorageLocation,
        input: KeyContainerInput<'_>,
    ) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        if self.keys.retrieve(id).is_ok() {
            return Err(SecError::ItemAlreadyProvisioned);
        }
        let keys = self.sealing_keys(fresh_iv()?);
        let record = provision::provision(&keys, input)?;
        self.keys.store(id, location, record)
    }

    /// Invokes the application-registered hook for an unrecognized
    /// container type tag; `UNIMPLEMENTED_FEATURE` if none was registered
    /// (spec.md §4.3's "Unknown" case).
    pub fn provision_unknown(
        &mut self,
        id: ObjectId,
        location: StorageLocation,
        container_type_tag: u8,
        bytes: &[u8],
    ) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        if self.keys.retrieve(id).is_ok() {
            return Err(SecError::ItemAlreadyProvisioned);
        }
        let hook = self.unknown_container_hook.as_ref().ok_or(SecError::UnimplementedFeature)?;
        let record = hook(container_type_tag, bytes)?;
        self.keys.store(id, location, record)
    }

    pub fn retrieve_key(&self, id: ObjectId) -> Result<(KeyRecord, StorageLocation), SecError> {
        self.keys.retrieve(id)
    }

    pub fn delete_key(&mut self, id: ObjectId) -> Result<(), SecError> {
        self.keys.delete(id)
    }

    pub fn list_keys(&self) -> Result<Vec<ObjectId>, SecError> {
        self.keys.list()
    }

    // -----------------------------------------------------------------
    // Certificates
    // -----------------------------------------------------------------

    pub fn provision_certificate(
        &mut self,
        id: ObjectId,
        location: StorageLocation,
        pem_or_der: &[u8],
    ) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        if self.certs.retrieve(id).is_ok() {
            return Err(SecError::ItemAlreadyProvisioned);
        }
        let record = certstore::provision_certificate(&self.cert_mac_key, pem_or_der)?;
        self.certs.store(id, location, record)
    }

    /// Retrieve and MAC-verify in one call, matching spec.md §8 scenario 4
    /// ("the next `GetInstance(id)` fails with `VERIFICATION_FAILED`").
    pub fn retrieve_certificate(&self, id: ObjectId) -> Result<(CertRecord, StorageLocation), SecError> {
        let (record, location) = self.certs.retrieve(id)?;
        certstore::verify_certificate(&self.cert_mac_key, &record)?;
        Ok((record, location))
    }

    pub fn delete_certificate(&mut self, id: ObjectId) -> Result<(), SecError> {
        self.certs.delete(id)
    }

    pub fn list_certificates(&self) -> Result<Vec<ObjectId>, SecError> {
        self.certs.list()
    }

    pub fn extract_certificate_public_key(&self, id: ObjectId) -> Result<RsaPublicKey, SecError> {
        let (record, _) = self.retrieve_certificate(id)?;
        let raw = certstore::extract_public_key(&record)?;
        rsakey::raw_public_to_key(&raw)
    }

    pub fn verify_certificate_signature(&self, id: ObjectId, issuer_public_key: &RsaPublicKey) -> Result<(), SecError> {
        let (record, _) = self.retrieve_certificate(id)?;
        certstore::verify_signature(&record, issuer_public_key)
    }

    // -----------------------------------------------------------------
    // Bundles
    // -----------------------------------------------------------------

    pub fn provision_bundle(&mut self, id: ObjectId, location: StorageLocation, bytes: &[u8]) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        if self.bundles.retrieve(id).is_ok() {
            return Err(SecError::ItemAlreadyProvisioned);
        }
        self.bundles.store(id, location, BundleRecord { bytes: bytes.to_vec() })
    }

    pub fn retrieve_bundle(&self, id: ObjectId) -> Result<(BundleRecord, StorageLocation), SecError> {
        self.bundles.retrieve(id)
    }

    pub fn delete_bundle(&mut self, id: ObjectId) -> Result<(), SecError> {
        self.bundles.delete(id)
    }

    pub fn list_bundles(&self) -> Result<Vec<ObjectId>, SecError> {
        self.bundles.list()
    }

    // -----------------------------------------------------------------
    // Derivation engine
    // -----------------------------------------------------------------

    /// Runs `_ProvisionBaseKey(nonce)` and the requested KDF, storing the
    /// two intermediate base keys at the reserved RAM-soft-wrapped
    /// identifiers and the final derived key at `id` (spec.md §4.6 step 3).
    pub fn derive_key(
        &mut self,
        id: ObjectId,
        location: StorageLocation,
        nonce: &[u8],
        derivation_string: &str,
        cipher_string: &str,
        request: KdfRequest<'_>,
    ) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        if self.keys.retrieve(id).is_ok() {
            return Err(SecError::ItemAlreadyProvisioned);
        }
        let keys = self.sealing_keys(fresh_iv()?);
        let (base_aes, base_mac, derived) =
            derive::derive(&keys, &self.root_key, nonce, derivation_string, cipher_string, request)?;
        self.keys.store(OBJECTID_BASE_KEY_AES, StorageLocation::RamSoftWrapped, base_aes)?;
        self.keys.store(OBJECTID_BASE_KEY_MAC, StorageLocation::RamSoftWrapped, base_mac)?;
        self.keys.store(id, location, derived)
    }

    // -----------------------------------------------------------------
    // Cryptographic sessions
    // -----------------------------------------------------------------

    pub fn cipher_session(
        &self,
        key_id: ObjectId,
        iv: [u8; 16],
        mode: CipherMode,
        direction: CipherDirection,
    ) -> Result<CipherHandle, SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        CipherHandle::get_instance(&record, &self.k_store, &self.k_mac, iv, mode, direction)
    }

    pub fn digest_session(&self, alg: DigestAlg) -> DigestHandle {
        DigestHandle::get_instance(alg)
    }

    /// Feeds a stored key's unwrapped clear bytes into an already-open
    /// digest session (spec.md §4.5's key-handle-as-digest-input case).
    pub fn digest_update_with_key(&self, handle: &DigestHandle, key_id: ObjectId) -> Result<(), SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        handle.update_with_key(&record, &self.k_store, &self.k_mac)
    }

    pub fn mac_session(&self, alg: MacAlg, key_id: ObjectId) -> Result<MacHandle, SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        MacHandle::get_instance(alg, &record, &self.k_store, &self.k_mac)
    }

    pub fn mac_update_with_key(&self, handle: &MacHandle, key_id: ObjectId) -> Result<(), SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        handle.update_with_key(&record, &self.k_store, &self.k_mac)
    }

    pub fn signature_session(&self, flavor: crate::session::SignatureFlavor, alg: DigestAlg) -> SignatureSession {
        SignatureSession::get_instance(flavor, alg)
    }

    /// Reconstitutes the stored RSA private key at `key_id` for signing.
    pub fn private_key_for(&self, key_id: ObjectId) -> Result<RsaPrivateKey, SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        if record.info.inner_container_kind != InnerContainerKind::Raw {
            return Err(SecError::InvalidParameters);
        }
        let clear = envelope::validate(&record.envelope_bytes, &self.k_store, &self.k_mac)?;
        let raw = provision::decode_raw_rsa_private(&clear)?;
        rsakey::raw_private_to_key(&raw)
    }

    /// Reconstitutes the stored RSA public key at `key_id` for verification.
    pub fn public_key_for(&self, key_id: ObjectId) -> Result<RsaPublicKey, SecError> {
        let (record, _) = self.keys.retrieve(key_id)?;
        if record.info.inner_container_kind != InnerContainerKind::Raw {
            return Err(SecError::InvalidParameters);
        }
        let clear = envelope::validate(&record.envelope_bytes, &self.k_store, &self.k_mac)?;
        let raw = provision::decode_raw_rsa_public(&clear)?;
        rsakey::raw_public_to_key(&raw)
    }

    // -----------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------

    /// Deletes every in-memory record, leaving file-backed records intact
    /// (spec.md §3's "Lifecycles" section).
    pub fn release(&mut self) {
        self.keys.clear_memory();
        self.certs.clear_memory();
        self.bundles.clear_memory();
    }
}
