//! Core types: object identifiers, storage locations, key types, and the
//! three record shapes (key, certificate, bundle).

use secproc_crypto::wire::InnerContainerKind;

pub type ObjectId = u64;

/// Reserved "not a valid object" sentinel; provisioning rejects it outright.
pub const INVALID_OBJECT_ID: ObjectId = u64::MAX;

/// Reserved identifiers for the processor's own internal objects. Fixed,
/// low values chosen for this implementation — the source names these by
/// symbol, not by a specific numeric literal.
pub const OBJECTID_CERT_MAC_KEY: ObjectId = 1;
pub const OBJECTID_AES_STORE_KEY: ObjectId = 2;
pub const OBJECTID_MAC_GEN_STORE_KEY: ObjectId = 3;
pub const OBJECTID_BASE_KEY_AES: ObjectId = 4;
pub const OBJECTID_BASE_KEY_MAC: ObjectId = 5;

/// Where an object lives. The two soft-wrapped variants behave identically
/// to their plain counterparts — kept as distinct variants for parity with
/// a hardware backend, per the source's own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageLocation {
    Ram,
    RamSoftWrapped,
    File,
    FileSoftWrapped,
    Oem,
}

impl StorageLocation {
    pub fn is_ram(self) -> bool {
        matches!(self, StorageLocation::Ram | StorageLocation::RamSoftWrapped)
    }

    pub fn is_file(self) -> bool {
        matches!(self, StorageLocation::File | StorageLocation::FileSoftWrapped)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Aes128,
    Aes256,
    Hmac128,
    Hmac160,
    Hmac256,
    Rsa1024Priv,
    Rsa2048Priv,
    Rsa1024Pub,
    Rsa2048Pub,
}

impl KeyType {
    /// Length is a pure function of type; `None` for the RSA variants,
    /// whose length depends on the modulus rather than a fixed byte count.
    pub fn symmetric_len(self) -> Option<usize> {
        match self {
            KeyType::Aes128 => Some(16),
            KeyType::Aes256 => Some(32),
            KeyType::Hmac128 => Some(16),
            KeyType::Hmac160 => Some(20),
            KeyType::Hmac256 => Some(32),
            KeyType::Rsa1024Priv | KeyType::Rsa2048Priv | KeyType::Rsa1024Pub | KeyType::Rsa2048Pub => None,
        }
    }

    pub fn rsa_modulus_bytes(self) -> Option<usize> {
        match self {
            KeyType::Rsa1024Priv | KeyType::Rsa1024Pub => Some(128),
            KeyType::Rsa2048Priv | KeyType::Rsa2048Pub => Some(256),
            _ => None,
        }
    }

    pub(crate) fn tag(self) -> u8 {
        match self {
            KeyType::Aes128 => 0,
            KeyType::Aes256 => 1,
            KeyType::Hmac128 => 2,
            KeyType::Hmac160 => 3,
            KeyType::Hmac256 => 4,
            KeyType::Rsa1024Priv => 5,
            KeyType::Rsa2048Priv => 6,
            KeyType::Rsa1024Pub => 7,
            KeyType::Rsa2048Pub => 8,
        }
    }

    pub(crate) fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            0 => KeyType::Aes128,
            1 => KeyType::Aes256,
            2 => KeyType::Hmac128,
            3 => KeyType::Hmac160,
            4 => KeyType::Hmac256,
            5 => KeyType::Rsa1024Priv,
            6 => KeyType::Rsa2048Priv,
            7 => KeyType::Rsa1024Pub,
            8 => KeyType::Rsa2048Pub,
            _ => return None,
        })
    }
}

/// Every container encoding accepted at provisioning (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyContainerType {
    RawSymmetric,
    RawRsaPrivate,
    RawRsaPublic,
    DerRsaPrivate,
    DerRsaPublic,
    PemRsaPrivate,
    PemRsaPublic,
    PreWrappedStore,
    Derived,
    Unknown(u8),
}

impl KeyContainerType {
    pub fn to_byte(self) -> u8 {
        match self {
            KeyContainerType::RawSymmetric => 0,
            KeyContainerType::RawRsaPrivate => 1,
            KeyContainerType::RawRsaPublic => 2,
            KeyContainerType::DerRsaPrivate => 3,
            KeyContainerType::DerRsaPublic => 4,
            KeyContainerType::PemRsaPrivate => 5,
            KeyContainerType::PemRsaPublic => 6,
            KeyContainerType::PreWrappedStore => 7,
            KeyContainerType::Derived => 8,
            KeyContainerType::Unknown(tag) => tag,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => KeyContainerType::RawSymmetric,
            1 => KeyContainerType::RawRsaPrivate,
            2 => KeyContainerType::RawRsaPublic,
            3 => KeyContainerType::DerRsaPrivate,
            4 => KeyContainerType::DerRsaPublic,
            5 => KeyContainerType::PemRsaPrivate,
            6 => KeyContainerType::PemRsaPublic,
            7 => KeyContainerType::PreWrappedStore,
            8 => KeyContainerType::Derived,
            other => KeyContainerType::Unknown(other),
        }
    }
}

/// The small `info` struct stored alongside a key's envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub key_type: KeyType,
    pub original_container_type: KeyContainerType,
    pub inner_container_kind: InnerContainerKind,
}

impl KeyInfo {
    pub fn to_bytes(self) -> [u8; 3] {
        [
            self.key_type.tag(),
            self.original_container_type.to_byte(),
            match self.inner_container_kind {
                InnerContainerKind::Raw => 0,
                InnerContainerKind::Derived => 1,
            },
        ]
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 3 {
            return None;
        }
        Some(Self {
            key_type: KeyType::from_tag(bytes[0])?,
            original_container_type: KeyContainerType::from_byte(bytes[1]),
            inner_container_kind: match bytes[2] {
                0 => InnerContainerKind::Raw,
                1 => InnerContainerKind::Derived,
                _ => return None,
            },
        })
    }
}

#[derive(Debug, Clone)]
pub struct KeyRecord {
    pub info: KeyInfo,
    pub envelope_bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CertRecord {
    pub cert_bytes: Vec<u8>,
    pub mac: [u8; 32],
}

#[derive(Debug, Clone)]
pub struct BundleRecord {
    pub bytes: Vec<u8>,
}
