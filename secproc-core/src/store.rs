//! The object store: one in-memory map plus one on-disk directory per
//! object kind, resolved memory-first-then-file. Grounded on the teacher's
//! `InMemoryBackend`/`FileBackend` pair (atomic tmp-then-rename `put`,
//! extension-filtered `list`), reshaped into one store spanning both tiers
//! (spec.md §4.1 has no pluggable single-backend choice — both tiers are
//! always live).

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use secproc_crypto::error::SecError;

use crate::types::{ObjectId, StorageLocation, INVALID_OBJECT_ID};

/// A record type that can be split into one or two on-disk sidecar files.
pub trait Record: Clone {
    const PRIMARY_EXT: &'static str;
    const INFO_EXT: Option<&'static str>;

    fn primary_bytes(&self) -> Vec<u8>;
    fn info_bytes(&self) -> Option<Vec<u8>>;
    fn from_parts(primary: Vec<u8>, info: Option<Vec<u8>>) -> Result<Self, SecError>;
}

pub struct ObjectStore<R: Record> {
    dir: PathBuf,
    memory: HashMap<ObjectId, R>,
}

impl<R: Record> ObjectStore<R> {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SecError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            tracing::error!(error = %e, dir = %dir.display(), "failed to create object store directory");
            SecError::Failure
        })?;
        Ok(Self { dir, memory: HashMap::new() })
    }

    fn primary_path(&self, id: ObjectId) -> PathBuf {
        self.dir.join(format!("{id}.{}", R::PRIMARY_EXT))
    }

    fn info_path(&self, id: ObjectId) -> Option<PathBuf> {
        R::INFO_EXT.map(|ext| self.dir.join(format!("{id}.{ext}")))
    }

    fn file_exists(&self, id: ObjectId) -> bool {
        self.primary_path(id).exists()
    }

    fn read_file(&self, id: ObjectId) -> Result<R, SecError> {
        let primary = fs::read(self.primary_path(id)).map_err(|_| SecError::Failure)?;
        let info = match self.info_path(id) {
            Some(path) => Some(fs::read(path).map_err(|_| SecError::Failure)?),
            None => None,
        };
        R::from_parts(primary, info)
    }

    /// `retrieve(id) -> (record, location)`, memory first then file.
    pub fn retrieve(&self, id: ObjectId) -> Result<(R, StorageLocation), SecError> {
        if let Some(record) = self.memory.get(&id) {
            return Ok((record.clone(), StorageLocation::Ram));
        }
        if self.file_exists(id) {
            return Ok((self.read_file(id)?, StorageLocation::File));
        }
        Err(SecError::NoSuchItem)
    }

    /// `store(id, location, record)`. Purges any existing record for `id`
    /// from both tiers first, then writes to the requested backend.
    pub fn store(&mut self, id: ObjectId, location: StorageLocation, record: R) -> Result<(), SecError> {
        if id == INVALID_OBJECT_ID {
            return Err(SecError::InvalidParameters);
        }
        self.purge_both_tiers(id);

        match location {
            StorageLocation::Ram | StorageLocation::RamSoftWrapped => {
                self.memory.insert(id, record);
                Ok(())
            }
            StorageLocation::File | StorageLocation::FileSoftWrapped => self.write_file_atomic(id, &record),
            StorageLocation::Oem => Err(SecError::UnimplementedFeature),
        }
    }

    fn purge_both_tiers(&mut self, id: ObjectId) {
        self.memory.remove(&id);
        let primary = self.primary_path(id);
        if primary.exists() {
            let _ = fs::remove_file(&primary);
        }
        if let Some(info) = self.info_path(id) {
            if info.exists() {
                let _ = fs::remove_file(&info);
            }
        }
    }

    /// Two sidecar files, written atomically from the caller's viewpoint
    /// (tmp-then-rename each). If the second write fails, best-effort
    /// cleanup removes whatever was already written, then this still
    /// returns `Failure` — spec.md §9's resolved Open Question, generalized
    /// from certificates to every record kind's file-tier `store`.
    fn write_file_atomic(&self, id: ObjectId, record: &R) -> Result<(), SecError> {
        let primary_path = self.primary_path(id);
        if write_atomic(&primary_path, &record.primary_bytes()).is_err() {
            return Err(SecError::Failure);
        }

        if let (Some(info_path), Some(info_bytes)) = (self.info_path(id), record.info_bytes()) {
            if write_atomic(&info_path, &info_bytes).is_err() {
                let _ = fs::remove_file(&primary_path);
                return Err(SecError::Failure);
            }
        }
        Ok(())
    }

    /// `delete(id)`: `NoSuchItem` if neither tier matched; `ItemNonRemovable`
    /// if a match existed but removal failed.
    pub fn delete(&mut self, id: ObjectId) -> Result<(), SecError> {
        let had_memory = self.memory.remove(&id).is_some();
        let had_file = self.file_exists(id);
        if !had_memory && !had_file {
            return Err(SecError::NoSuchItem);
        }

        if had_file {
            let primary = self.primary_path(id);
            if fs::remove_file(&primary).is_err() {
                return Err(SecError::ItemNonRemovable);
            }
            if let Some(info) = self.info_path(id) {
                if info.exists() && fs::remove_file(&info).is_err() {
                    return Err(SecError::ItemNonRemovable);
                }
            }
        }
        Ok(())
    }

    /// Drops every in-memory record, leaving file-backed records intact.
    /// Used by processor release (spec.md §3's lifecycle rule).
    pub fn clear_memory(&mut self) {
        self.memory.clear();
    }

    pub fn list(&self) -> Result<Vec<ObjectId>, SecError> {
        let mut ids: Vec<ObjectId> = self.memory.keys().copied().collect();
        let entries = fs::read_dir(&self.dir).map_err(|_| SecError::Failure)?;
        for entry in entries {
            let entry = entry.map_err(|_| SecError::Failure)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(R::PRIMARY_EXT) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    if let Ok(id) = stem.parse::<ObjectId>() {
                        if !ids.contains(&id) {
                            ids.push(id);
                        }
                    }
                }
            }
        }
        Ok(ids)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)
}

impl Record for crate::types::KeyRecord {
    const PRIMARY_EXT: &'static str = "key";
    const INFO_EXT: Option<&'static str> = Some("keyinfo");

    fn primary_bytes(&self) -> Vec<u8> {
        self.envelope_bytes.clone()
    }

    fn info_bytes(&self) -> Option<Vec<u8>> {
        Some(self.info.to_bytes().to_vec())
    }

    fn from_parts(primary: Vec<u8>, info: Option<Vec<u8>>) -> Result<Self, SecError> {
        let info_bytes = info.ok_or(SecError::Failure)?;
        let info = crate::types::KeyInfo::from_bytes(&info_bytes).ok_or(SecError::Failure)?;
        Ok(Self { info, envelope_bytes: primary })
    }
}

impl Record for crate::types::CertRecord {
    const PRIMARY_EXT: &'static str = "cert";
    const INFO_EXT: Option<&'static str> = Some("certinfo");

    fn primary_bytes(&self) -> Vec<u8> {
        self.cert_bytes.clone()
    }

    fn info_bytes(&self) -> Option<Vec<u8>> {
        Some(self.mac.to_vec())
    }

    fn from_parts(primary: Vec<u8>, info: Option<Vec<u8>>) -> Result<Self, SecError> {
        let info_bytes = info.ok_or(SecError::Failure)?;
        let mac: [u8; 32] = info_bytes.try_into().map_err(|_| SecError::Failure)?;
        Ok(Self { cert_bytes: primary, mac })
    }
}

impl Record for crate::types::BundleRecord {
    const PRIMARY_EXT: &'static str = "bundle";
    const INFO_EXT: Option<&'static str> = None;

    fn primary_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn info_bytes(&self) -> Option<Vec<u8>> {
        None
    }

    fn from_parts(primary: Vec<u8>, _info: Option<Vec<u8>>) -> Result<Self, SecError> {
        Ok(Self { bytes: primary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Dummy(Vec<u8>);

    impl Record for Dummy {
        const PRIMARY_EXT: &'static str = "dummy";
        const INFO_EXT: Option<&'static str> = Some("dummyinfo");

        fn primary_bytes(&self) -> Vec<u8> {
            self.0.clone()
        }
        fn info_bytes(&self) -> Option<Vec<u8>> {
            Some(vec![0xAB])
        }
        fn from_parts(primary: Vec<u8>, _info: Option<Vec<u8>>) -> Result<Self, SecError> {
            Ok(Dummy(primary))
        }
    }

    #[test]
    fn store_then_retrieve_ram() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        store.store(1, StorageLocation::Ram, Dummy(vec![1, 2, 3])).unwrap();
        let (record, loc) = store.retrieve(1).unwrap();
        assert_eq!(record.0, vec![1, 2, 3]);
        assert_eq!(loc, StorageLocation::Ram);
    }

    #[test]
    fn store_then_retrieve_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        store.store(42, StorageLocation::File, Dummy(vec![9, 9])).unwrap();
        let (record, loc) = store.retrieve(42).unwrap();
        assert_eq!(record.0, vec![9, 9]);
        assert_eq!(loc, StorageLocation::File);
    }

    #[test]
    fn delete_then_delete_again_is_no_such_item() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        store.store(42, StorageLocation::File, Dummy(vec![1])).unwrap();
        store.delete(42).unwrap();
        assert_eq!(store.delete(42).unwrap_err(), SecError::NoSuchItem);
    }

    #[test]
    fn store_purges_other_tier_first() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        store.store(7, StorageLocation::Ram, Dummy(vec![1])).unwrap();
        store.store(7, StorageLocation::File, Dummy(vec![2])).unwrap();
        let (record, loc) = store.retrieve(7).unwrap();
        assert_eq!(record.0, vec![2]);
        assert_eq!(loc, StorageLocation::File);
    }

    #[test]
    fn retrieve_missing_is_no_such_item() {
        let dir = tempfile::tempdir().unwrap();
        let store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        assert_eq!(store.retrieve(999).unwrap_err(), SecError::NoSuchItem);
    }

    #[test]
    fn oem_store_is_unimplemented() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        assert_eq!(
            store.store(1, StorageLocation::Oem, Dummy(vec![1])).unwrap_err(),
            SecError::UnimplementedFeature
        );
    }

    #[test]
    fn list_merges_memory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store: ObjectStore<Dummy> = ObjectStore::new(dir.path()).unwrap();
        store.store(1, StorageLocation::Ram, Dummy(vec![1])).unwrap();
        store.store(2, StorageLocation::File, Dummy(vec![2])).unwrap();
        let mut ids = store.list().unwrap();
        ids.sort();
        assert_eq!(ids, vec![1, 2]);
    }
}
