//! Persistence layer for the object store

use crate::error::StorageError;
use crate::store::session::DatabaseSession;
use crate::store::{decode, entity_key, Entity};
use crate::types::Oid;
use sled;
use std::path::Path;

const TREE_OBJECTS: &str = "objects";

/// Sled-backed object store
///
/// Reads and writes go through a [`DatabaseSession`]; the store itself only hands out
/// sessions, oids and committed (read-only) lookups.
#[derive(Clone)]
pub struct SledObjectStore {
    db: sled::Db,
    objects: sled::Tree,
}

impl SledObjectStore {
    /// Open (or create) a store at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    /// Wrap an already opened database (shared with the job store)
    pub fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let objects = db.open_tree(TREE_OBJECTS).map_err(to_storage_io)?;
        Ok(Self { db, objects })
    }

    /// Get the underlying sled database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    pub(crate) fn objects(&self) -> &sled::Tree {
        &self.objects
    }

    /// Start a transactional session
    pub fn session(&self) -> DatabaseSession<'_> {
        DatabaseSession::new(self)
    }

    /// Allocate a fresh oid. Oids are monotonic and never reused, even when the
    /// session that requested one is discarded.
    pub fn allocate_oid(&self) -> Result<Oid, StorageError> {
        // generate_id starts at 0; keep 0 free as the "no object" value
        self.db
            .generate_id()
            .map(|id| id + 1)
            .map_err(to_storage_io)
    }

    /// Read the committed state of an entity outside any session
    pub fn load<E: Entity>(&self, oid: Oid) -> Result<Option<E>, StorageError> {
        match self
            .objects
            .get(entity_key::<E>(oid))
            .map_err(to_storage_io)?
        {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

pub(crate) fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(std::io::Error::new(
        std::io::ErrorKind::Other,
        err.to_string(),
    ))
}
