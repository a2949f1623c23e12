//! Transactional session over the object store.
//!
//! A session buffers every write and remembers the committed bytes it observed for
//! every key it read. `commit` re-validates those observations inside a single sled
//! transaction and applies the write set only if none of them changed; otherwise the
//! commit fails with [`StorageError::LockConflict`]. Dropping a session discards it.

use crate::error::StorageError;
use crate::model::{ExtendedDataSchema, GeometryInfo, ProductShape};
use crate::snapshot::QueryContext;
use crate::store::persistence::{to_storage_io, SledObjectStore};
use crate::store::{
    decode, encode, entity_key, schema_name_key, versioned_key, versioned_prefix, Entity,
    Versioned,
};
use crate::types::{Oid, Poid, Rid};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::IVec;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

pub struct DatabaseSession<'s> {
    store: &'s SledObjectStore,
    /// key -> committed value at first read (None = absent)
    observed: HashMap<Vec<u8>, Option<IVec>>,
    writes: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl<'s> DatabaseSession<'s> {
    pub(crate) fn new(store: &'s SledObjectStore) -> Self {
        Self {
            store,
            observed: HashMap::new(),
            writes: BTreeMap::new(),
        }
    }

    fn read_raw(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        if let Some(observed) = self.observed.get(key) {
            return Ok(observed.as_ref().map(|v| v.to_vec()));
        }
        let current = self.store.objects().get(key).map_err(to_storage_io)?;
        self.observed.insert(key.to_vec(), current.clone());
        Ok(current.map(|v| v.to_vec()))
    }

    /// Retrieve an entity by oid
    pub fn get<E: Entity>(&mut self, oid: Oid) -> Result<Option<E>, StorageError> {
        match self.read_raw(&entity_key::<E>(oid))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Retrieve an entity by oid or fail with `NotFound`
    pub fn require<E: Entity>(&mut self, oid: Oid) -> Result<E, StorageError> {
        self.get(oid)?.ok_or(StorageError::NotFound { kind: E::KIND, oid })
    }

    /// Whether the entity exists, either committed or written in this session
    pub fn contains<E: Entity>(&mut self, oid: Oid) -> Result<bool, StorageError> {
        Ok(self.read_raw(&entity_key::<E>(oid))?.is_some())
    }

    /// Allocate an oid for a new entity
    pub fn allocate_oid(&self) -> Result<Oid, StorageError> {
        self.store.allocate_oid()
    }

    /// Stage an entity write
    pub fn store<E: Entity>(&mut self, entity: &E) -> Result<(), StorageError> {
        let value = encode(entity)?;
        self.writes.insert(entity_key::<E>(entity.oid()), value);
        Ok(())
    }

    /// Stage a schema write and index it by name
    pub fn store_schema(&mut self, schema: &ExtendedDataSchema) -> Result<(), StorageError> {
        self.store(schema)?;
        self.writes
            .insert(schema_name_key(&schema.name), encode(&schema.oid)?);
        Ok(())
    }

    /// Look up a schema by its well-known name
    pub fn schema_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<ExtendedDataSchema>, StorageError> {
        let Some(bytes) = self.read_raw(&schema_name_key(name))? else {
            return Ok(None);
        };
        let oid: Oid = decode(&bytes)?;
        self.get(oid)
    }

    /// Stage a versioned record at its (project, product, rid) key
    pub fn store_version<V: Versioned>(&mut self, record: &V) -> Result<(), StorageError> {
        let key = versioned_key::<V>(record.project(), record.product_oid(), record.rid());
        self.writes.insert(key, encode(record)?);
        Ok(())
    }

    pub fn store_geometry(&mut self, info: &GeometryInfo) -> Result<(), StorageError> {
        self.store_version(info)
    }

    /// Point-in-time read: for each product, the version with the highest
    /// `rid <= watermark`, unless that version is a tombstone.
    pub fn versions_as_of<V: Versioned>(
        &mut self,
        project: Poid,
        watermark: Rid,
    ) -> Result<Vec<V>, StorageError> {
        let prefix = versioned_prefix::<V>(project);
        let mut raw: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

        for item in self.store.objects().scan_prefix(&prefix) {
            let (key, value) = item.map_err(to_storage_io)?;
            let observed = self
                .observed
                .entry(key.to_vec())
                .or_insert_with(|| Some(value.clone()));
            if let Some(bytes) = observed {
                raw.insert(key.to_vec(), bytes.to_vec());
            }
        }
        for (key, value) in self
            .writes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
        {
            raw.insert(key.clone(), value.clone());
        }

        // Keys ascend by product, then rid: the last accepted version per product wins.
        let mut latest: BTreeMap<Oid, V> = BTreeMap::new();
        for bytes in raw.values() {
            let record: V = decode(bytes)?;
            if record.rid() > watermark {
                continue;
            }
            latest.insert(record.product_oid(), record);
        }
        Ok(latest
            .into_values()
            .filter(|record| !record.is_tombstone())
            .collect())
    }

    /// All GeometryInfo entries visible under the context
    pub fn geometry_as_of(
        &mut self,
        context: &QueryContext,
    ) -> Result<Vec<GeometryInfo>, StorageError> {
        self.versions_as_of(context.project_id(), context.highest_stop_id())
    }

    /// All live product shapes visible under the context
    pub fn shapes_as_of(
        &mut self,
        context: &QueryContext,
    ) -> Result<Vec<ProductShape>, StorageError> {
        self.versions_as_of(context.project_id(), context.highest_stop_id())
    }

    /// Number of staged writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Validate observed state and apply all staged writes atomically
    pub fn commit(self) -> Result<(), StorageError> {
        let DatabaseSession {
            store,
            observed,
            writes,
        } = self;

        let result = store.objects().transaction(|tx| {
            for (key, expected) in &observed {
                let current = tx.get(key.as_slice())?;
                if current != *expected {
                    return Err(ConflictableTransactionError::Abort(
                        String::from_utf8_lossy(key).into_owned(),
                    ));
                }
            }
            for (key, value) in &writes {
                tx.insert(key.as_slice(), value.as_slice())?;
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                debug!(writes = writes.len(), "Session committed");
                store.flush()
            }
            Err(TransactionError::Abort(key)) => Err(StorageError::LockConflict { key }),
            Err(TransactionError::Storage(e)) => Err(to_storage_io(e)),
        }
    }

    /// Discard all staged writes
    pub fn rollback(self) {
        debug!(discarded = self.writes.len(), "Session rolled back");
    }
}
