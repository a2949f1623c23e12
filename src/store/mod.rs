//! Object Store
//!
//! Typed access to the persisted entities. All entities live in one sled tree under
//! kind-prefixed keys; versioned records additionally carry the project, product and
//! revision number in the key so that point-in-time reads are ordered prefix scans.

pub mod persistence;
pub mod session;

pub use persistence::SledObjectStore;
pub use session::DatabaseSession;

use crate::model::{
    ConcreteRevision, ExtendedData, ExtendedDataSchema, FileRecord, GeometryInfo, ProductShape,
    Project, Revision,
};
use crate::types::{Oid, Poid, Rid};
use serde::de::DeserializeOwned;
use serde::Serialize;

const SCHEMA_NAME_PREFIX: &str = "schema_name";

/// A persisted entity addressed by its oid
pub trait Entity: Serialize + DeserializeOwned {
    /// Key prefix and display name
    const KIND: &'static str;

    fn oid(&self) -> Oid;
}

/// A per-product record versioned by revision number
pub trait Versioned: Serialize + DeserializeOwned {
    const KIND: &'static str;

    fn project(&self) -> Poid;
    fn product_oid(&self) -> Oid;
    fn rid(&self) -> Rid;

    /// Tombstoned versions hide the product from later reads
    fn is_tombstone(&self) -> bool {
        false
    }
}

macro_rules! entity {
    ($ty:ty, $kind:literal) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;

            fn oid(&self) -> Oid {
                self.oid
            }
        }
    };
}

entity!(Project, "project");
entity!(Revision, "revision");
entity!(ConcreteRevision, "concrete_revision");
entity!(ExtendedData, "extended_data");
entity!(ExtendedDataSchema, "schema");
entity!(FileRecord, "file");

impl Versioned for GeometryInfo {
    const KIND: &'static str = "geometry_info";

    fn project(&self) -> Poid {
        self.project
    }

    fn product_oid(&self) -> Oid {
        self.ifc_product_oid
    }

    fn rid(&self) -> Rid {
        self.rid
    }

    fn is_tombstone(&self) -> bool {
        self.deleted
    }
}

impl Versioned for ProductShape {
    const KIND: &'static str = "product_shape";

    fn project(&self) -> Poid {
        self.project
    }

    fn product_oid(&self) -> Oid {
        self.product_oid
    }

    fn rid(&self) -> Rid {
        self.rid
    }

    fn is_tombstone(&self) -> bool {
        self.deleted
    }
}

pub(crate) fn entity_key<E: Entity>(oid: Oid) -> Vec<u8> {
    format!("{}/{:020}", E::KIND, oid).into_bytes()
}

pub(crate) fn versioned_key<V: Versioned>(project: Poid, product: Oid, rid: Rid) -> Vec<u8> {
    format!("{}/{:020}/{:020}/{:010}", V::KIND, project, product, rid).into_bytes()
}

pub(crate) fn versioned_prefix<V: Versioned>(project: Poid) -> Vec<u8> {
    format!("{}/{:020}/", V::KIND, project).into_bytes()
}

pub(crate) fn schema_name_key(name: &str) -> Vec<u8> {
    format!("{}/{}", SCHEMA_NAME_PREFIX, name).into_bytes()
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, crate::error::StorageError> {
    bincode::serialize(value)
        .map_err(|e| crate::error::StorageError::Serialization(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, crate::error::StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| crate::error::StorageError::Serialization(e.to_string()))
}
