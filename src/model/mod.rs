//! Persisted Entities
//!
//! Projects own an ordered history of logical revisions. Each revision points at one
//! concrete revision (a physical snapshot) that may be shared by several siblings.
//! Geometry and shape records are versioned per product by the revision id that
//! introduced them.

pub mod bounds;

pub use bounds::{Bounds, Vector3};

use crate::types::{Oid, Poid, Rid, Roid, Uoid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub oid: Poid,
    pub name: String,
    /// Scale factor from the project's length unit to millimetres
    pub length_unit_to_mm: f64,
    /// Logical revisions in check-in order
    pub revisions: Vec<Roid>,
    /// Concrete revisions in creation order
    pub concrete_revisions: Vec<Oid>,
    pub last_revision: Option<Roid>,
}

/// Logical revision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub oid: Roid,
    /// Revision number within the project
    pub id: Rid,
    pub project: Poid,
    pub concrete_revision: Oid,
    pub comment: String,
    pub user: Uoid,
    pub date: DateTime<Utc>,
    pub has_geometry: bool,
    pub nr_primitives: u64,
    pub bounds: Bounds,
    pub bounds_untransformed: Bounds,
    /// Attachments, append-only
    pub extended_data: Vec<Oid>,
}

/// Physical snapshot of object state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteRevision {
    pub oid: Oid,
    /// Number of the revision whose check-in created this snapshot
    pub id: Rid,
    pub project: Poid,
    pub multiplier_to_mm: f64,
    pub bounds: Bounds,
    pub bounds_untransformed: Bounds,
    /// Back-references to every logical revision sharing this snapshot (lookup only)
    pub revisions: BTreeSet<Roid>,
}

/// Derived geometry summary for one product in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub oid: Oid,
    pub ifc_product_oid: Oid,
    pub project: Poid,
    pub rid: Rid,
    pub bounds: Bounds,
    pub bounds_untransformed: Bounds,
    pub primitive_count: u64,
    /// Tombstone: the product was removed in revision `rid`
    pub deleted: bool,
}

/// Local placement applied to raw shape coordinates: scale, then translate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub translation: [f64; 3],
    pub scale: f64,
}

impl Placement {
    pub fn apply(&self, point: Vector3) -> Vector3 {
        Vector3::new(
            point.x * self.scale + self.translation[0],
            point.y * self.scale + self.translation[1],
            point.z * self.scale + self.translation[2],
        )
    }
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            scale: 1.0,
        }
    }
}

/// Shape representation of a spatial product, as checked in
///
/// `vertices` is a triangle soup in untransformed coordinates: every three
/// consecutive vertices form one primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductShape {
    pub oid: Oid,
    pub product_oid: Oid,
    pub project: Poid,
    pub rid: Rid,
    pub name: String,
    pub vertices: Vec<[f64; 3]>,
    pub placement: Placement,
    /// Tombstone: the product was removed in revision `rid`
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedDataSchema {
    pub oid: Oid,
    pub name: String,
    pub content_type: String,
    pub description: String,
}

/// Binary payload stored alongside an attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub oid: Oid,
    pub filename: String,
    pub mime: String,
    pub size: u64,
    pub data: Vec<u8>,
}

/// Attachment on a revision. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedData {
    pub oid: Oid,
    pub title: String,
    pub mime: String,
    pub size: u64,
    pub added: DateTime<Utc>,
    pub file: Oid,
    pub schema: Option<Oid>,
    pub time_to_generate_ms: u64,
    pub user: Uoid,
    pub project: Poid,
    pub revision: Roid,
}
