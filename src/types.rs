//! Identifier types shared across the crate.

/// Identifier of any persisted entity.
pub type Oid = u64;

/// Project identifier.
pub type Poid = Oid;

/// Identifier of a logical revision.
pub type Roid = Oid;

/// Identifier of an acting user.
pub type Uoid = Oid;

/// Per-project revision number. Revisions are numbered from 1 in check-in order;
/// versioned objects carry the number of the revision that introduced them.
pub type Rid = u32;
