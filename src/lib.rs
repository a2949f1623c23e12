//! revgeom: Revision-Consistent Geometry Regeneration
//!
//! Recomputes derived geometry (per-product bounds, primitive counts, generation
//! reports) for a revision of a versioned building-model store. Reads are pinned to
//! the revision's snapshot; results are written back to the snapshot and every
//! revision that shares it, in one atomic store transaction.

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod history;
pub mod logging;
pub mod model;
pub mod progress;
pub mod regeneration;
pub mod report;
pub mod schema;
pub mod snapshot;
pub mod store;
pub mod types;
