//! Revision History
//!
//! Creates projects and checks in new revisions. A check-in with shape changes
//! creates a new concrete revision (snapshot); an empty check-in creates a sibling
//! revision that shares the previous snapshot and inherits its derived geometry state.

use crate::error::RegenError;
use crate::model::{Bounds, ConcreteRevision, GeometryInfo, Placement, ProductShape, Project, Revision};
use crate::store::DatabaseSession;
use crate::types::{Oid, Poid, Rid, Uoid};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// One product-level change in a check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ShapeChange {
    Upsert {
        product_oid: Oid,
        name: String,
        vertices: Vec<[f64; 3]>,
        #[serde(default)]
        placement: Placement,
    },
    Remove {
        product_oid: Oid,
    },
}

impl ShapeChange {
    pub fn product_oid(&self) -> Oid {
        match self {
            ShapeChange::Upsert { product_oid, .. } | ShapeChange::Remove { product_oid } => {
                *product_oid
            }
        }
    }
}

/// Create an empty project
pub fn create_project(
    session: &mut DatabaseSession<'_>,
    name: &str,
    length_unit_to_mm: f64,
) -> Result<Project, RegenError> {
    if !length_unit_to_mm.is_finite() || length_unit_to_mm <= 0.0 {
        return Err(RegenError::Precondition(format!(
            "length unit scale must be positive, got {}",
            length_unit_to_mm
        )));
    }
    let project = Project {
        oid: session.allocate_oid()?,
        name: name.to_string(),
        length_unit_to_mm,
        revisions: Vec::new(),
        concrete_revisions: Vec::new(),
        last_revision: None,
    };
    session.store(&project)?;
    info!(poid = project.oid, name, "Project created");
    Ok(project)
}

/// Check in a new revision of a project
pub fn checkin(
    session: &mut DatabaseSession<'_>,
    poid: Poid,
    comment: &str,
    user: Uoid,
    changes: Vec<ShapeChange>,
) -> Result<Revision, RegenError> {
    let mut project: Project = session.require(poid)?;
    let previous = match project.last_revision {
        Some(roid) => Some(session.require::<Revision>(roid)?),
        None => None,
    };
    let rid = previous.as_ref().map_or(1, |revision| revision.id + 1);
    let roid = session.allocate_oid()?;

    let revision = if changes.is_empty() {
        let previous = previous.ok_or_else(|| {
            RegenError::Precondition(format!(
                "project {} has no revision to share a snapshot with",
                poid
            ))
        })?;
        let mut concrete: ConcreteRevision = session.require(previous.concrete_revision)?;
        concrete.revisions.insert(roid);
        session.store(&concrete)?;

        Revision {
            oid: roid,
            id: rid,
            project: poid,
            concrete_revision: concrete.oid,
            comment: comment.to_string(),
            user,
            date: Utc::now(),
            has_geometry: previous.has_geometry,
            nr_primitives: previous.nr_primitives,
            bounds: previous.bounds,
            bounds_untransformed: previous.bounds_untransformed,
            extended_data: Vec::new(),
        }
    } else {
        let concrete = ConcreteRevision {
            oid: session.allocate_oid()?,
            id: rid,
            project: poid,
            multiplier_to_mm: project.length_unit_to_mm,
            bounds: Bounds::empty(),
            bounds_untransformed: Bounds::empty(),
            revisions: BTreeSet::from([roid]),
        };
        for change in changes {
            apply_change(session, poid, rid, change)?;
        }
        session.store(&concrete)?;
        project.concrete_revisions.push(concrete.oid);

        Revision {
            oid: roid,
            id: rid,
            project: poid,
            concrete_revision: concrete.oid,
            comment: comment.to_string(),
            user,
            date: Utc::now(),
            has_geometry: false,
            nr_primitives: 0,
            bounds: Bounds::empty(),
            bounds_untransformed: Bounds::empty(),
            extended_data: Vec::new(),
        }
    };

    project.revisions.push(roid);
    project.last_revision = Some(roid);
    session.store(&project)?;
    session.store(&revision)?;
    info!(
        poid,
        roid,
        rid,
        concrete_revision = revision.concrete_revision,
        "Revision checked in"
    );
    Ok(revision)
}

fn apply_change(
    session: &mut DatabaseSession<'_>,
    poid: Poid,
    rid: Rid,
    change: ShapeChange,
) -> Result<(), RegenError> {
    let shape_oid = session.allocate_oid()?;
    match change {
        ShapeChange::Upsert {
            product_oid,
            name,
            vertices,
            placement,
        } => session.store_version(&ProductShape {
            oid: shape_oid,
            product_oid,
            project: poid,
            rid,
            name,
            vertices,
            placement,
            deleted: false,
        })?,
        ShapeChange::Remove { product_oid } => {
            session.store_version(&ProductShape {
                oid: shape_oid,
                product_oid,
                project: poid,
                rid,
                name: String::new(),
                vertices: Vec::new(),
                placement: Placement::default(),
                deleted: true,
            })?;
            // Derived geometry of a removed product must stop contributing to bounds
            let geometry_oid = session.allocate_oid()?;
            session.store_version(&GeometryInfo {
                oid: geometry_oid,
                ifc_product_oid: product_oid,
                project: poid,
                rid,
                bounds: Bounds::empty(),
                bounds_untransformed: Bounds::empty(),
                primitive_count: 0,
                deleted: true,
            })?;
        }
    }
    Ok(())
}

/// Model file accepted by `import`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub name: String,
    #[serde(default = "default_length_unit")]
    pub length_unit_to_mm: f64,
    pub products: Vec<ModelProduct>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelProduct {
    pub name: String,
    pub vertices: Vec<[f64; 3]>,
    #[serde(default)]
    pub placement: Placement,
}

fn default_length_unit() -> f64 {
    1.0
}

/// Create a project from a model file and check in its first revision
pub fn import_model(
    session: &mut DatabaseSession<'_>,
    model: ModelFile,
    user: Uoid,
) -> Result<(Project, Revision), RegenError> {
    if model.products.is_empty() {
        return Err(RegenError::Precondition(format!(
            "model '{}' has no products",
            model.name
        )));
    }
    let project = create_project(session, &model.name, model.length_unit_to_mm)?;
    let mut changes = Vec::with_capacity(model.products.len());
    for product in model.products {
        let product_oid = session.allocate_oid()?;
        changes.push(ShapeChange::Upsert {
            product_oid,
            name: product.name,
            vertices: product.vertices,
            placement: product.placement,
        });
    }
    let revision = checkin(session, project.oid, "initial import", user, changes)?;
    let project = session.require(project.oid)?;
    Ok((project, revision))
}
