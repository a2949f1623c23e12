//! Bounds aggregation.
//!
//! An incremental run only regenerates the target product and its dependents, so the
//! envelope it reports must be merged with the stored geometry of every untouched product.

use crate::geometry::GenerateGeometryResult;
use crate::model::{Bounds, GeometryInfo};
use crate::types::Oid;
use std::collections::HashSet;

/// Fold stored geometry of untouched products into an engine result
///
/// `stored` must be read under the same context the engine ran with. Products listed in
/// `result.objects` are already counted, as is `target`. In whole-model mode
/// (`target == None`) the result already spans the model and is returned as is.
pub fn aggregate_bounds(
    mut result: GenerateGeometryResult,
    stored: &[GeometryInfo],
    target: Option<Oid>,
) -> GenerateGeometryResult {
    let Some(target) = target else {
        return result;
    };
    let regenerated: HashSet<Oid> = result
        .objects
        .iter()
        .map(|object| object.product_oid)
        .chain(std::iter::once(target))
        .collect();
    for info in stored
        .iter()
        .filter(|info| !regenerated.contains(&info.ifc_product_oid))
    {
        result.bounds.expand(&info.bounds);
        result.bounds_untransformed.expand(&info.bounds_untransformed);
        result.nr_primitives += info.primitive_count;
    }
    result
}

/// Union of transformed and untransformed bounds over a set of entries
pub fn union_of<'a, I>(entries: I) -> (Bounds, Bounds)
where
    I: IntoIterator<Item = &'a GeometryInfo>,
{
    entries.into_iter().fold(
        (Bounds::empty(), Bounds::empty()),
        |(bounds, untransformed), info| {
            (
                bounds.union(&info.bounds),
                untransformed.union(&info.bounds_untransformed),
            )
        },
    )
}
