//! Aggregated bounds must not depend on the order products are visited in.

use proptest::prelude::*;
use revgeom::geometry::GenerateGeometryResult;
use revgeom::model::{Bounds, GeometryInfo, Vector3};
use revgeom::regeneration::{aggregate_bounds, union_of};

fn boxes() -> impl Strategy<Value = Vec<([i32; 3], [u16; 3])>> {
    prop::collection::vec((any::<[i32; 3]>(), any::<[u16; 3]>()), 1..24)
}

fn to_infos(raw: &[([i32; 3], [u16; 3])]) -> Vec<GeometryInfo> {
    raw.iter()
        .enumerate()
        .map(|(i, (origin, extent))| {
            let min = Vector3::new(origin[0] as f64, origin[1] as f64, origin[2] as f64);
            let max = Vector3::new(
                min.x + extent[0] as f64,
                min.y + extent[1] as f64,
                min.z + extent[2] as f64,
            );
            GeometryInfo {
                oid: 1000 + i as u64,
                ifc_product_oid: 1 + i as u64,
                project: 1,
                rid: 1,
                bounds: Bounds::new(min, max),
                bounds_untransformed: Bounds::new(Vector3::new(0.0, 0.0, 0.0), max),
                primitive_count: 1 + i as u64,
                deleted: false,
            }
        })
        .collect()
}

/// Union of bounding boxes is independent of visiting order
#[test]
fn test_union_order_independence_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&boxes(), |raw| {
            let infos = to_infos(&raw);
            let forward = union_of(infos.iter());
            let backward = union_of(infos.iter().rev());
            prop_assert_eq!(forward, backward);

            for info in &infos {
                prop_assert_eq!(forward.0.union(&info.bounds), forward.0);
            }
            Ok(())
        })
        .unwrap();
}

/// Regenerating one product and merging the rest equals the whole-model union
#[test]
fn test_incremental_matches_whole_model_property() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&(boxes(), any::<prop::sample::Index>()), |(raw, pick)| {
            let infos = to_infos(&raw);
            let target = &infos[pick.index(infos.len())];
            let result = GenerateGeometryResult {
                multiplier_to_mm: 1.0,
                bounds: target.bounds,
                bounds_untransformed: target.bounds_untransformed,
                nr_primitives: target.primitive_count,
                objects: Vec::new(),
            };

            let merged = aggregate_bounds(result, &infos, Some(target.ifc_product_oid));
            let (bounds, untransformed) = union_of(infos.iter());
            prop_assert_eq!(merged.bounds, bounds);
            prop_assert_eq!(merged.bounds_untransformed, untransformed);
            prop_assert_eq!(
                merged.nr_primitives,
                infos.iter().map(|i| i.primitive_count).sum::<u64>()
            );
            Ok(())
        })
        .unwrap();
}
