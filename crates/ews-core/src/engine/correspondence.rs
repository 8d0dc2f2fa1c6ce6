use nalgebra::Point3;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Error, PartialEq)]
pub enum CorrespondenceError {
    #[error("Surface mesh has no vertices")]
    EmptySurface,
    #[error(
        "Surface vertex {surface_index} at ({}, {}, {}) has no exact counterpart in the volumetric mesh ({unmatched} unmatched in total)",
        .position.x, .position.y, .position.z
    )]
    UnmatchedVertex {
        surface_index: usize,
        position: Point3<f64>,
        unmatched: usize,
    },
}

/// Position of each surface vertex in the volumetric vertex list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrespondenceMap {
    indices: Vec<usize>,
}

impl CorrespondenceMap {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Volumetric index of every surface vertex, in surface order.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn get(&self, surface_index: usize) -> Option<usize> {
        self.indices.get(surface_index).copied()
    }

    /// Smallest per-frame vertex count the map can be applied to.
    pub fn required_len(&self) -> usize {
        self.indices.iter().max().map_or(0, |&max| max + 1)
    }

    /// Reorders per-volumetric-vertex values into surface order.
    ///
    /// Returns `None` when `values` is too short for the map.
    pub fn apply<T: Copy>(&self, values: &[T]) -> Option<Vec<T>> {
        self.indices.iter().map(|&i| values.get(i).copied()).collect()
    }
}

type CoordinateKey = [u64; 3];

/// Exact coordinate identity. `-0.0` and `0.0` are the same key; NaN has none.
fn coordinate_key(p: &Point3<f64>) -> Option<CoordinateKey> {
    let bits = |v: f64| -> Option<u64> {
        if v.is_nan() {
            None
        } else if v == 0.0 {
            Some(0.0f64.to_bits())
        } else {
            Some(v.to_bits())
        }
    };
    Some([bits(p.x)?, bits(p.y)?, bits(p.z)?])
}

/// Maps every surface vertex onto the volumetric vertex with the identical coordinates.
///
/// Both meshes come from the same geometry, so the surface is an exact subset of the volumetric
/// vertices; the match is by value, never by tolerance. When the volumetric mesh repeats a
/// coordinate, the lowest index is used. A single unmatched surface vertex fails the whole map.
pub fn build_correspondence(
    volumetric: &[Point3<f64>],
    surface: &[Point3<f64>],
) -> Result<CorrespondenceMap, CorrespondenceError> {
    if surface.is_empty() {
        return Err(CorrespondenceError::EmptySurface);
    }

    let mut index: HashMap<CoordinateKey, usize> = HashMap::with_capacity(volumetric.len());
    let mut duplicates = 0usize;
    for (i, p) in volumetric.iter().enumerate() {
        let Some(key) = coordinate_key(p) else {
            continue;
        };
        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(i);
            }
            Entry::Occupied(_) => duplicates += 1,
        }
    }
    if duplicates > 0 {
        debug!(
            "Volumetric mesh repeats {} vertex positions; using the lowest index for each",
            duplicates
        );
    }

    let lookup = |p: &Point3<f64>| coordinate_key(p).and_then(|key| index.get(&key).copied());

    #[cfg(feature = "parallel")]
    let matched: Vec<Option<usize>> = surface.par_iter().map(lookup).collect();
    #[cfg(not(feature = "parallel"))]
    let matched: Vec<Option<usize>> = surface.iter().map(lookup).collect();

    let unmatched = matched.iter().filter(|m| m.is_none()).count();
    if let Some(surface_index) = matched.iter().position(Option::is_none) {
        return Err(CorrespondenceError::UnmatchedVertex {
            surface_index,
            position: surface[surface_index],
            unmatched,
        });
    }

    Ok(CorrespondenceMap {
        indices: matched.into_iter().flatten().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn volumetric_cloud() -> Vec<Point3<f64>> {
        (0..1000)
            .map(|i| {
                let i = i as f64;
                Point3::new(i / 3.0, i.sqrt(), i * i / 7.0)
            })
            .collect()
    }

    fn surface_subset(volumetric: &[Point3<f64>]) -> (Vec<usize>, Vec<Point3<f64>>) {
        let picked: Vec<usize> = (0..200).map(|i| (i * 7919) % 1000).collect();
        let surface = picked.iter().map(|&i| volumetric[i]).collect();
        (picked, surface)
    }

    #[test]
    fn exact_subset_maps_to_distinct_in_range_indices() {
        let volumetric = volumetric_cloud();
        let (picked, surface) = surface_subset(&volumetric);

        let map = build_correspondence(&volumetric, &surface).unwrap();
        assert_eq!(map.len(), 200);
        assert_eq!(map.indices(), picked.as_slice());
        assert!(map.indices().iter().all(|&i| i < 1000));
        let distinct: HashSet<_> = map.indices().iter().collect();
        assert_eq!(distinct.len(), 200);
        assert!(map.required_len() <= 1000);
    }

    #[test]
    fn mapped_positions_round_trip() {
        let volumetric = volumetric_cloud();
        let (_, surface) = surface_subset(&volumetric);
        let map = build_correspondence(&volumetric, &surface).unwrap();

        for (i, p) in surface.iter().enumerate() {
            assert_eq!(volumetric[map.get(i).unwrap()], *p);
        }
        assert_eq!(map.apply(&volumetric).unwrap(), surface);
    }

    #[test]
    fn building_twice_gives_the_same_map() {
        let volumetric = volumetric_cloud();
        let (_, surface) = surface_subset(&volumetric);
        assert_eq!(
            build_correspondence(&volumetric, &surface).unwrap(),
            build_correspondence(&volumetric, &surface).unwrap()
        );
    }

    #[test]
    fn a_rounded_vertex_fails_the_whole_map() {
        let volumetric = volumetric_cloud();
        let (_, mut surface) = surface_subset(&volumetric);
        let original = surface[57];
        let rounded = |v: f64| format!("{v:.6}").parse::<f64>().unwrap();
        surface[57] = Point3::new(rounded(original.x), rounded(original.y), rounded(original.z));
        assert_ne!(surface[57], original);

        match build_correspondence(&volumetric, &surface) {
            Err(CorrespondenceError::UnmatchedVertex {
                surface_index,
                unmatched,
                ..
            }) => {
                assert_eq!(surface_index, 57);
                assert_eq!(unmatched, 1);
            }
            other => panic!("expected UnmatchedVertex, got {other:?}"),
        }
    }

    #[test]
    fn negative_zero_matches_positive_zero() {
        let volumetric = vec![Point3::new(1.0, 0.0, 2.0), Point3::new(0.0, 0.0, 0.0)];
        let surface = vec![Point3::new(-0.0, 0.0, -0.0), Point3::new(1.0, -0.0, 2.0)];
        let map = build_correspondence(&volumetric, &surface).unwrap();
        assert_eq!(map.indices(), &[1, 0]);
    }

    #[test]
    fn duplicate_volumetric_positions_resolve_to_lowest_index() {
        let p = Point3::new(0.5, 0.25, 0.125);
        let volumetric = vec![Point3::new(9.0, 9.0, 9.0), p, p, Point3::origin()];
        let map = build_correspondence(&volumetric, &[p, Point3::origin()]).unwrap();
        assert_eq!(map.indices(), &[1, 3]);
        assert_eq!(map.required_len(), 4);
    }

    #[test]
    fn nan_never_matches() {
        let nan = Point3::new(f64::NAN, 0.0, 0.0);
        let volumetric = vec![nan, Point3::origin()];
        assert!(matches!(
            build_correspondence(&volumetric, &[nan]),
            Err(CorrespondenceError::UnmatchedVertex { surface_index: 0, .. })
        ));
    }

    #[test]
    fn empty_surface_is_rejected() {
        assert_eq!(
            build_correspondence(&volumetric_cloud(), &[]),
            Err(CorrespondenceError::EmptySurface)
        );
    }

    #[test]
    fn apply_rejects_values_that_are_too_short() {
        let volumetric = volumetric_cloud();
        let map = build_correspondence(&volumetric, &[volumetric[999]]).unwrap();
        assert_eq!(map.apply(&[0u8; 10]), None);
    }
}
