use crate::core::models::mesh::{SurfaceMesh, VolumetricMesh};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Mesh has no boundary faces to export")]
    NoSurface,
    #[error("Cell {cell} has fewer nodes than its {kind} shape requires")]
    MalformedCell { cell: usize, kind: String },
    #[error("Cell {cell} references vertex {vertex}, but the mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        cell: usize,
        vertex: usize,
        vertex_count: usize,
    },
}

/// Extracts the outer surface of a volumetric mesh as a triangle mesh.
///
/// For meshes with solid cells the surface is every face referenced by exactly one solid cell;
/// meshes made only of shell cells export the shells themselves. Quadratic cells contribute
/// their corner nodes only and polygons are fan-triangulated.
///
/// The surface gets its own vertex numbering (first use over the face list), but every
/// coordinate is copied bit-for-bit from the volumetric mesh.
pub fn extract_surface(mesh: &VolumetricMesh) -> Result<SurfaceMesh, SurfaceError> {
    let has_solids = mesh.cells.iter().any(|c| c.kind.dimension() == Some(3));
    let face_dimension = if has_solids { 3 } else { 2 };

    let mut faces: Vec<Vec<usize>> = Vec::new();
    let mut references: Vec<usize> = Vec::new();
    let mut slots: HashMap<Vec<usize>, usize> = HashMap::new();

    for (cell_index, cell) in mesh.cells.iter().enumerate() {
        if cell.kind.dimension() != Some(face_dimension) {
            continue;
        }
        for local in cell.kind.faces() {
            let nodes = local
                .iter()
                .map(|&i| {
                    cell.nodes.get(i).copied().ok_or(SurfaceError::MalformedCell {
                        cell: cell_index,
                        kind: format!("{:?}", cell.kind),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(&vertex) = nodes.iter().find(|&&v| v >= mesh.vertex_count()) {
                return Err(SurfaceError::VertexOutOfRange {
                    cell: cell_index,
                    vertex,
                    vertex_count: mesh.vertex_count(),
                });
            }

            let mut key = nodes.clone();
            key.sort_unstable();
            match slots.entry(key) {
                Entry::Occupied(slot) => references[*slot.get()] += 1,
                Entry::Vacant(slot) => {
                    slot.insert(faces.len());
                    faces.push(nodes);
                    references.push(1);
                }
            }
        }
    }

    let mut renumbered: HashMap<usize, usize> = HashMap::new();
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut local_index = |global: usize| {
        *renumbered.entry(global).or_insert_with(|| {
            vertices.push(mesh.vertices[global]);
            vertices.len() - 1
        })
    };

    for (face, count) in faces.iter().zip(&references) {
        if has_solids && *count != 1 {
            continue;
        }
        let corners: Vec<usize> = face.iter().map(|&v| local_index(v)).collect();
        for i in 1..corners.len() - 1 {
            triangles.push([corners[0], corners[i], corners[i + 1]]);
        }
    }

    if triangles.is_empty() {
        return Err(SurfaceError::NoSurface);
    }
    Ok(SurfaceMesh::new(vertices, triangles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::mesh::fixtures::tetrahedral_block;
    use crate::core::models::mesh::{Cell, CellKind};
    use nalgebra::Point3;
    use std::collections::HashSet;

    fn unit_tetra_vertices() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
        ]
    }

    #[test]
    fn single_tetra_exports_all_four_faces() {
        let mut vertices = unit_tetra_vertices();
        vertices.truncate(4);
        let mesh = VolumetricMesh::new(vertices, vec![Cell::new(CellKind::Tetra, vec![0, 1, 2, 3])]);

        let surface = extract_surface(&mesh).unwrap();
        assert_eq!(surface.vertex_count(), 4);
        assert_eq!(surface.faces.len(), 4);
    }

    #[test]
    fn shared_faces_between_solids_are_interior() {
        let mesh = VolumetricMesh::new(
            unit_tetra_vertices(),
            vec![
                Cell::new(CellKind::Tetra, vec![0, 1, 2, 3]),
                Cell::new(CellKind::Tetra, vec![1, 2, 3, 4]),
            ],
        );

        let surface = extract_surface(&mesh).unwrap();
        assert_eq!(surface.faces.len(), 6);
        assert_eq!(surface.vertex_count(), 5);
    }

    #[test]
    fn grid_interior_vertices_are_not_exported() {
        let mesh = tetrahedral_block(3, 0.25);
        let surface = extract_surface(&mesh).unwrap();

        // 27 grid points, only the centre one is interior; 6 sides x 4 squares x 2 triangles.
        assert_eq!(surface.vertex_count(), 26);
        assert_eq!(surface.faces.len(), 48);
        let centre = mesh.vertices[13];
        assert!(!surface.vertices.contains(&centre));
    }

    #[test]
    fn exported_coordinates_are_bit_identical_and_unique() {
        let mesh = tetrahedral_block(4, 0.1);
        let surface = extract_surface(&mesh).unwrap();

        let volumetric: HashSet<[u64; 3]> = mesh
            .vertices
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect();
        let exported: HashSet<[u64; 3]> = surface
            .vertices
            .iter()
            .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
            .collect();
        assert_eq!(exported.len(), surface.vertex_count());
        assert!(exported.is_subset(&volumetric));
        assert!(surface
            .faces
            .iter()
            .all(|f| f.iter().all(|&i| i < surface.vertex_count())));
    }

    #[test]
    fn shell_only_meshes_export_their_shells() {
        let mesh = VolumetricMesh::new(
            unit_tetra_vertices(),
            vec![
                Cell::new(CellKind::QuadraticTriangle, vec![0, 1, 2, 0, 1, 2]),
                Cell::new(CellKind::Quad, vec![1, 2, 4, 3]),
                Cell::new(CellKind::Line, vec![0, 4]),
            ],
        );
        let surface = extract_surface(&mesh).unwrap();
        assert_eq!(surface.faces.len(), 3);
        assert_eq!(surface.vertex_count(), 5);
    }

    #[test]
    fn hexahedron_surface_is_twelve_triangles() {
        let vertices = (0..8)
            .map(|i| Point3::new((i & 1) as f64, ((i >> 1) & 1) as f64, (i >> 2) as f64))
            .collect();
        let mesh = VolumetricMesh::new(
            vertices,
            vec![Cell::new(CellKind::Hexahedron, vec![0, 1, 3, 2, 4, 5, 7, 6])],
        );
        let surface = extract_surface(&mesh).unwrap();
        assert_eq!(surface.faces.len(), 12);
        assert_eq!(surface.vertex_count(), 8);
    }

    #[test]
    fn meshes_without_faces_are_rejected() {
        let mesh = VolumetricMesh::new(unit_tetra_vertices(), vec![]);
        assert_eq!(extract_surface(&mesh), Err(SurfaceError::NoSurface));
    }

    #[test]
    fn out_of_range_nodes_are_rejected() {
        let mesh = VolumetricMesh::new(
            unit_tetra_vertices(),
            vec![Cell::new(CellKind::Tetra, vec![0, 1, 2, 9])],
        );
        assert!(matches!(
            extract_surface(&mesh),
            Err(SurfaceError::VertexOutOfRange { vertex: 9, .. })
        ));
    }

    #[test]
    fn truncated_cells_are_rejected() {
        let mesh = VolumetricMesh::new(
            unit_tetra_vertices(),
            vec![Cell::new(CellKind::Tetra, vec![0, 1, 2])],
        );
        assert!(matches!(
            extract_surface(&mesh),
            Err(SurfaceError::MalformedCell { cell: 0, .. })
        ));
    }
}
