use nalgebra::{Point3, Vector3};

/// Cell shapes that can appear in a solver output frame, keyed by their VTK cell type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Vertex,
    Line,
    Triangle,
    Quad,
    Tetra,
    Hexahedron,
    Wedge,
    Pyramid,
    QuadraticTriangle,
    QuadraticTetra,
    Other(u8),
}

const TETRA_FACES: &[&[usize]] = &[&[0, 1, 3], &[1, 2, 3], &[2, 0, 3], &[0, 2, 1]];
const HEXAHEDRON_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1],
    &[4, 5, 6, 7],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[3, 0, 4, 7],
];
const WEDGE_FACES: &[&[usize]] = &[
    &[0, 1, 2],
    &[3, 5, 4],
    &[0, 3, 4, 1],
    &[1, 4, 5, 2],
    &[2, 5, 3, 0],
];
const PYRAMID_FACES: &[&[usize]] = &[
    &[0, 3, 2, 1],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];
const TRIANGLE_FACES: &[&[usize]] = &[&[0, 1, 2]];
const QUAD_FACES: &[&[usize]] = &[&[0, 1, 2, 3]];

impl CellKind {
    pub fn from_vtk_code(code: u8) -> Self {
        match code {
            1 => Self::Vertex,
            3 => Self::Line,
            5 => Self::Triangle,
            9 => Self::Quad,
            10 => Self::Tetra,
            12 => Self::Hexahedron,
            13 => Self::Wedge,
            14 => Self::Pyramid,
            22 => Self::QuadraticTriangle,
            24 => Self::QuadraticTetra,
            other => Self::Other(other),
        }
    }

    pub fn vtk_code(self) -> u8 {
        match self {
            Self::Vertex => 1,
            Self::Line => 3,
            Self::Triangle => 5,
            Self::Quad => 9,
            Self::Tetra => 10,
            Self::Hexahedron => 12,
            Self::Wedge => 13,
            Self::Pyramid => 14,
            Self::QuadraticTriangle => 22,
            Self::QuadraticTetra => 24,
            Self::Other(code) => code,
        }
    }

    /// Topological dimension, `None` for cell types this crate does not interpret.
    pub fn dimension(self) -> Option<u8> {
        match self {
            Self::Vertex => Some(0),
            Self::Line => Some(1),
            Self::Triangle | Self::Quad | Self::QuadraticTriangle => Some(2),
            Self::Tetra
            | Self::Hexahedron
            | Self::Wedge
            | Self::Pyramid
            | Self::QuadraticTetra => Some(3),
            Self::Other(_) => None,
        }
    }

    /// Number of corner nodes; quadratic cells list their corners first, mid-edge nodes after.
    pub fn corner_count(self) -> Option<usize> {
        match self {
            Self::Vertex => Some(1),
            Self::Line => Some(2),
            Self::Triangle | Self::QuadraticTriangle => Some(3),
            Self::Quad | Self::Tetra | Self::QuadraticTetra => Some(4),
            Self::Pyramid => Some(5),
            Self::Wedge => Some(6),
            Self::Hexahedron => Some(8),
            Self::Other(_) => None,
        }
    }

    /// Faces of the cell as local corner indices. For 2D cells the cell itself is the single
    /// face; 0D/1D and unknown cells have none.
    pub fn faces(self) -> &'static [&'static [usize]] {
        match self {
            Self::Tetra | Self::QuadraticTetra => TETRA_FACES,
            Self::Hexahedron => HEXAHEDRON_FACES,
            Self::Wedge => WEDGE_FACES,
            Self::Pyramid => PYRAMID_FACES,
            Self::Triangle | Self::QuadraticTriangle => TRIANGLE_FACES,
            Self::Quad => QUAD_FACES,
            Self::Vertex | Self::Line | Self::Other(_) => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub kind: CellKind,
    pub nodes: Vec<usize>,
}

impl Cell {
    pub fn new(kind: CellKind, nodes: Vec<usize>) -> Self {
        Self { kind, nodes }
    }
}

/// The full simulated geometry as stored in one solver output frame.
///
/// Vertex order is the solver's node order and is stable across all frames of a run; the
/// displacement vectors, when present, are indexed the same way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumetricMesh {
    pub vertices: Vec<Point3<f64>>,
    pub cells: Vec<Cell>,
    pub displacement: Option<Vec<Vector3<f64>>>,
}

impl VolumetricMesh {
    pub fn new(vertices: Vec<Point3<f64>>, cells: Vec<Cell>) -> Self {
        Self {
            vertices,
            cells,
            displacement: None,
        }
    }

    pub fn with_displacement(mut self, displacement: Vec<Vector3<f64>>) -> Self {
        self.displacement = Some(displacement);
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn displacement(&self) -> Option<&[Vector3<f64>]> {
        self.displacement.as_deref()
    }
}

/// A surface-only triangulation, as exported for rendering.
///
/// Its vertex order is unrelated to any [`VolumetricMesh`] order; only the coordinate values
/// tie the two together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceMesh {
    pub vertices: Vec<Point3<f64>>,
    pub faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}
