use nalgebra::Vector3;

const AXES: usize = 3;

/// Dense `[frame, surface-vertex, axis]` array of displacements relative to the rest position.
///
/// Storage is frame-major and row-major contiguous, which is exactly the layout of the `.npy`
/// file handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementField {
    frames: usize,
    vertices: usize,
    data: Vec<f64>,
}

impl DisplacementField {
    pub fn new(vertices: usize) -> Self {
        Self {
            frames: 0,
            vertices,
            data: Vec::new(),
        }
    }

    pub fn with_capacity(vertices: usize, frames: usize) -> Self {
        Self {
            frames: 0,
            vertices,
            data: Vec::with_capacity(frames * vertices * AXES),
        }
    }

    /// Rebuilds a field from a flat buffer, returning `None` if the buffer length does not match
    /// the shape.
    pub fn from_parts(frames: usize, vertices: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == frames * vertices * AXES).then_some(Self {
            frames,
            vertices,
            data,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.frames, self.vertices, AXES]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn frame(&self, frame: usize) -> Option<&[f64]> {
        if frame >= self.frames {
            return None;
        }
        let stride = self.vertices * AXES;
        Some(&self.data[frame * stride..(frame + 1) * stride])
    }

    pub fn get(&self, frame: usize, vertex: usize) -> Option<Vector3<f64>> {
        if vertex >= self.vertices {
            return None;
        }
        let row = self.frame(frame)?;
        let start = vertex * AXES;
        Some(Vector3::new(row[start], row[start + 1], row[start + 2]))
    }

    pub(crate) fn push_frame(&mut self, row: impl IntoIterator<Item = Vector3<f64>>) {
        let before = self.data.len();
        for v in row {
            self.data.extend_from_slice(&[v.x, v.y, v.z]);
        }
        debug_assert_eq!(self.data.len() - before, self.vertices * AXES);
        self.frames += 1;
    }
}
