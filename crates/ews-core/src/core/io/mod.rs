//! Provides input/output functionality for the mesh and array formats of the pipeline.
//!
//! The solver writes its time series as legacy ASCII VTK files, the exported surface is stored as
//! Wavefront OBJ, and the renderer consumes the displacement field as a NumPy `.npy` array.
//! Mesh formats share the [`traits::MeshFile`] interface.

pub mod frames;
pub mod npy;
pub mod obj;
pub mod traits;
pub mod vtk;
