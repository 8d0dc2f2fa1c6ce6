//! # Core Module
//!
//! Fundamental data structures and file formats of the pipeline.
//!
//! ## Architecture
//!
//! - **Models** ([`models`]) - Solver jobs, volumetric and surface meshes, displacement fields
//! - **File I/O** ([`io`]) - Legacy VTK frames, Wavefront OBJ surfaces, NumPy `.npy` arrays and
//!   output frame discovery
//! - **Surface Export** ([`surface`]) - Boundary extraction from the volumetric mesh
//!
//! Everything in here is free of process execution and logging side effects beyond file access,
//! so it can be reused by any front end.

pub mod io;
pub mod models;
pub mod surface;
