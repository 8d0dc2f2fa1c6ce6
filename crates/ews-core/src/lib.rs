//! # EWS FEM Core Library
//!
//! Execution and data-correspondence layer of the EWS finite-element pipeline: it drives the
//! external FEBio solver over batches of input files, classifies how each run terminated, and
//! turns the solver's volumetric output frames into a per-frame surface displacement field that
//! an external animation renderer can replay.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Job`, `VolumetricMesh`,
//!   `SurfaceMesh`, `DisplacementField`), file formats (legacy VTK, Wavefront OBJ, NumPy `.npy`)
//!   and the boundary-surface exporter.
//!
//! - **[`engine`]: The Logic Core.** Solver location, termination classification, the parallel
//!   execution harness, the surface/volume correspondence engine and the displacement assembler.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures (`simulate`, `convert`) that tie
//!   `engine` and `core` together and are what a command-line front end calls.

pub mod core;
pub mod engine;
pub mod workflows;
