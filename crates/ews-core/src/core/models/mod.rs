//! Data models shared by the engine and the workflows.
//!
//! - [`job`] - One solver input file and the file names derived from it
//! - [`mesh`] - Volumetric meshes read from solver frames and exported surface meshes
//! - [`displacement`] - Dense frame-major surface displacement arrays

pub mod displacement;
pub mod job;
pub mod mesh;
