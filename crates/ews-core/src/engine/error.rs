use thiserror::Error;

use super::config::ConfigError;
use super::correspondence::CorrespondenceError;
use crate::core::io::npy::NpyError;
use crate::core::io::obj::ObjError;
use crate::core::io::vtk::VtkError;
use crate::core::surface::SurfaceError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("FEBio executable not found (searched: {})", display_paths(.searched))]
    ExecutableNotFound { searched: Vec<PathBuf> },

    #[error("Input file does not exist: {}", .path.display())]
    MissingInput { path: PathBuf },

    #[error("Invalid input '{}': {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start worker pool: {0}")]
    ThreadPool(String),

    #[error("Surface/volume correspondence failed: {0}")]
    Correspondence(#[from] CorrespondenceError),

    #[error("Surface extraction failed: {0}")]
    Surface(#[from] SurfaceError),

    #[error("Failed to read frame '{}': {source}", .path.display())]
    Vtk {
        path: PathBuf,
        #[source]
        source: VtkError,
    },

    #[error("Failed to process surface mesh '{}': {source}", .path.display())]
    Obj {
        path: PathBuf,
        #[source]
        source: ObjError,
    },

    #[error("Failed to write displacement array '{}': {source}", .path.display())]
    Npy {
        path: PathBuf,
        #[source]
        source: NpyError,
    },

    #[error("No output frames found for '{stem}'")]
    NoFrames { stem: String },

    #[error("Frame {frame} carries no point displacement vectors")]
    MissingDisplacement { frame: usize },

    #[error("Frame {frame} has {found} vertices, but the correspondence needs at least {expected}")]
    FrameMismatch {
        frame: usize,
        expected: usize,
        found: usize,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
