//! # Workflows Module
//!
//! End-to-end procedures of the pipeline, the entry points a front end calls.
//!
//! - **Simulation** ([`simulate`]) - Locates FEBio and runs it over a batch of `.feb` inputs,
//!   returning every run's termination outcome.
//! - **Conversion** ([`convert`]) - Turns one simulation's output frames into the surface `.obj`
//!   and the `.npy` displacement array consumed by the renderer.
//!
//! Neither workflow writes solver input files; those are produced upstream.

use crate::engine::error::EngineError;
use std::path::Path;

pub mod convert;
pub mod simulate;

const INPUT_EXTENSION: &str = "feb";

fn ensure_feb_extension(path: &Path) -> Result<(), EngineError> {
    let is_feb = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION));
    if is_feb {
        Ok(())
    } else {
        Err(EngineError::InvalidInput {
            path: path.to_path_buf(),
            reason: format!("expected a .{INPUT_EXTENSION} file"),
        })
    }
}
