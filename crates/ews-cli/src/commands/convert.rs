use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ewsfem::engine::progress::ProgressReporter;
use ewsfem::workflows::convert;
use std::path::PathBuf;
use tracing::{error, info};

/// Converts every file in turn. A failed conversion does not stop the others; the command fails
/// afterwards if any of them did.
pub fn run(files: &[PathBuf]) -> Result<()> {
    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    let mut failed = 0;
    for file in files {
        info!("Converting output of {}", file.display());
        match convert::run(file, &reporter) {
            Ok(result) => println!(
                "✓ {}: {} frame(s), {} surface vertices -> {}",
                file.display(),
                result.frame_count,
                result.surface_vertex_count,
                result.displacement_path.display()
            ),
            Err(e) => {
                failed += 1;
                error!("Conversion of {} failed: {}", file.display(), e);
                eprintln!("✗ {}: {}", file.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Conversion {
            failed,
            total: files.len(),
        });
    }
    Ok(())
}
