use crate::error::{CliError, Result};
use std::fs::File;
use std::path::PathBuf;
use tracing::Subscriber;
use tracing_subscriber::{
    Layer,
    filter::{LevelFilter, Targets},
    fmt::{self, format::FmtSpan},
    prelude::*,
    registry::LookupSpan,
};

/// Targets whose events follow `-v`; everything else is capped at WARN.
const PIPELINE_TARGETS: [&str; 2] = ["ewsfem", "ews_fem"];

fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

fn filter_for(verbosity: u8, quiet: bool) -> Targets {
    let level = level_for(verbosity, quiet);
    PIPELINE_TARGETS.iter().fold(
        Targets::new().with_default(level.min(LevelFilter::WARN)),
        |targets, target| targets.with_target(*target, level),
    )
}

/// File output also records when each span closes, so a log file carries the wall time of
/// every solver batch and conversion.
fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact();

    let subscriber = tracing_subscriber::registry()
        .with(filter_for(verbosity, quiet))
        .with(stderr_layer);

    match log_file {
        Some(path) => {
            let file = File::create(&path).map_err(CliError::Io)?;
            subscriber.with(file_layer(file)).init();
        }
        None => subscriber.init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{Level, debug, error, info, info_span, trace, warn};

    static INIT: Once = Once::new();

    fn ensure_global_logger_is_set() {
        INIT.call_once(|| {
            setup_logging(3, false, None).expect("Failed to set up global logger for tests");
        });
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }

    #[test]
    fn verbosity_only_raises_pipeline_targets() {
        let filter = filter_for(2, false);
        assert!(filter.would_enable("ewsfem::engine::runner", &Level::DEBUG));
        assert!(filter.would_enable("ews_fem::commands::fem", &Level::DEBUG));
        assert!(!filter.would_enable("ewsfem::engine::runner", &Level::TRACE));
        assert!(!filter.would_enable("rayon_core::registry", &Level::INFO));
        assert!(filter.would_enable("rayon_core::registry", &Level::WARN));
    }

    #[test]
    fn quiet_silences_every_target() {
        let filter = filter_for(3, true);
        assert!(!filter.would_enable("ewsfem::engine::runner", &Level::ERROR));
        assert!(!filter.would_enable("rayon_core::registry", &Level::ERROR));
    }

    #[test]
    #[serial]
    fn initialization_and_macros_work() {
        ensure_global_logger_is_set();

        error!("solver crashed");
        warn!("beam.feb terminated unexpectedly (no termination state found).");
        info!("Running 3 job(s)");
        debug!("Solver exited with status 0");
        trace!("frame 12 loaded");
    }

    #[test]
    #[serial]
    fn file_layer_records_span_timing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let log_path = temp_dir.path().join("ews.log");

        let file = File::create(&log_path).unwrap();
        let subscriber = tracing_subscriber::registry().with(file_layer(file));

        tracing::subscriber::with_default(subscriber, || {
            info_span!("solver_batch", jobs = 2).in_scope(|| {
                debug!("Converting 4 frame(s) of beam.feb");
            });
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Converting 4 frame(s) of beam.feb"));
        assert!(content.contains("DEBUG"));
        assert!(content.contains("ThreadId"));
        assert!(content.contains("solver_batch"));
        assert!(content.contains("close"));
    }

    #[test]
    #[serial]
    fn invalid_log_file_path_propagates_error() {
        let invalid_path = PathBuf::from("/");

        if cfg!(unix) && invalid_path.is_dir() {
            let result = setup_logging(0, false, Some(invalid_path));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
