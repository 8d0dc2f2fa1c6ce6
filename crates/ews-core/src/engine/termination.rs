use regex::Regex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

static NORMAL_TERMINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"N O R M A L {3}T E R M I N A T I O N").expect("normal marker is a valid regex")
});
static ERROR_TERMINATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"E R R O R {3}T E R M I N A T I O N").expect("error marker is a valid regex")
});
static ELAPSED_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Total elapsed time [.]* : [\d:]* \(([\d.]*) sec\)")
        .expect("elapsed time pattern is a valid regex")
});

/// How a solver run ended, as far as its log tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationOutcome {
    NormalTermination,
    ErrorTermination,
    NoTerminationFound,
    NoLogFile,
}

impl TerminationOutcome {
    /// Markers in the order they are tried; the first match decides.
    fn markers() -> [(&'static LazyLock<Regex>, Self); 2] {
        [
            (&NORMAL_TERMINATION, Self::NormalTermination),
            (&ERROR_TERMINATION, Self::ErrorTermination),
        ]
    }

    pub fn is_success(self) -> bool {
        self == Self::NormalTermination
    }

    /// Report sentence for a job called `name`.
    ///
    /// A known elapsed time always keeps its fractional part (`12.0`); an unknown one is
    /// printed as [`TerminationReport::UNKNOWN_ELAPSED`].
    pub fn describe(self, name: &str, elapsed_seconds: Option<f64>) -> String {
        let time = elapsed_seconds.map_or_else(
            || TerminationReport::UNKNOWN_ELAPSED.to_string(),
            |seconds| format!("{seconds:?}"),
        );
        match self {
            Self::NormalTermination => {
                format!("{name} terminated successfully in {time} seconds.")
            }
            Self::ErrorTermination => {
                format!("{name} terminated unsuccessfully in {time} seconds.")
            }
            Self::NoTerminationFound => {
                format!("{name} terminated unexpectedly (no termination state found).")
            }
            Self::NoLogFile => format!("{name} most likely didn't run (no log file found)."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminationReport {
    pub outcome: TerminationOutcome,
    pub elapsed_seconds: Option<f64>,
}

impl TerminationReport {
    /// Value printed in report sentences when the log holds no elapsed time.
    pub const UNKNOWN_ELAPSED: &'static str = "-1";

    pub fn new(outcome: TerminationOutcome, elapsed_seconds: Option<f64>) -> Self {
        Self {
            outcome,
            elapsed_seconds,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn message(&self, name: &str) -> String {
        self.outcome.describe(name, self.elapsed_seconds)
    }
}

/// Classifies solver runs from the tail of their log files.
#[derive(Debug, Clone, Copy)]
pub struct TerminationClassifier {
    tail_length: u64,
}

impl TerminationClassifier {
    pub fn new(tail_length: u64) -> Self {
        Self { tail_length }
    }

    pub fn classify(&self, log_path: &Path) -> TerminationReport {
        if !log_path.is_file() {
            return TerminationReport::new(TerminationOutcome::NoLogFile, None);
        }
        match self.read_tail(log_path) {
            Ok(tail) => Self::classify_text(&tail),
            Err(e) => {
                warn!("Failed to read log file {}: {}", log_path.display(), e);
                TerminationReport::new(TerminationOutcome::NoTerminationFound, None)
            }
        }
    }

    /// Classifies a window of log text that is already in memory.
    pub fn classify_text(text: &str) -> TerminationReport {
        let outcome = TerminationOutcome::markers()
            .into_iter()
            .find(|(pattern, _)| pattern.is_match(text))
            .map(|(_, outcome)| outcome)
            .unwrap_or(TerminationOutcome::NoTerminationFound);

        let elapsed_seconds = ELAPSED_TIME
            .captures(text)
            .and_then(|caps| caps[1].parse::<f64>().ok());

        TerminationReport::new(outcome, elapsed_seconds)
    }

    fn read_tail(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let len = file.metadata()?.len();
        file.seek(SeekFrom::Start(len.saturating_sub(self.tail_length)))?;

        let mut bytes = Vec::with_capacity(len.min(self.tail_length) as usize);
        file.take(self.tail_length).read_to_end(&mut bytes)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Default for TerminationClassifier {
    fn default() -> Self {
        Self::new(crate::engine::config::DEFAULT_TAIL_LENGTH)
    }
}
