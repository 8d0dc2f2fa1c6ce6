use std::path::{Path, PathBuf};

const LOG_EXTENSION: &str = "log";
const OUTPUT_DIR_NAME: &str = "output";
const FRAME_EXTENSION: &str = "vtk";
const SURFACE_EXTENSION: &str = "obj";
const DISPLACEMENT_EXTENSION: &str = "npy";

/// A single solver input file submitted to FEBio.
///
/// Every file the solver and the conversion stage produce for this input is derived from the
/// input's stem, so concurrent jobs never write to the same location as long as their stems are
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Job {
    input: PathBuf,
}

impl Job {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// File name of the input, used in user-facing report sentences.
    pub fn name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }

    pub fn stem(&self) -> String {
        self.input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<input-dir>/<input-stem>.log`, written by the solver.
    pub fn log_path(&self) -> PathBuf {
        self.input.with_extension(LOG_EXTENSION)
    }

    /// `<input-dir>/output`, where the solver writes its plot frames.
    pub fn output_dir(&self) -> PathBuf {
        self.input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(OUTPUT_DIR_NAME)
    }

    /// `<output-dir>/<input-stem>.<index>.vtk`
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.output_dir()
            .join(format!("{}.{}.{}", self.stem(), index, FRAME_EXTENSION))
    }

    /// `<output-dir>/<input-stem>.obj`
    pub fn surface_path(&self) -> PathBuf {
        self.output_file(SURFACE_EXTENSION)
    }

    /// `<output-dir>/<input-stem>.npy`
    pub fn displacement_path(&self) -> PathBuf {
        self.output_file(DISPLACEMENT_EXTENSION)
    }

    fn output_file(&self, extension: &str) -> PathBuf {
        self.output_dir()
            .join(format!("{}.{}", self.stem(), extension))
    }
}

impl From<&Path> for Job {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for Job {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
