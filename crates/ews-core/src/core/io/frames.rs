use crate::core::models::job::Job;
use std::path::PathBuf;

/// Lists the solver output frames of a job in time order.
///
/// FEBio numbers its plot files `<stem>.0.vtk`, `<stem>.1.vtk`, ... without gaps, so the sequence
/// ends at the first index whose file does not exist.
pub fn discover_frames(job: &Job) -> Vec<PathBuf> {
    (0..)
        .map(|index| job.frame_path(index))
        .take_while(|path| path.is_file())
        .collect()
}
