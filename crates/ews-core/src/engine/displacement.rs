use super::correspondence::CorrespondenceMap;
use super::error::EngineError;
use crate::core::models::displacement::DisplacementField;
use nalgebra::Vector3;

/// Gathers the surface vertices' displacements out of every frame, in frame order.
///
/// Each item of `frames` holds the displacement of every volumetric vertex for one frame.
pub fn assemble<I, F>(map: &CorrespondenceMap, frames: I) -> Result<DisplacementField, EngineError>
where
    I: IntoIterator<Item = F>,
    F: AsRef<[Vector3<f64>]>,
{
    try_assemble(map, frames.into_iter().map(Ok))
}

/// Like [`assemble`], for frames that are loaded lazily and may fail to load. The first error
/// stops the assembly.
pub fn try_assemble<I, F>(
    map: &CorrespondenceMap,
    frames: I,
) -> Result<DisplacementField, EngineError>
where
    I: IntoIterator<Item = Result<F, EngineError>>,
    F: AsRef<[Vector3<f64>]>,
{
    let frames = frames.into_iter();
    let mut field = DisplacementField::with_capacity(map.len(), frames.size_hint().0);

    for (frame, vectors) in frames.enumerate() {
        let vectors = vectors?;
        let vectors = vectors.as_ref();
        let row = map.apply(vectors).ok_or(EngineError::FrameMismatch {
            frame,
            expected: map.required_len(),
            found: vectors.len(),
        })?;
        field.push_frame(row);
    }
    Ok(field)
}
