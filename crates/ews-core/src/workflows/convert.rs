use super::ensure_feb_extension;
use crate::core::io::frames::discover_frames;
use crate::core::io::npy::NpyFile;
use crate::core::io::obj::ObjFile;
use crate::core::io::traits::MeshFile;
use crate::core::io::vtk::VtkFile;
use crate::core::models::job::Job;
use crate::core::models::mesh::VolumetricMesh;
use crate::core::surface::extract_surface;
use crate::engine::correspondence::build_correspondence;
use crate::engine::displacement::try_assemble;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use nalgebra::Vector3;
use std::iter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Files written by one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub surface_path: PathBuf,
    pub displacement_path: PathBuf,
    pub frame_count: usize,
    pub surface_vertex_count: usize,
}

/// Converts the output frames of the simulation described by `feb_path`.
///
/// Frame 0 defines the surface: its boundary is written as `<output>/<stem>.obj` and read back,
/// so the correspondence is built against exactly what the renderer will load. The displacement
/// of every frame is then gathered in surface order into `<output>/<stem>.npy`. Frames are
/// loaded one at a time.
#[instrument(skip_all, name = "convert_workflow", fields(input = %feb_path.display()))]
pub fn run(feb_path: &Path, reporter: &ProgressReporter) -> Result<ConversionResult, EngineError> {
    ensure_feb_extension(feb_path)?;
    let job = Job::new(feb_path);

    let frames = discover_frames(&job);
    let Some((first_path, later_paths)) = frames.split_first() else {
        return Err(EngineError::NoFrames { stem: job.stem() });
    };
    info!("Converting {} frame(s) of {}", frames.len(), job.name());

    let (map, surface_vertex_count, first_displacement) =
        reporter.phase("Exporting surface", || -> Result<_, EngineError> {
            let mut reference = read_frame(first_path)?;
            let first_displacement = take_displacement(&mut reference, 0)?;

            let surface = extract_surface(&reference)?;
            let surface_path = job.surface_path();
            ObjFile::write_to_path(&surface, &surface_path).map_err(|source| {
                EngineError::Obj {
                    path: surface_path.clone(),
                    source,
                }
            })?;
            let exported = ObjFile::read_from_path(&surface_path).map_err(|source| {
                EngineError::Obj {
                    path: surface_path.clone(),
                    source,
                }
            })?;
            debug!(
                "Surface has {} vertices and {} triangles",
                exported.vertex_count(),
                exported.faces.len()
            );

            let map = build_correspondence(&reference.vertices, &exported.vertices)?;
            Ok((map, exported.vertex_count(), first_displacement))
        })?;

    let field = reporter.phase("Assembling displacements", || {
        reporter.report(Progress::TaskStart {
            total_steps: frames.len() as u64,
        });
        let later = later_paths.iter().enumerate().map(|(offset, path)| {
            let frame = offset + 1;
            read_frame(path).and_then(|mut mesh| take_displacement(&mut mesh, frame))
        });
        let loaded = iter::once(Ok(first_displacement))
            .chain(later)
            .inspect(|_| reporter.report(Progress::TaskIncrement));
        let field = try_assemble(&map, loaded);
        reporter.report(Progress::TaskFinish);
        field
    })?;

    let displacement_path = job.displacement_path();
    NpyFile::write_to_path(&field, &displacement_path).map_err(|source| EngineError::Npy {
        path: displacement_path.clone(),
        source,
    })?;
    info!(
        "Wrote {} frame(s) x {} surface vertices to {}",
        field.frame_count(),
        field.vertex_count(),
        displacement_path.display()
    );

    Ok(ConversionResult {
        surface_path: job.surface_path(),
        displacement_path,
        frame_count: field.frame_count(),
        surface_vertex_count,
    })
}

fn read_frame(path: &Path) -> Result<VolumetricMesh, EngineError> {
    VtkFile::read_from_path(path).map_err(|source| EngineError::Vtk {
        path: path.to_path_buf(),
        source,
    })
}

fn take_displacement(
    mesh: &mut VolumetricMesh,
    frame: usize,
) -> Result<Vec<Vector3<f64>>, EngineError> {
    mesh.displacement
        .take()
        .ok_or(EngineError::MissingDisplacement { frame })
}
