use crate::core::io::traits::MeshFile;
use crate::core::models::mesh::SurfaceMesh;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: ObjParseErrorKind },
}

#[derive(Debug, Error)]
pub enum ObjParseErrorKind {
    #[error("Vertex record needs three coordinates")]
    MissingCoordinate,
    #[error("Invalid coordinate '{0}'")]
    InvalidFloat(String),
    #[error("Invalid vertex reference '{0}'")]
    InvalidIndex(String),
    #[error("Vertex reference {index} is out of range ({count} vertices defined)")]
    IndexOutOfRange { index: isize, count: usize },
    #[error("Face record needs at least three vertices")]
    DegenerateFace,
}

/// Wavefront OBJ surface meshes.
///
/// Only geometry is kept: `v` positions and `f` faces (polygons are fan-triangulated, texture and
/// normal references are dropped). Coordinates are written with the shortest representation
/// that parses back to the identical `f64`, so a written surface can be matched exactly against
/// the mesh it came from.
pub struct ObjFile;

impl MeshFile for ObjFile {
    type Mesh = SurfaceMesh;
    type Error = ObjError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Mesh, Self::Error> {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let mut fields = line.split_whitespace();

            match fields.next() {
                Some("v") => {
                    let mut coord = || -> Result<f64, ObjError> {
                        let value = fields.next().ok_or(ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::MissingCoordinate,
                        })?;
                        value.parse().map_err(|_| ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::InvalidFloat(value.into()),
                        })
                    };
                    let (x, y, z) = (coord()?, coord()?, coord()?);
                    vertices.push(Point3::new(x, y, z));
                }
                Some("f") => {
                    let corners = fields
                        .map(|reference| resolve_reference(reference, vertices.len(), line_num))
                        .collect::<Result<Vec<_>, _>>()?;
                    if corners.len() < 3 {
                        return Err(ObjError::Parse {
                            line: line_num,
                            kind: ObjParseErrorKind::DegenerateFace,
                        });
                    }
                    for i in 1..corners.len() - 1 {
                        faces.push([corners[0], corners[i], corners[i + 1]]);
                    }
                }
                _ => {}
            }
        }

        Ok(SurfaceMesh::new(vertices, faces))
    }

    fn write_to(mesh: &Self::Mesh, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "# EWS FEM surface export")?;
        writeln!(writer, "o surface")?;
        for v in &mesh.vertices {
            writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
        }
        for [a, b, c] in &mesh.faces {
            writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
        }
        Ok(())
    }
}

/// Resolves an `f` token (`v`, `v/vt`, `v//vn` or `v/vt/vn`) to a zero-based vertex index.
fn resolve_reference(reference: &str, defined: usize, line: usize) -> Result<usize, ObjError> {
    let vertex = reference.split('/').next().unwrap_or_default();
    let index: isize = vertex.parse().map_err(|_| ObjError::Parse {
        line,
        kind: ObjParseErrorKind::InvalidIndex(reference.into()),
    })?;

    let resolved = if index < 0 {
        defined as isize + index
    } else {
        index - 1
    };
    if index == 0 || resolved < 0 || resolved as usize >= defined {
        return Err(ObjError::Parse {
            line,
            kind: ObjParseErrorKind::IndexOutOfRange {
                index,
                count: defined,
            },
        });
    }
    Ok(resolved as usize)
}
