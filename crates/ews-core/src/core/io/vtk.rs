use crate::core::io::traits::MeshFile;
use crate::core::models::mesh::{Cell, CellKind, VolumetricMesh};
use nalgebra::{Point3, Vector3};
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

const HEADER_PREFIX: &str = "# vtk DataFile Version";
const HEADER_LINES: usize = 3;
const DISPLACEMENT_NAME: &str = "displacement";

#[derive(Debug, Error)]
pub enum VtkError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: VtkParseErrorKind },
    #[error("Unsupported VTK content: {0}")]
    Unsupported(String),
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Error)]
pub enum VtkParseErrorKind {
    #[error("Missing '# vtk DataFile Version' header")]
    InvalidHeader,
    #[error("Invalid integer for {expected} (value: '{value}')")]
    InvalidInt {
        expected: &'static str,
        value: String,
    },
    #[error("Invalid float for {expected} (value: '{value}')")]
    InvalidFloat {
        expected: &'static str,
        value: String,
    },
    #[error("Unexpected end of file while reading {expected}")]
    UnexpectedEof { expected: &'static str },
    #[error("Unknown keyword '{0}'")]
    UnknownKeyword(String),
    #[error("Attribute '{0}' appears outside of a POINT_DATA or CELL_DATA section")]
    AttributeOutsideSection(String),
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    line: usize,
    text: &'a str,
}

struct Cursor<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    last_line: usize,
}

impl<'a> Cursor<'a> {
    fn new(lines: impl Iterator<Item = (usize, &'a str)>) -> Self {
        let mut tokens = Vec::new();
        let mut last_line = 0;
        for (line, content) in lines {
            last_line = line;
            tokens.extend(content.split_whitespace().map(|text| Token { line, text }));
        }
        Self {
            tokens,
            pos: 0,
            last_line,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next_opt(&mut self) -> Option<Token<'a>> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn next(&mut self, expected: &'static str) -> Result<Token<'a>, VtkError> {
        self.next_opt().ok_or(VtkError::Parse {
            line: self.last_line,
            kind: VtkParseErrorKind::UnexpectedEof { expected },
        })
    }

    fn usize(&mut self, expected: &'static str) -> Result<usize, VtkError> {
        let token = self.next(expected)?;
        token.text.parse().map_err(|_| VtkError::Parse {
            line: token.line,
            kind: VtkParseErrorKind::InvalidInt {
                expected,
                value: token.text.into(),
            },
        })
    }

    fn f64(&mut self, expected: &'static str) -> Result<f64, VtkError> {
        let token = self.next(expected)?;
        token.text.parse().map_err(|_| VtkError::Parse {
            line: token.line,
            kind: VtkParseErrorKind::InvalidFloat {
                expected,
                value: token.text.into(),
            },
        })
    }

    fn triples(&mut self, count: usize, expected: &'static str) -> Result<Vec<[f64; 3]>, VtkError> {
        (0..count)
            .map(|_| -> Result<[f64; 3], VtkError> {
                Ok([self.f64(expected)?, self.f64(expected)?, self.f64(expected)?])
            })
            .collect()
    }

    fn skip(&mut self, count: usize, expected: &'static str) -> Result<(), VtkError> {
        if self.pos + count > self.tokens.len() {
            return Err(VtkError::Parse {
                line: self.last_line,
                kind: VtkParseErrorKind::UnexpectedEof { expected },
            });
        }
        self.pos += count;
        Ok(())
    }

    /// Consumes the next token only if it sits on `line` and parses as an integer.
    fn optional_usize_on_line(&mut self, line: usize) -> Option<usize> {
        let token = self.peek().filter(|t| t.line == line)?;
        let value = token.text.parse().ok()?;
        self.pos += 1;
        Some(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum AttributeSection {
    Points(usize),
    Cells(usize),
}

impl AttributeSection {
    fn count(self) -> usize {
        match self {
            Self::Points(n) | Self::Cells(n) => n,
        }
    }
}

/// Legacy ASCII VTK unstructured grids, the per-frame plot format FEBio writes.
///
/// The first `VECTORS` array of the `POINT_DATA` section is taken as the frame's displacement
/// field; every other attribute array is skipped.
pub struct VtkFile;

impl MeshFile for VtkFile {
    type Mesh = VolumetricMesh;
    type Error = VtkError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Mesh, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let mut lines = content.lines().enumerate().map(|(i, l)| (i + 1, l));
        read_header(&mut lines)?;
        let mut cursor = Cursor::new(lines);

        let mut points: Option<Vec<[f64; 3]>> = None;
        let mut connectivity: Option<Vec<Vec<usize>>> = None;
        let mut cell_types: Option<Vec<u8>> = None;
        let mut displacement: Option<Vec<[f64; 3]>> = None;
        let mut section: Option<AttributeSection> = None;

        while let Some(keyword) = cursor.next_opt() {
            let upper = keyword.text.to_ascii_uppercase();
            match upper.as_str() {
                "DATASET" => {
                    let kind = cursor.next("dataset type")?;
                    if !kind.text.eq_ignore_ascii_case("UNSTRUCTURED_GRID") {
                        return Err(VtkError::Unsupported(format!(
                            "dataset type '{}' (only UNSTRUCTURED_GRID is supported)",
                            kind.text
                        )));
                    }
                }
                "POINTS" => {
                    let n = cursor.usize("point count")?;
                    cursor.next("point data type")?;
                    points = Some(cursor.triples(n, "point coordinate")?);
                }
                "CELLS" => {
                    let n = cursor.usize("cell count")?;
                    let size = cursor.usize("cell list size")?;
                    let mut cells = Vec::with_capacity(n);
                    let mut consumed = 0;
                    for _ in 0..n {
                        let count = cursor.usize("cell node count")?;
                        let nodes = (0..count)
                            .map(|_| cursor.usize("cell node index"))
                            .collect::<Result<Vec<_>, _>>()?;
                        consumed += count + 1;
                        cells.push(nodes);
                    }
                    if consumed != size {
                        return Err(VtkError::Inconsistency(format!(
                            "CELLS declares a list size of {} but contains {} entries",
                            size, consumed
                        )));
                    }
                    connectivity = Some(cells);
                }
                "CELL_TYPES" => {
                    let n = cursor.usize("cell type count")?;
                    let types = (0..n)
                        .map(|_| -> Result<u8, VtkError> {
                            let token = cursor.next("cell type")?;
                            token.text.parse::<u8>().map_err(|_| VtkError::Parse {
                                line: token.line,
                                kind: VtkParseErrorKind::InvalidInt {
                                    expected: "cell type",
                                    value: token.text.into(),
                                },
                            })
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    cell_types = Some(types);
                }
                "POINT_DATA" => {
                    section = Some(AttributeSection::Points(cursor.usize("point data count")?));
                }
                "CELL_DATA" => {
                    section = Some(AttributeSection::Cells(cursor.usize("cell data count")?));
                }
                "SCALARS" => {
                    let count = require_section(section, keyword)?.count();
                    cursor.next("scalar name")?;
                    let dtype = cursor.next("scalar data type")?;
                    let components = cursor.optional_usize_on_line(dtype.line).unwrap_or(1);
                    if cursor
                        .peek()
                        .is_some_and(|t| t.text.eq_ignore_ascii_case("LOOKUP_TABLE"))
                    {
                        cursor.skip(2, "lookup table name")?;
                    }
                    cursor.skip(count * components, "scalar values")?;
                }
                "VECTORS" | "NORMALS" => {
                    let current = require_section(section, keyword)?;
                    cursor.next("vector name")?;
                    cursor.next("vector data type")?;
                    let values = cursor.triples(current.count(), "vector component")?;
                    let is_point_vectors = matches!(current, AttributeSection::Points(_));
                    if upper == "VECTORS" && is_point_vectors && displacement.is_none() {
                        displacement = Some(values);
                    }
                }
                "TENSORS" => {
                    let count = require_section(section, keyword)?.count();
                    cursor.skip(2, "tensor header")?;
                    cursor.skip(count * 9, "tensor values")?;
                }
                "LOOKUP_TABLE" => {
                    cursor.next("lookup table name")?;
                    let size = cursor.usize("lookup table size")?;
                    cursor.skip(size * 4, "lookup table values")?;
                }
                "FIELD" => {
                    cursor.next("field name")?;
                    let arrays = cursor.usize("field array count")?;
                    for _ in 0..arrays {
                        cursor.next("field array name")?;
                        let components = cursor.usize("field component count")?;
                        let tuples = cursor.usize("field tuple count")?;
                        cursor.next("field data type")?;
                        cursor.skip(components * tuples, "field values")?;
                    }
                }
                _ => {
                    return Err(VtkError::Parse {
                        line: keyword.line,
                        kind: VtkParseErrorKind::UnknownKeyword(keyword.text.into()),
                    });
                }
            }
        }

        let points = points.ok_or(VtkError::MissingSection("POINTS"))?;
        let cells = assemble_cells(connectivity, cell_types, points.len())?;

        let mut mesh = VolumetricMesh::new(
            points.into_iter().map(|[x, y, z]| Point3::new(x, y, z)).collect(),
            cells,
        );
        if let Some(values) = displacement {
            if values.len() != mesh.vertex_count() {
                return Err(VtkError::Inconsistency(format!(
                    "POINT_DATA holds {} vectors for {} points",
                    values.len(),
                    mesh.vertex_count()
                )));
            }
            mesh.displacement = Some(
                values
                    .into_iter()
                    .map(|[x, y, z]| Vector3::new(x, y, z))
                    .collect(),
            );
        }
        Ok(mesh)
    }

    fn write_to(mesh: &Self::Mesh, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{} 3.0", HEADER_PREFIX)?;
        writeln!(writer, "EWS FEM frame")?;
        writeln!(writer, "ASCII")?;
        writeln!(writer, "DATASET UNSTRUCTURED_GRID")?;

        writeln!(writer, "POINTS {} double", mesh.vertex_count())?;
        for p in &mesh.vertices {
            writeln!(writer, "{} {} {}", p.x, p.y, p.z)?;
        }

        let list_size: usize = mesh.cells.iter().map(|c| c.nodes.len() + 1).sum();
        writeln!(writer, "CELLS {} {}", mesh.cells.len(), list_size)?;
        for cell in &mesh.cells {
            write!(writer, "{}", cell.nodes.len())?;
            for node in &cell.nodes {
                write!(writer, " {}", node)?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "CELL_TYPES {}", mesh.cells.len())?;
        for cell in &mesh.cells {
            writeln!(writer, "{}", cell.kind.vtk_code())?;
        }

        if let Some(displacement) = mesh.displacement() {
            writeln!(writer, "POINT_DATA {}", displacement.len())?;
            writeln!(writer, "VECTORS {} double", DISPLACEMENT_NAME)?;
            for v in displacement {
                writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
            }
        }
        Ok(())
    }
}

fn read_header<'a>(lines: &mut impl Iterator<Item = (usize, &'a str)>) -> Result<(), VtkError> {
    let mut header = Vec::with_capacity(HEADER_LINES);
    for _ in 0..HEADER_LINES {
        let (line, content) = lines.next().ok_or(VtkError::Parse {
            line: header.len() + 1,
            kind: VtkParseErrorKind::UnexpectedEof {
                expected: "file header",
            },
        })?;
        header.push((line, content.trim()));
    }

    let (line, version) = header[0];
    if !version.starts_with(HEADER_PREFIX) {
        return Err(VtkError::Parse {
            line,
            kind: VtkParseErrorKind::InvalidHeader,
        });
    }
    let (_, format) = header[2];
    if !format.eq_ignore_ascii_case("ASCII") {
        return Err(VtkError::Unsupported(format!(
            "'{}' encoding (only ASCII is supported)",
            format
        )));
    }
    Ok(())
}

fn require_section(
    section: Option<AttributeSection>,
    keyword: Token<'_>,
) -> Result<AttributeSection, VtkError> {
    section.ok_or_else(|| VtkError::Parse {
        line: keyword.line,
        kind: VtkParseErrorKind::AttributeOutsideSection(keyword.text.into()),
    })
}

fn assemble_cells(
    connectivity: Option<Vec<Vec<usize>>>,
    cell_types: Option<Vec<u8>>,
    vertex_count: usize,
) -> Result<Vec<Cell>, VtkError> {
    let (connectivity, cell_types) = match (connectivity, cell_types) {
        (None, None) => return Ok(Vec::new()),
        (Some(_), None) => return Err(VtkError::MissingSection("CELL_TYPES")),
        (None, Some(_)) => return Err(VtkError::MissingSection("CELLS")),
        (Some(c), Some(t)) => (c, t),
    };
    if connectivity.len() != cell_types.len() {
        return Err(VtkError::Inconsistency(format!(
            "{} cells but {} cell types",
            connectivity.len(),
            cell_types.len()
        )));
    }

    connectivity
        .into_iter()
        .zip(cell_types)
        .enumerate()
        .map(|(index, (nodes, code))| {
            if let Some(&bad) = nodes.iter().find(|&&n| n >= vertex_count) {
                return Err(VtkError::Inconsistency(format!(
                    "cell {} references node {} but only {} points exist",
                    index, bad, vertex_count
                )));
            }
            let kind = CellKind::from_vtk_code(code);
            if let Some(corners) = kind.corner_count() {
                if nodes.len() < corners {
                    return Err(VtkError::Inconsistency(format!(
                        "cell {} of type {:?} has {} nodes, expected at least {}",
                        index,
                        kind,
                        nodes.len(),
                        corners
                    )));
                }
            }
            Ok(Cell::new(kind, nodes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor as IoCursor;

    const TETRA_FRAME: &str = "\
# vtk DataFile Version 3.0
FEBio output
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 5 float
0.0 0.0 0.0 1.0 0.0 0.0
0.0 1.0 0.0
0.0 0.0 1.0
1.0 1.0 1.0
CELLS 2 10
4 0 1 2 3
4 1 2 3 4
CELL_TYPES 2
10
10
POINT_DATA 5
SCALARS shell_thickness float 1
LOOKUP_TABLE default
0 0 0 0 0
VECTORS displacement float
0.1 0.0 0.0
0.2 0.0 0.0
0.3 0.0 0.0
0.4 0.0 0.0
0.5 0.0 -0.5
VECTORS velocity float
9 9 9 9 9 9 9 9 9 9 9 9 9 9 9
CELL_DATA 2
SCALARS stress float
LOOKUP_TABLE default
1.0
2.0
";

    fn read(content: &str) -> Result<VolumetricMesh, VtkError> {
        VtkFile::read_from(&mut IoCursor::new(content.as_bytes()))
    }

    #[test]
    fn reads_points_cells_and_first_point_vectors() {
        let mesh = read(TETRA_FRAME).unwrap();

        assert_eq!(mesh.vertex_count(), 5);
        assert_eq!(mesh.vertices[1], Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.vertices[4], Point3::new(1.0, 1.0, 1.0));
        assert_eq!(mesh.cells.len(), 2);
        assert_eq!(mesh.cells[1].kind, CellKind::Tetra);
        assert_eq!(mesh.cells[1].nodes, vec![1, 2, 3, 4]);

        let displacement = mesh.displacement().unwrap();
        assert_eq!(displacement.len(), 5);
        assert_eq!(displacement[4], Vector3::new(0.5, 0.0, -0.5));
    }

    #[test]
    fn written_frames_read_back_bit_identically() {
        let vertices = vec![
            Point3::new(1.0 / 3.0, 0.1 + 0.2, -0.0),
            Point3::new(1e-12, 12345.678901234567, 2.0f64.sqrt()),
            Point3::new(-7.25, 0.5, 1.0 / 7.0),
        ];
        let mesh = VolumetricMesh::new(
            vertices.clone(),
            vec![Cell::new(CellKind::Triangle, vec![0, 1, 2])],
        )
        .with_displacement(vec![Vector3::new(0.0, 1.0 / 9.0, 2.0); 3]);

        let mut buffer = Vec::new();
        VtkFile::write_to(&mesh, &mut buffer).unwrap();
        let back = VtkFile::read_from(&mut IoCursor::new(buffer)).unwrap();

        assert_eq!(back, mesh);
        for (a, b) in back.vertices.iter().zip(&vertices) {
            assert_eq!(a.x.to_bits(), b.x.to_bits());
            assert_eq!(a.y.to_bits(), b.y.to_bits());
        }
    }

    #[test]
    fn frame_without_point_data_has_no_displacement() {
        let content = "\
# vtk DataFile Version 3.0
t
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 1 double
0 0 0
";
        let mesh = read(content).unwrap();
        assert!(mesh.displacement().is_none());
        assert!(mesh.cells.is_empty());
    }

    #[test]
    fn binary_files_are_rejected() {
        let content = "# vtk DataFile Version 3.0\nt\nBINARY\nDATASET UNSTRUCTURED_GRID\n";
        assert!(matches!(read(content), Err(VtkError::Unsupported(_))));
    }

    #[test]
    fn structured_datasets_are_rejected() {
        let content = "# vtk DataFile Version 3.0\nt\nASCII\nDATASET STRUCTURED_POINTS\n";
        assert!(matches!(read(content), Err(VtkError::Unsupported(_))));
    }

    #[test]
    fn bad_float_reports_its_line() {
        let content = "\
# vtk DataFile Version 3.0
t
ASCII
DATASET UNSTRUCTURED_GRID
POINTS 2 float
0 0 0
0 abc 0
";
        match read(content) {
            Err(VtkError::Parse {
                line,
                kind: VtkParseErrorKind::InvalidFloat { value, .. },
            }) => {
                assert_eq!(line, 7);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncated_point_list_is_an_eof_error() {
        let content = "# vtk DataFile Version 3.0\nt\nASCII\nPOINTS 2 float\n0 0 0\n1 1\n";
        assert!(matches!(
            read(content),
            Err(VtkError::Parse {
                kind: VtkParseErrorKind::UnexpectedEof { .. },
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_cell_node_is_inconsistent() {
        let content = "\
# vtk DataFile Version 3.0
t
ASCII
POINTS 3 float
0 0 0 1 0 0 0 1 0
CELLS 1 4
3 0 1 7
CELL_TYPES 1
5
";
        assert!(matches!(read(content), Err(VtkError::Inconsistency(_))));
    }

    #[test]
    fn mismatched_cell_list_size_is_inconsistent() {
        let content = "\
# vtk DataFile Version 3.0
t
ASCII
POINTS 3 float
0 0 0 1 0 0 0 1 0
CELLS 1 5
3 0 1 2
CELL_TYPES 1
5
";
        assert!(matches!(read(content), Err(VtkError::Inconsistency(_))));
    }

    #[test]
    fn missing_header_is_rejected() {
        let content = "not a vtk file\nt\nASCII\n";
        assert!(matches!(
            read(content),
            Err(VtkError::Parse {
                line: 1,
                kind: VtkParseErrorKind::InvalidHeader
            })
        ));
    }

    #[test]
    fn vectors_outside_a_data_section_are_rejected() {
        let content = "\
# vtk DataFile Version 3.0
t
ASCII
POINTS 1 float
0 0 0
VECTORS displacement float
0 0 0
";
        assert!(matches!(
            read(content),
            Err(VtkError::Parse {
                line: 6,
                kind: VtkParseErrorKind::AttributeOutsideSection(_)
            })
        ));
    }
}
