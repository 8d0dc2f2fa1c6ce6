use crate::core::models::displacement::DisplacementField;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;
const DESCR: &str = "<f8";

static SHAPE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'shape':\s*\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*,?\s*\)")
        .expect("shape pattern is a valid regex")
});
static DESCR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'descr':\s*'([^']*)'").expect("descr pattern is a valid regex")
});
static ORDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"'fortran_order':\s*(True|False)").expect("order pattern is a valid regex")
});

#[derive(Debug, Error)]
pub enum NpyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Not a NumPy array file (bad magic string)")]
    InvalidMagic,
    #[error("Unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),
    #[error("Invalid array header: {0}")]
    InvalidHeader(String),
    #[error("Unsupported array layout: {0}")]
    UnsupportedLayout(String),
}

/// NumPy `.npy` persistence of a [`DisplacementField`].
///
/// Files are written in format version 1.0 as a C-ordered little-endian `float64` array of
/// shape `(frames, vertices, 3)`, readable with `numpy.load` on the renderer side.
pub struct NpyFile;

impl NpyFile {
    pub fn write_to(field: &DisplacementField, writer: &mut impl Write) -> Result<(), NpyError> {
        let [frames, vertices, axes] = field.shape();
        let dict = format!(
            "{{'descr': '{}', 'fortran_order': False, 'shape': ({}, {}, {}), }}",
            DESCR, frames, vertices, axes
        );
        // magic + version + u16 length + dict + trailing newline
        let unpadded = MAGIC.len() + 2 + 2 + dict.len() + 1;
        let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
        let header_len = dict.len() + padding + 1;
        let header_len = u16::try_from(header_len)
            .map_err(|_| NpyError::InvalidHeader("header exceeds 65535 bytes".into()))?;

        writer.write_all(MAGIC)?;
        writer.write_all(&[1, 0])?;
        writer.write_all(&header_len.to_le_bytes())?;
        writer.write_all(dict.as_bytes())?;
        writer.write_all(" ".repeat(padding).as_bytes())?;
        writer.write_all(b"\n")?;
        for value in field.as_slice() {
            writer.write_all(&value.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn read_from(reader: &mut impl Read) -> Result<DisplacementField, NpyError> {
        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(NpyError::InvalidMagic);
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version)?;
        let header_len = match version {
            [1, 0] => {
                let mut len = [0u8; 2];
                reader.read_exact(&mut len)?;
                u16::from_le_bytes(len) as usize
            }
            [2, 0] | [3, 0] => {
                let mut len = [0u8; 4];
                reader.read_exact(&mut len)?;
                u32::from_le_bytes(len) as usize
            }
            [major, minor] => return Err(NpyError::UnsupportedVersion(major, minor)),
        };

        let mut header = vec![0u8; header_len];
        reader.read_exact(&mut header)?;
        let header = String::from_utf8_lossy(&header);
        let [frames, vertices] = parse_header(&header)?;

        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        let expected = frames * vertices * 3 * 8;
        if bytes.len() != expected {
            return Err(NpyError::InvalidHeader(format!(
                "expected {} data bytes, found {}",
                expected,
                bytes.len()
            )));
        }
        let data = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(chunk);
                f64::from_le_bytes(raw)
            })
            .collect();

        DisplacementField::from_parts(frames, vertices, data)
            .ok_or_else(|| NpyError::InvalidHeader("shape does not match data".into()))
    }

    pub fn write_to_path<P: AsRef<Path>>(
        field: &DisplacementField,
        path: P,
    ) -> Result<(), NpyError> {
        let mut writer = BufWriter::new(File::create(path)?);
        Self::write_to(field, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<DisplacementField, NpyError> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader)
    }
}

fn parse_header(header: &str) -> Result<[usize; 2], NpyError> {
    let descr = DESCR_PATTERN
        .captures(header)
        .ok_or_else(|| NpyError::InvalidHeader("missing 'descr'".into()))?;
    if &descr[1] != DESCR {
        return Err(NpyError::UnsupportedLayout(format!("dtype '{}'", &descr[1])));
    }

    let order = ORDER_PATTERN
        .captures(header)
        .ok_or_else(|| NpyError::InvalidHeader("missing 'fortran_order'".into()))?;
    if &order[1] == "True" {
        return Err(NpyError::UnsupportedLayout("Fortran order".into()));
    }

    let shape = SHAPE_PATTERN.captures(header).ok_or_else(|| {
        NpyError::UnsupportedLayout("shape is not a (frames, vertices, 3) tuple".into())
    })?;
    let dim = |i: usize| -> Result<usize, NpyError> {
        shape[i]
            .parse()
            .map_err(|_| NpyError::InvalidHeader(format!("bad dimension '{}'", &shape[i])))
    };
    let (frames, vertices, axes) = (dim(1)?, dim(2)?, dim(3)?);
    if axes != 3 {
        return Err(NpyError::UnsupportedLayout(format!(
            "last dimension is {}, expected 3",
            axes
        )));
    }
    Ok([frames, vertices])
}
