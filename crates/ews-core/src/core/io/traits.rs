use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing mesh file formats.
///
/// Implementors handle format-specific parsing and serialization for one mesh
/// representation; path-based helpers are provided on top of the reader/writer methods.
pub trait MeshFile {
    /// The in-memory mesh type this format reads and writes.
    type Mesh;

    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a mesh from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or I/O operations encounter issues.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Mesh, Self::Error>;

    /// Writes a mesh to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_to(mesh: &Self::Mesh, writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads a mesh from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Mesh, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes a mesh to a file path, creating or truncating the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(mesh: &Self::Mesh, path: P) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(mesh, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
