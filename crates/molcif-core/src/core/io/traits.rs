use crate::core::io::binary::{DecodeError, EncodeError, decode};
use crate::core::io::cif::{CifError, parse};
use crate::core::io::writer::{Encoder, EncoderOptions, create_encoder};
use crate::core::models::data::CifFile;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Parse(#[from] CifError),
    #[error("Binary decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Binary encode error: {0}")]
    Encode(#[from] EncodeError),
}

/// Defines the interface for reading and writing one CIF representation.
///
/// Implementors handle format-specific parsing and serialization; the path
/// helpers wrap them with buffered file access.
pub trait CifFormat {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a complete file from a reader.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing fails.
    fn read_from(reader: &mut impl Read) -> Result<CifFile, Self::Error>;

    /// Writes a complete file to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    fn write_to(file: &CifFile, writer: &mut impl Write) -> Result<(), Self::Error>;

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<CifFile, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    fn write_to_path<P: AsRef<Path>>(file: &CifFile, path: P) -> Result<(), Self::Error> {
        let out = File::create(path)?;
        let mut writer = BufWriter::new(out);
        Self::write_to(file, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}

/// The `data_`/`loop_` text format.
pub struct TextCif;

/// The `BCIF` columnar container.
pub struct BinaryCif;

impl CifFormat for TextCif {
    type Error = FormatError;

    fn read_from(reader: &mut impl Read) -> Result<CifFile, Self::Error> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(parse(&text)?)
    }

    fn write_to(file: &CifFile, writer: &mut impl Write) -> Result<(), Self::Error> {
        write_with(file, EncoderOptions::default(), writer)
    }
}

impl CifFormat for BinaryCif {
    type Error = FormatError;

    fn read_from(reader: &mut impl Read) -> Result<CifFile, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(decode(&bytes)?)
    }

    fn write_to(file: &CifFile, writer: &mut impl Write) -> Result<(), Self::Error> {
        let options = EncoderOptions {
            binary: true,
            ..EncoderOptions::default()
        };
        write_with(file, options, writer)
    }
}

/// Encodes `file` with explicit encoder options.
///
/// # Errors
///
/// Returns [`FormatError::Encode`] if a column cannot be encoded and
/// [`FormatError::Io`] if writing fails.
pub fn write_with(
    file: &CifFile,
    options: EncoderOptions,
    writer: &mut impl Write,
) -> Result<(), FormatError> {
    let mut encoder: Box<dyn Encoder> = create_encoder(options);
    encoder.write_file(file)?;
    writer.write_all(&encoder.into_bytes())?;
    Ok(())
}
