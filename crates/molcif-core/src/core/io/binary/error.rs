use super::encoding::DataType;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Input does not start with the binary CIF magic bytes")]
    InvalidMagic,
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Malformed variable-length integer")]
    MalformedVarint,
    #[error("Unknown encoding tag {0}")]
    UnknownEncoding(u8),
    #[error("Unknown data type code {0}")]
    UnknownDataType(u8),
    #[error("Encoding '{encoding}' cannot be applied to {found}")]
    TypeMismatch {
        encoding: &'static str,
        found: &'static str,
    },
    #[error("String data is not valid UTF-8")]
    InvalidUtf8,
    #[error("Expected {expected} elements, found {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("Declared size {size} exceeds the limit of {limit} elements")]
    SizeLimit { size: usize, limit: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Stage '{stage}' cannot encode {data_type:?} data")]
    TypeMismatch {
        stage: &'static str,
        data_type: DataType,
    },
    #[error("Stage '{stage}' cannot represent the value in row {row}")]
    OutOfRange { stage: &'static str, row: usize },
}
