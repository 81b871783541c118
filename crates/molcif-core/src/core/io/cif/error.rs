use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CifError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: CifParseErrorKind },
    #[error("Parsing was cancelled")]
    Cancelled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CifParseErrorKind {
    #[error("Expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error(
        "Loop starting on line {loop_line} has {value_count} values, which is not a multiple of its {field_count} fields"
    )]
    LoopArity {
        loop_line: usize,
        value_count: usize,
        field_count: usize,
    },
    #[error("Quoted or multiline value is not terminated")]
    UnterminatedValue,
}

impl CifError {
    pub(crate) fn parse(line: usize, kind: CifParseErrorKind) -> Self {
        CifError::Parse { line, kind }
    }

    /// Source line of a parse error.
    pub fn line(&self) -> Option<usize> {
        match self {
            CifError::Parse { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, CifError::Cancelled)
    }
}
