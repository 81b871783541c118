use crate::core::io::binary::EncodeError;
use crate::core::io::cif::CifError;
use crate::core::io::traits::FormatError;
use crate::core::models::model::ModelError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] CifError),

    #[error("Binary encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("Failed to build structure model: {0}")]
    Model(#[from] ModelError),

    #[error("Block '{0}' not found")]
    BlockNotFound(String),
}

impl EngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::Parse(CifError::Cancelled))
    }
}
