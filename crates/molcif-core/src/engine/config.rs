use crate::core::io::binary::EncodingProvider;
use crate::core::io::cif::parser::DEFAULT_CHUNK_SIZE;
use crate::core::io::writer::EncoderOptions;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Tokens processed between progress reports and cancellation checks.
    pub chunk_size: usize,
    /// Reject unterminated quoted and multiline values instead of recovering.
    pub strict: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            strict: false,
        }
    }
}

#[derive(Default)]
pub struct ParserConfigBuilder {
    chunk_size: Option<usize>,
    strict: Option<bool>,
}

impl ParserConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    pub fn build(self) -> Result<ParserConfig, ConfigError> {
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(ParserConfig {
            chunk_size,
            strict: self.strict.unwrap_or(false),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub binary: bool,
    pub encoder_name: String,
    pub auto_classify: bool,
}

impl EncoderConfig {
    pub fn to_options(&self, provider: Option<Arc<dyn EncodingProvider>>) -> EncoderOptions {
        EncoderOptions {
            binary: self.binary,
            encoder_name: self.encoder_name.clone(),
            encoding_provider: provider,
            auto_classify: self.auto_classify,
        }
    }
}

#[derive(Default)]
pub struct EncoderConfigBuilder {
    binary: Option<bool>,
    encoder_name: Option<String>,
    auto_classify: Option<bool>,
}

impl EncoderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = Some(binary);
        self
    }
    pub fn encoder_name(mut self, name: impl Into<String>) -> Self {
        self.encoder_name = Some(name.into());
        self
    }
    pub fn auto_classify(mut self, enabled: bool) -> Self {
        self.auto_classify = Some(enabled);
        self
    }

    /// The output format must be chosen explicitly; everything else has a
    /// default.
    pub fn build(self) -> Result<EncoderConfig, ConfigError> {
        let encoder_name = match self.encoder_name {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::InvalidParameter {
                    name: "encoder_name",
                    reason: "must not be empty".to_string(),
                });
            }
            Some(name) => name,
            None => EncoderOptions::default().encoder_name,
        };
        Ok(EncoderConfig {
            binary: self.binary.ok_or(ConfigError::MissingParameter("binary"))?,
            encoder_name,
            auto_classify: self.auto_classify.unwrap_or(false),
        })
    }
}
