//! Writers for the text and binary representations.

pub mod binary;
pub mod text;

use crate::core::io::binary::{EncodeError, EncodingProvider};
use crate::core::models::data::{Category, CifFile};
use std::sync::Arc;

pub use binary::BinaryEncoder;
pub use text::TextEncoder;

/// Accumulates blocks and categories and serializes them on [`Encoder::into_bytes`].
pub trait Encoder {
    fn start_block(&mut self, header: &str);

    /// Appends a category to the current block, opening an unnamed block if
    /// none was started.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if a column cannot be encoded with any plan.
    fn write_category(&mut self, category: &Category) -> Result<(), EncodeError>;

    fn into_bytes(self: Box<Self>) -> Vec<u8>;

    fn write_file(&mut self, file: &CifFile) -> Result<(), EncodeError> {
        for block in &file.blocks {
            self.start_block(&block.header);
            for category in block.categories() {
                self.write_category(category)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct EncoderOptions {
    pub binary: bool,
    /// Recorded in binary output.
    pub encoder_name: String,
    pub encoding_provider: Option<Arc<dyn EncodingProvider>>,
    pub auto_classify: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            binary: false,
            encoder_name: concat!("molcif ", env!("CARGO_PKG_VERSION")).to_string(),
            encoding_provider: None,
            auto_classify: false,
        }
    }
}

impl std::fmt::Debug for EncoderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncoderOptions")
            .field("binary", &self.binary)
            .field("encoder_name", &self.encoder_name)
            .field("encoding_provider", &self.encoding_provider.is_some())
            .field("auto_classify", &self.auto_classify)
            .finish()
    }
}

pub fn create_encoder(options: EncoderOptions) -> Box<dyn Encoder> {
    if options.binary {
        Box::new(BinaryEncoder::new(options))
    } else {
        Box::new(TextEncoder::new())
    }
}
