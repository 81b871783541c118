use super::column::decode_column;
use super::error::DecodeError;
use super::wire::{EncodedFile, read_file};
use crate::core::models::data::{Block, Category, CifFile};
use tracing::debug;

/// Decodes a binary file into the same model the text parser produces.
///
/// # Errors
///
/// Returns [`DecodeError`] for a bad container, an unknown encoding or a
/// column whose length disagrees with its category.
pub fn decode(bytes: &[u8]) -> Result<CifFile, DecodeError> {
    let encoded = read_file(bytes)?;
    debug!(encoder = %encoded.encoder, blocks = encoded.blocks.len(), "Decoding binary file");
    decode_encoded(&encoded)
}

pub fn decode_encoded(encoded: &EncodedFile) -> Result<CifFile, DecodeError> {
    let mut blocks = Vec::with_capacity(encoded.blocks.len());
    for encoded_block in &encoded.blocks {
        let mut block = Block::new(encoded_block.header.as_str());
        for encoded_category in &encoded_block.categories {
            let mut category = Category::new(
                encoded_category.name.as_str(),
                encoded_category.row_count,
            );
            for column in &encoded_category.columns {
                let field = decode_column(column, encoded_category.row_count)?;
                category.push_field(column.name.clone(), field);
            }
            block.insert_category(category);
        }
        blocks.push(block);
    }
    Ok(CifFile::new(blocks))
}
