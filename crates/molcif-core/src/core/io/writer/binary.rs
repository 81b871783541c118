use super::{Encoder, EncoderOptions};
use crate::core::io::binary::classifier::{classify, default_plan, plan_fits};
use crate::core::io::binary::column::{ColumnPlan, EncodedColumn, encode_column};
use crate::core::io::binary::error::EncodeError;
use crate::core::io::binary::wire::{EncodedBlock, EncodedCategory, EncodedFile, write_file};
use crate::core::models::data::Category;
use crate::core::models::field::Field;
use tracing::{trace, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Collects categories as encoded columns and writes the binary container.
pub struct BinaryEncoder {
    options: EncoderOptions,
    blocks: Vec<EncodedBlock>,
}

impl BinaryEncoder {
    pub fn new(options: EncoderOptions) -> Self {
        Self {
            options,
            blocks: Vec::new(),
        }
    }

    /// Plan precedence: provider, then auto-classification, then plain defaults.
    fn plan_for(&self, category: &str, name: &str, field: &Field) -> ColumnPlan {
        if let Some(provider) = &self.options.encoding_provider {
            if let Some(plan) = provider.plan(category, name) {
                if plan_fits(field, &plan) {
                    return plan;
                }
                warn!(
                    column = %format!("{category}.{name}"),
                    ?plan,
                    "Provided encoding does not fit the column values; falling back"
                );
            }
        }
        if self.options.auto_classify {
            classify(field)
        } else {
            default_plan(field)
        }
    }

    fn encode_field(&self, category: &str, name: &str, field: &Field) -> Result<EncodedColumn, EncodeError> {
        let plan = self.plan_for(category, name, field);
        encode_column(name, field, &plan).or_else(|err| {
            warn!(column = %format!("{category}.{name}"), %err, "Encoding failed; using the default plan");
            encode_column(name, field, &default_plan(field))
        })
    }
}

impl Encoder for BinaryEncoder {
    fn start_block(&mut self, header: &str) {
        self.blocks.push(EncodedBlock {
            header: header.to_string(),
            categories: Vec::new(),
        });
    }

    fn write_category(&mut self, category: &Category) -> Result<(), EncodeError> {
        if self.blocks.is_empty() {
            self.start_block("");
        }

        let fields: Vec<(&str, &Field)> = category.fields().collect();

        #[cfg(not(feature = "parallel"))]
        let iterator = fields.iter();

        #[cfg(feature = "parallel")]
        let iterator = fields.par_iter();

        let columns = iterator
            .map(|(name, field)| self.encode_field(&category.name, name, field))
            .collect::<Result<Vec<EncodedColumn>, EncodeError>>()?;

        trace!(category = %category.name, columns = columns.len(), "Encoded category");
        if let Some(block) = self.blocks.last_mut() {
            block.categories.push(EncodedCategory {
                name: category.name.clone(),
                row_count: category.row_count(),
                columns,
            });
        }
        Ok(())
    }

    fn into_bytes(self: Box<Self>) -> Vec<u8> {
        write_file(&EncodedFile {
            encoder: self.options.encoder_name,
            blocks: self.blocks,
        })
    }
}
