//! Reader for the CIF text format.
//!
//! The [`tokenizer`] splits the source into offset-based tokens, the reader
//! assembles single-row and `loop_` categories from them, and the [`parser`]
//! drives both in resumable, bounded steps.

pub mod error;
pub mod parser;
pub(crate) mod reader;
pub mod tokenizer;

pub use error::{CifError, CifParseErrorKind};
pub use parser::{CifParser, ParseStep, parse};
