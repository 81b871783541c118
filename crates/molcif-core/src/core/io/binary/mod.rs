//! Binary columnar encoding of the category model.
//!
//! Each column is turned into bytes by a chain of invertible stages (delta,
//! run-length, integer packing, fixed point, string tables) and carries the
//! descriptors of that chain, so a reader needs no knowledge of the writer.

pub mod classifier;
pub mod codec;
pub mod column;
pub mod decoder;
pub mod encoding;
pub mod error;
pub mod presets;
pub mod provider;
pub mod wire;

pub use codec::{Stage, decode_array, encode_array};
pub use column::{ColumnPlan, EncodedColumn};
pub use decoder::decode;
pub use encoding::{DataType, EncodedData, Encoding, TypedArray};
pub use error::{DecodeError, EncodeError};
pub use provider::{EncodingHints, EncodingProvider, encoding_provider_from_file};
