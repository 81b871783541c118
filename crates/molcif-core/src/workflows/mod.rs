//! # Workflows Module
//!
//! Top-level entry points that tie the `engine` and `core` layers together.
//!
//! - **Parsing** ([`parse`]) - Chunked, cancellable parsing with progress reporting, and
//!   loading of text or binary files
//! - **Conversion** ([`convert`]) - Text and binary serialization with encoding reuse
//! - **Queries** ([`query`]) - Timed evaluation of structure queries over a model

pub mod convert;
pub mod parse;
pub mod query;
