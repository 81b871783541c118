//! Reading and writing the text and binary CIF representations.
//!
//! Both formats produce and consume the same [`CifFile`](crate::core::models::data::CifFile)
//! model. [`traits::CifFormat`] gives them a common file-based API.

pub mod binary;
pub mod cif;
pub mod traits;
pub mod writer;
