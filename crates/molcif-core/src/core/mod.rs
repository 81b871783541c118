//! # Core Module
//!
//! Stateless building blocks of the library.
//!
//! - **Data Model** ([`models`]) - Blocks, categories and fields, plus the atomic
//!   hierarchy derived from `_atom_site`
//! - **File I/O** ([`io`]) - The text tokenizer and reader, the binary codec and writers
//! - **Structure Index** ([`index`]) - Chain and residue lookup tables built over a model

pub mod index;
pub mod io;
pub mod models;
