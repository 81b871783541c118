//! # Core Models Module
//!
//! Data structures produced by parsing and consumed by the codec and the index.
//!
//! - [`data`] - The `CifFile` → `Block` → `Category` → `Field` hierarchy
//! - [`field`] - Column storage over source text or decoded arrays
//! - [`atomic`] - Atom, residue and chain tables with their segmentations
//! - [`entities`] - The entity table and its id lookup
//! - [`model`] - A structure assembled from one data block
//! - [`ids`] - Dense index types for atoms, residues, chains and entities

pub mod atomic;
pub mod data;
pub mod entities;
pub mod field;
pub mod ids;
pub mod model;
