//! # molcif Core Library
//!
//! A streaming reader, columnar data model and binary codec for mmCIF
//! macromolecular structure files, with a structure index for resolving
//! chain and residue identifiers.
//!
//! ## Architectural Philosophy
//!
//! The library follows a strict three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`CifFile`, `Model`), the text
//!   tokenizer and category reader, the binary columnar codec and the structure index.
//!
//! - **[`engine`]: The Execution Layer.** Progress reporting, cooperative cancellation of
//!   chunked computations and configuration builders.
//!
//! - **[`workflows`]: The Public API.** Ties `engine` and `core` together: progressive
//!   parsing with cancellation, format conversion and timed structure queries.

pub mod core;
pub mod engine;
pub mod workflows;
