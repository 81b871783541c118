//! Lookup tables that resolve chain and residue identifiers of a model to
//! dense indices.

pub mod atomic_index;
pub mod keys;
pub mod sorted;

pub use atomic_index::{AtomicIndex, IndexError, build_index};
pub use keys::ResidueKey;
