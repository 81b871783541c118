//! # Engine Module
//!
//! Execution support shared by the workflows.
//!
//! - **Configuration** ([`config`]) - Parser and encoder settings with validating builders
//! - **Computation** ([`computation`]) - Cooperative cancellation and the step-budgeted task driver
//! - **Progress Monitoring** ([`progress`]) - Progress events delivered through a callback
//! - **Error Handling** ([`error`]) - Errors surfaced by workflow entry points

pub mod computation;
pub mod config;
pub mod error;
pub mod progress;
