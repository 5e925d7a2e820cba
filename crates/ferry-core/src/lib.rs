//! # ferry-core
//!
//! Core types, traits, and abstractions for the ferry migration engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other ferry crates depend on: the portable data
//! model (schemas, entries, media assets, manifest), the [`ContentStore`]
//! seam the engine consumes store instances through, and the shared error
//! type.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use plan::{FieldSelect, PopulationPlan};
pub use traits::*;
