//! Dataflow analyses over IR methods.
//!
//! Analyses are read-only: they take a [`Method`](crate::ir::Method) by reference and
//! produce an immutable result that dumpers and passes query.
//!
//! # Analyses Provided
//!
//! - [`ReachingDefinitions`]: Which definitions may reach the entry of each basic block

mod reaching;

pub use reaching::{Definition, ReachingDefinitions};
