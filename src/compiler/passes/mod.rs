//! Built-in IR passes.
//!
//! - [`CopyPropagationPass`]: Block-local copy propagation
//! - [`DeadCodeEliminationPass`]: Removal of unused, side-effect free operators

mod copying;
mod deadcode;

pub use copying::CopyPropagationPass;
pub use deadcode::DeadCodeEliminationPass;
