//! The interface implemented by every IR pass.

use crate::{compiler::EventLog, ir::Method, Result};

/// A transformation over one method at a time.
///
/// Passes are shared across the rayon thread pool, so they hold no per-method state; anything
/// a pass learns about a method lives in locals of [`IrPass::run_on_method`].
pub trait IrPass: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// One-line summary of what the pass does.
    fn description(&self) -> &'static str {
        ""
    }

    /// Transforms `method` in place.
    ///
    /// # Returns
    ///
    /// `true` if the method changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the method is found in an inconsistent state.
    fn run_on_method(&self, method: &mut Method, events: &mut EventLog) -> Result<bool>;
}
