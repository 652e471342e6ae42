//! Pass infrastructure for IR transformations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Pass Pipeline                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  PassScheduler            Per-method fixpoint execution      │
//! │    ├─ PipelineConfig      (iteration limit, parallelism,     │
//! │    │                       enabled passes)                   │
//! │    └─ rayon               Methods processed independently    │
//! │                                                              │
//! │  IrPass trait             Interface for all passes           │
//! │    └─ run_on_method()     Per-method transformation          │
//! │                                                              │
//! │  Passes                                                      │
//! │    ├─ CopyPropagationPass       block-local copy forwarding  │
//! │    └─ DeadCodeEliminationPass   unused pure operators        │
//! │                                                              │
//! │  EventLog                 Change tracking and diagnostics    │
//! │                                                              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Passes consult only the operator queries ([`Operator::can_propagate_copy`],
//! [`Operator::should_not_be_removed`] and the capability bitset), never the concrete kind.
//!
//! [`Operator::can_propagate_copy`]: crate::ir::Operator::can_propagate_copy
//! [`Operator::should_not_be_removed`]: crate::ir::Operator::should_not_be_removed

mod events;
mod pass;
mod passes;
mod scheduler;

pub use events::{Event, EventKind, EventLog};
pub use pass::IrPass;
pub use passes::{CopyPropagationPass, DeadCodeEliminationPass};
pub use scheduler::PassScheduler;
