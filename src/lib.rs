// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::too_many_arguments)]

//! # armir
//!
//! A typed, mutable, graph-structured intermediate representation for compiled method bodies
//! targeting ARM, together with the machinery that lets independent compiler passes rewrite it.
//!
//! ## Features
//!
//! - **🧱 Flat operator catalog** - ARM low-level operators (shift-combined ALU ops, status register
//!   access, indirect load/store with index update, register bank moves, coprocessor moves and the
//!   vector "hack" family) modelled as one tagged enum with exhaustive dispatch
//! - **🚦 Capability bitsets** - every operator declares its side-effect envelope so optimizers can
//!   decide rewrite legality without per-operator special cases
//! - **🔁 Transformation protocol** - a field-by-field walk driven by a single declarative payload
//!   schema, with scope-guarded context push/pop
//! - **🧬 Cloning contexts** - whole-method and cross-method cloning that preserves operand sharing
//! - **📄 IR dumps** - text and XML dumpers plus a two-pass parser for the XML dump format
//! - **⚡ Parallel pipelines** - passes run per method, with independent methods spread over a
//!   thread pool
//!
//! ## Quick Start
//!
//! ```rust
//! use armir::prelude::*;
//!
//! let mut method = Method::new("Sample::Add");
//! let int = TypeRef::new("System.Int32");
//! let a = method.add_local("a", int.clone());
//! let b = method.add_local("b", int.clone());
//! let c = method.add_local("c", int.clone());
//!
//! let entry = method.add_block(BasicBlockKind::Entry);
//! let exit = method.add_block(BasicBlockKind::Exit);
//! method.add_edge(entry, exit, EdgeKind::Unconditional)?;
//!
//! let op = Operator::binary_op_with_shift(
//!     Alu::Add, true, Alu::Shl, false, c, a.into(), b.into(),
//!     Expression::constant(int, ConstValue::I32(2)),
//! );
//! method.append_operator(entry, op)?;
//!
//! let clone = method.clone_method(&IdentityConverter)?;
//! assert_eq!(clone.blocks().len(), 2);
//! # Ok::<(), armir::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - Operands, operators, capabilities, the transformation and cloning protocol, methods
//!   and dumpers
//! - [`analysis`] - Dataflow analyses over a [`ir::Method`]
//! - [`compiler`] - Optimization passes and the pass scheduler
//! - [`viewer`] - The read-only model reconstructed from an XML dump, and its parser
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`]. Legality and capability queries on operators
//! are pure and never fail.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use armir::prelude::*;
///
/// let method = Method::new("Empty");
/// assert!(method.blocks().is_empty());
/// ```
pub mod prelude;

/// Pipeline and parser configuration.
pub mod config;

/// The intermediate representation.
///
/// This module contains the operand model, the operator catalog with its capability system,
/// the transformation and cloning protocol, the method graph and the IR dumpers.
///
/// # Key Types
///
/// - [`ir::Operator`] - A single IR instruction
/// - [`ir::OperatorCapabilities`] - Side-effect envelope of an operator
/// - [`ir::TransformationContext`] - Context threaded through a field walk
/// - [`ir::CloningContext`] - Old-to-new identity map of a clone operation
/// - [`ir::Method`] - Basic blocks, edges and the variable table of one method
pub mod ir;

/// Dataflow analyses over methods.
pub mod analysis;

/// Optimization passes consuming the capability system.
pub mod compiler;

/// Parsed model of XML IR dumps for navigation tools.
pub mod viewer;

/// `armir` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `armir` Error type
///
/// # Examples
///
/// ```rust
/// use armir::{prelude::*, Error};
///
/// let constant = Expression::constant(TypeRef::new("System.Int32"), ConstValue::I32(1));
/// match constant.as_variable() {
///     Err(Error::ConstantResult(text)) => println!("rejected {}", text),
///     other => panic!("unexpected {:?}", other),
/// }
/// ```
pub use error::Error;

pub use config::{ParserConfig, PipelineConfig};
