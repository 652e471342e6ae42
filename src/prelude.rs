//! # armir Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the armir library. Import this module to get quick access to the essential
//! types for building, transforming and dumping IR methods.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all armir operations
pub use crate::Error;

/// The result type used throughout armir
pub use crate::Result;

/// Configuration for the pass pipeline and the dump parser
pub use crate::{ParserConfig, PipelineConfig};

// ================================================================================================
// Operand Model
// ================================================================================================

/// Variables, constants and types
pub use crate::ir::{
    ConstValue, ConstantExpression, Expression, FieldPath, FieldRef, RegisterClass,
    RegisterDescriptor, TypeRef, VarId, VariableExpression, VariableKind,
};

/// Source spans
pub use crate::ir::DebugInfo;

// ================================================================================================
// Operators
// ================================================================================================

/// The instruction node and its kinds
pub use crate::ir::{Alu, Operator, OperatorCapabilities, OperatorId, OperatorKind};

// ================================================================================================
// Methods and Graph
// ================================================================================================

/// Method bodies, blocks and edges
pub use crate::ir::{BasicBlock, BasicBlockEdge, BasicBlockKind, BlockId, EdgeKind, Method};

// ================================================================================================
// Transformation and Cloning
// ================================================================================================

/// Field-walk protocol and stock visitors
pub use crate::ir::{
    ContextFrame, FieldMut, FieldTrace, FieldVisitor, TransformationContext, TypeSubstitution,
    VariableRenamer,
};

/// Deep copies with type remapping
pub use crate::ir::{CloningContext, IdentityConverter, TypeConverter, TypeMap};

// ================================================================================================
// Dumping and Viewing
// ================================================================================================

/// Text and XML dumpers
pub use crate::ir::{IrDumper, PlainDumper, TextDumper, XmlDumper};

/// Parsing of XML dumps
pub use crate::viewer::{Document, ParseOutcome, Parser};

// ================================================================================================
// Analyses and Passes
// ================================================================================================

/// Dataflow analyses
pub use crate::analysis::ReachingDefinitions;

/// Pass infrastructure
pub use crate::compiler::{EventLog, IrPass, PassScheduler};
