//! The ARM intermediate representation.
//!
//! The IR is a graph of [`Method`]s, each owning a variable table, ordered basic blocks of
//! [`Operator`]s and the edges between the blocks. Every operator can be walked field by field
//! through a [`TransformationContext`] and deep-copied through a [`CloningContext`].
//!
//! # Architecture
//!
//! - [`expression`](self) level: variable handles ([`VarId`]), constants and types
//! - [`Operator`]: one instruction with a capability bitset and a typed payload
//! - [`Method`]: ownership root for variables, blocks, operators and edges
//! - [`IrDumper`]: the text formatting seam, with [`XmlDumper`] writing full dumps
//!
//! # Usage
//!
//! ```rust
//! use armir::ir::{BasicBlockKind, Method, Operator, TypeRef};
//!
//! let mut method = Method::new("Sample::Get");
//! let flags = method.add_local("flags", TypeRef::new("System.UInt32"));
//! let entry = method.add_block(BasicBlockKind::Entry);
//! method.append_operator(entry, Operator::get_status_register(false, flags))?;
//! assert_eq!(method.operator_count(), 1);
//! # Ok::<(), armir::Error>(())
//! ```

mod capabilities;
mod cloning;
mod debuginfo;
mod dumper;
mod expression;
mod method;
mod operator;
mod transform;
mod xml;

pub use capabilities::OperatorCapabilities;
pub use cloning::{CloneField, CloningContext, IdentityConverter, TypeConverter, TypeMap};
pub use debuginfo::DebugInfo;
pub use dumper::{FormatArg, HandleDumper, IrDumper, PlainDumper, TextDumper};
pub use expression::{
    ConstValue, ConstantExpression, Expression, FieldPath, FieldRef, RegisterClass,
    RegisterDescriptor, TypeRef, VarId, VariableExpression, VariableKind, VariableTable,
};
pub use method::{BasicBlock, BasicBlockEdge, BasicBlockKind, BlockId, EdgeKind, Method};
pub use operator::{
    Alu, BinaryOpWithShift, Breakpoint, DirectCall, FieldDescriptor, GetStatusRegister,
    IndirectWithIndexUpdate, MoveFloatingPointRegisters, MoveIntegerRegisters, MoveStackPointer,
    MoveToCoprocessor, Operator, OperatorId, OperatorKind, Payload, SetStatusRegister,
    SingleAssignment, VectorHackCleanup, VectorHackFinalize, VectorHackInitialize,
    VectorHackLoadData, VectorHackMultiplyAndAccumulate, VectorHackPrepare,
};
pub use transform::{
    ContextFrame, ContextScope, FieldMut, FieldTrace, FieldVisitor, TraceEntry, TransformField,
    TransformationContext, TypeSubstitution, VariableRenamer,
};
pub use xml::XmlDumper;
