//! IR operators.
//!
//! An [`Operator`] is a single IR instruction: a kind tag with its payload ([`OperatorKind`]),
//! a capability bitset, an optional source span, and ordered result ("lhs") and argument
//! ("rhs") operand lists. Results are always variable handles; arguments may be variables or
//! constants.
//!
//! # Construction
//!
//! Operators are only created through the named factories on [`Operator`] (for example
//! [`Operator::binary_op_with_shift`]). Each factory takes exactly the operands and payload the
//! kind needs and stamps the capability bitset as a pure function of the payload. After
//! construction an operator changes only through [`Operator::apply_transformation`] or the
//! operand substitution methods.
//!
//! # Payload schema
//!
//! Every payload struct is declared once with an ordered field list. The same list drives the
//! transformation walk, the clone constructor and the [`FieldDescriptor`] table returned by
//! [`OperatorKind::fields`].
//!
//! # Key Components
//!
//! - [`Operator`]: The instruction node
//! - [`OperatorKind`]: The closed set of kinds, one payload struct per kind
//! - [`OperatorId`]: Method-wide operator identity
//! - [`Payload`]: Schema-driven transformation and cloning of a payload

mod alu;
mod arm;
mod format;
mod generic;

pub use alu::Alu;
pub use arm::{
    BinaryOpWithShift, Breakpoint, GetStatusRegister, IndirectWithIndexUpdate,
    MoveFloatingPointRegisters, MoveIntegerRegisters, MoveStackPointer, MoveToCoprocessor,
    SetStatusRegister, VectorHackCleanup, VectorHackFinalize, VectorHackInitialize,
    VectorHackLoadData, VectorHackMultiplyAndAccumulate, VectorHackPrepare,
};
pub use generic::{DirectCall, SingleAssignment};

use std::fmt;

use strum::IntoStaticStr;

use crate::{
    ir::{
        CloningContext, ContextFrame, DebugInfo, Expression, FieldMut, OperatorCapabilities,
        TransformationContext, VarId,
    },
    Result,
};

/// Method-wide identity of an operator.
///
/// Ids are handed out by the owning [`Method`](crate::ir::Method) and never reused within it.
/// The XML dump uses the numeric value as the operator `Index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperatorId(u32);

impl OperatorId {
    /// Creates an id from its numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name and declared type of one payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The field name, also used as the field name of the transformation walk
    pub name: &'static str,
    /// The declared Rust type, as written in the payload declaration
    pub type_name: &'static str,
}

/// Schema-driven behavior shared by every payload struct.
///
/// Implemented by the payload declaration macro; both methods are generated from the same
/// ordered field list.
pub trait Payload: Sized {
    /// The ordered field schema.
    const FIELDS: &'static [FieldDescriptor];

    /// Hands every field to the context in declared order.
    ///
    /// # Errors
    ///
    /// Propagates visitor errors.
    fn transform_fields(&mut self, ctx: &mut TransformationContext<'_>) -> Result<()>;

    /// Reproduces the payload inside a cloning context.
    ///
    /// # Errors
    ///
    /// Propagates failures of referenced element lookups.
    fn clone_fields(&self, ctx: &mut CloningContext<'_>) -> Result<Self>;
}

operator_kinds! {
    /// The closed set of operator kinds.
    ///
    /// The kind name (see [`Operator::name`]) is the `Type` attribute of the XML dump.
    #[derive(Debug, Clone, PartialEq, IntoStaticStr)]
    pub enum OperatorKind {
        /// Copies one operand into a variable
        SingleAssignment(SingleAssignment),
        /// Calls another method by name
        DirectCall(DirectCall),
        /// ALU operation whose last operand is shifted first
        BinaryOpWithShift(BinaryOpWithShift),
        /// Software breakpoint
        Breakpoint(Breakpoint),
        /// Reads CPSR or SPSR
        GetStatusRegister(GetStatusRegister),
        /// Writes fields of CPSR or SPSR
        SetStatusRegister(SetStatusRegister),
        /// Loads through a base register and writes the updated base back
        #[strum(serialize = "LoadIndirectOperatorWithIndexUpdate")]
        LoadIndirectWithIndexUpdate(IndirectWithIndexUpdate),
        /// Stores through a base register and writes the updated base back
        #[strum(serialize = "StoreIndirectOperatorWithIndexUpdate")]
        StoreIndirectWithIndexUpdate(IndirectWithIndexUpdate),
        /// Loads or stores a set of core registers
        MoveIntegerRegisters(MoveIntegerRegisters),
        /// Loads or stores a range of VFP registers
        MoveFloatingPointRegisters(MoveFloatingPointRegisters),
        /// Pushes or pops the stack pointer
        MoveStackPointer(MoveStackPointer),
        /// Writes a coprocessor register
        MoveToCoprocessor(MoveToCoprocessor),
        /// Sets the VFP vector length
        #[strum(serialize = "VectorHack_Initialize")]
        VectorHackInitialize(VectorHackInitialize),
        /// Clears the accumulator bank
        #[strum(serialize = "VectorHack_Prepare")]
        VectorHackPrepare(VectorHackPrepare),
        /// Loads a register bank from memory
        #[strum(serialize = "VectorHack_LoadData")]
        VectorHackLoadData(VectorHackLoadData),
        /// Multiplies two banks into the accumulator bank
        #[strum(serialize = "VectorHack_MultiplyAndAccumulate")]
        VectorHackMultiplyAndAccumulate(VectorHackMultiplyAndAccumulate),
        /// Reduces the accumulator bank into a result
        #[strum(serialize = "VectorHack_Finalize")]
        VectorHackFinalize(VectorHackFinalize),
        /// Restores the scalar VFP mode
        #[strum(serialize = "VectorHack_Cleanup")]
        VectorHackCleanup(VectorHackCleanup),
    }
}

impl OperatorKind {
    /// Returns `true` for the vector hack family.
    #[must_use]
    pub const fn is_vector_hack(&self) -> bool {
        matches!(
            self,
            Self::VectorHackInitialize(_)
                | Self::VectorHackPrepare(_)
                | Self::VectorHackLoadData(_)
                | Self::VectorHackMultiplyAndAccumulate(_)
                | Self::VectorHackFinalize(_)
                | Self::VectorHackCleanup(_)
        )
    }
}

/// A single IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    id: Option<OperatorId>,
    debug_info: Option<DebugInfo>,
    capabilities: OperatorCapabilities,
    lhs: Vec<VarId>,
    rhs: Vec<Expression>,
    kind: OperatorKind,
}

impl Operator {
    fn from_parts(
        kind: OperatorKind,
        capabilities: OperatorCapabilities,
        lhs: Vec<VarId>,
        rhs: Vec<Expression>,
    ) -> Self {
        debug_assert!(
            capabilities.is_well_formed(),
            "capabilities of {} are not well formed: {}",
            <&'static str>::from(&kind),
            capabilities
        );

        Self {
            id: None,
            debug_info: None,
            capabilities,
            lhs,
            rhs,
            kind,
        }
    }

    /// Attaches a source span.
    #[must_use]
    pub fn with_debug_info(mut self, debug_info: DebugInfo) -> Self {
        self.debug_info = Some(debug_info);
        self
    }

    /// Returns the id, once the operator is owned by a method.
    #[must_use]
    pub fn id(&self) -> Option<OperatorId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: OperatorId) {
        self.id = Some(id);
    }

    /// Returns the kind with its payload.
    #[must_use]
    pub fn kind(&self) -> &OperatorKind {
        &self.kind
    }

    /// Returns the kind name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        (&self.kind).into()
    }

    /// Returns the capability bitset.
    #[must_use]
    pub fn capabilities(&self) -> OperatorCapabilities {
        self.capabilities
    }

    /// Returns the source span, if any.
    #[must_use]
    pub fn debug_info(&self) -> Option<&DebugInfo> {
        self.debug_info.as_ref()
    }

    /// Returns the result operands.
    #[must_use]
    pub fn results(&self) -> &[VarId] {
        &self.lhs
    }

    /// Returns the argument operands.
    #[must_use]
    pub fn arguments(&self) -> &[Expression] {
        &self.rhs
    }

    /// Returns the first result operand.
    #[must_use]
    pub fn first_result(&self) -> Option<VarId> {
        self.lhs.first().copied()
    }

    /// Returns the first argument operand.
    #[must_use]
    pub fn first_argument(&self) -> Option<&Expression> {
        self.rhs.first()
    }

    /// Returns `true` if the arguments may be reordered.
    #[must_use]
    pub fn is_commutative(&self) -> bool {
        self.capabilities.is_commutative()
    }

    /// Returns `true` if the operator may raise an exception.
    #[must_use]
    pub fn may_throw(&self) -> bool {
        self.capabilities.may_throw()
    }

    /// Returns `true` if the operator may modify pre-existing storage.
    #[must_use]
    pub fn may_mutate_existing_storage(&self) -> bool {
        self.capabilities.may_mutate_existing_storage()
    }

    /// Returns `true` for an indirect load or store created as volatile.
    ///
    /// Volatility is recorded solely in the mutate-existing-storage facet.
    #[must_use]
    pub fn is_volatile(&self) -> bool {
        matches!(
            self.kind,
            OperatorKind::LoadIndirectWithIndexUpdate(_)
                | OperatorKind::StoreIndirectWithIndexUpdate(_)
        ) && self.capabilities.may_mutate_existing_storage()
    }

    /// Returns the called method name of a [`DirectCall`].
    #[must_use]
    pub fn call_target(&self) -> Option<&str> {
        match &self.kind {
            OperatorKind::DirectCall(call) => Some(call.target_name()),
            _ => None,
        }
    }

    /// Returns `true` if the operator must stay even when its results are unused.
    #[must_use]
    pub fn should_not_be_removed(&self) -> bool {
        match &self.kind {
            OperatorKind::Breakpoint(_)
            | OperatorKind::SetStatusRegister(_)
            | OperatorKind::MoveIntegerRegisters(_)
            | OperatorKind::MoveFloatingPointRegisters(_)
            | OperatorKind::MoveStackPointer(_)
            | OperatorKind::MoveToCoprocessor(_) => true,
            kind => kind.is_vector_hack(),
        }
    }

    /// Returns `true` if `new` may replace `old` in the argument slots of this operator.
    ///
    /// Kinds whose encoding needs a materialized register reject constants; register bank
    /// moves, stack pointer moves and the vector hacks reject any replacement. The query never
    /// fails and has no side effects.
    #[must_use]
    pub fn can_propagate_copy(&self, _old: &Expression, new: &Expression) -> bool {
        match &self.kind {
            OperatorKind::Breakpoint(_) | OperatorKind::MoveToCoprocessor(_) => !new.is_constant(),
            OperatorKind::MoveIntegerRegisters(_)
            | OperatorKind::MoveFloatingPointRegisters(_)
            | OperatorKind::MoveStackPointer(_) => false,
            kind => !kind.is_vector_hack(),
        }
    }

    /// Returns `true` if the operator defines `var`.
    #[must_use]
    pub fn is_source_of(&self, var: VarId) -> bool {
        self.lhs.contains(&var)
    }

    /// Returns `true` if the operator reads `var`.
    #[must_use]
    pub fn uses(&self, var: VarId) -> bool {
        self.rhs.iter().any(|e| e.refers_to(var))
    }

    /// Replaces every argument slot reading `old` with `new`.
    ///
    /// # Returns
    ///
    /// The number of slots replaced.
    pub fn substitute_usage(&mut self, old: VarId, new: &Expression) -> usize {
        let mut count = 0;
        for arg in &mut self.rhs {
            if arg.refers_to(old) {
                *arg = new.clone();
                count += 1;
            }
        }
        count
    }

    /// Replaces every result slot writing `old` with `new`.
    ///
    /// # Returns
    ///
    /// The number of slots replaced.
    pub fn substitute_definition(&mut self, old: VarId, new: VarId) -> usize {
        let mut count = 0;
        for res in &mut self.lhs {
            if *res == old {
                *res = new;
                count += 1;
            }
        }
        count
    }

    /// Walks every field of the operator through the context.
    ///
    /// The operator frame is pushed first; then the shared fields are visited
    /// (`debug_info`, `capabilities`, `lhs`, `rhs`), then the payload fields in declared order.
    /// The frame is popped when the walk returns, including on error.
    ///
    /// # Errors
    ///
    /// Propagates visitor errors.
    pub fn apply_transformation(&mut self, ctx: &mut TransformationContext<'_>) -> Result<()> {
        let mut scope = ctx.push(ContextFrame::Operator {
            kind: self.name(),
            id: self.id,
        });

        scope.transform("debug_info", FieldMut::DebugInfo(&mut self.debug_info))?;
        scope.transform("capabilities", FieldMut::Capabilities(&mut self.capabilities))?;
        scope.transform("lhs", FieldMut::Results(&mut self.lhs))?;
        scope.transform("rhs", FieldMut::Arguments(&mut self.rhs))?;

        self.kind.transform_payload(&mut scope)
    }

    /// Clones the operator inside a cloning context.
    ///
    /// Operands are remapped through the context so that operators sharing a variable keep
    /// sharing its clone; type metadata in the payload is converted into the target universe.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for operands outside the source table.
    pub fn clone_in(&self, ctx: &mut CloningContext<'_>) -> Result<Operator> {
        let kind = self.kind.clone_payload(ctx)?;
        self.register_and_clone_state(ctx, kind)
    }

    fn register_and_clone_state(
        &self,
        ctx: &mut CloningContext<'_>,
        kind: OperatorKind,
    ) -> Result<Operator> {
        let id = self.id.map(|old| ctx.register_operator(old));

        let lhs = self
            .lhs
            .iter()
            .map(|v| ctx.clone_variable(*v))
            .collect::<Result<Vec<_>>>()?;
        let rhs = self
            .rhs
            .iter()
            .map(|e| ctx.clone_expression(e))
            .collect::<Result<Vec<_>>>()?;

        Ok(Operator {
            id,
            debug_info: self.debug_info.clone(),
            capabilities: self.capabilities,
            lhs,
            rhs,
            kind,
        })
    }
}
