//! ARM low-level operators.
//!
//! These operators appear after lowering to the ARM target. Most of them map to one machine
//! instruction (or a short fixed sequence) and carry the encoding-relevant immediates in their
//! payload. Their capability sets are fixed per kind, with two payload-driven exceptions:
//! the commutativity of [`BinaryOpWithShift`] follows its ALU code, and the volatility of the
//! indirect accesses flips the mutate-existing-storage facet.

use crate::ir::{
    Alu, Expression, FieldPath, Operator, OperatorCapabilities as Caps, OperatorKind,
    RegisterDescriptor, TypeRef, VarId,
};

operator_payload! {
    /// Payload of [`Operator::binary_op_with_shift`].
    pub struct BinaryOpWithShift {
        /// The main ALU operation
        alu: Alu,
        /// Whether the main operation is signed
        signed: bool,
        /// The shift applied to the second operand
        shift_alu: Alu,
        /// Whether the shift is arithmetic
        shift_signed: bool,
    }
}

operator_payload! {
    /// Payload of [`Operator::breakpoint`].
    pub struct Breakpoint {
        /// The immediate encoded into `BKPT`
        value: u32,
    }
}

operator_payload! {
    /// Payload of [`Operator::get_status_register`].
    pub struct GetStatusRegister {
        /// Read SPSR instead of CPSR
        use_spsr: bool,
    }
}

operator_payload! {
    /// Payload of [`Operator::set_status_register`].
    pub struct SetStatusRegister {
        /// Write SPSR instead of CPSR
        use_spsr: bool,
        /// The `MSR` field mask (c, x, s, f)
        fields: u32,
    }
}

operator_payload! {
    /// Payload shared by the indirect loads and stores with base register update.
    pub struct IndirectWithIndexUpdate {
        /// The type of the accessed value
        ty: TypeRef,
        /// Fields walked from the pointed-to value to the accessed one
        access_path: FieldPath,
        /// Constant offset added to the base for the access
        offset: i32,
        /// Update the base after the access instead of before it
        post_update: bool,
    }
}

operator_payload! {
    /// Payload of [`Operator::move_integer_registers`].
    pub struct MoveIntegerRegisters {
        /// `LDM` when set, `STM` otherwise
        load: bool,
        /// Include the registers computed by register allocation in the mask
        add_computed_registers: bool,
        /// Copy SPSR into CPSR as part of the load
        restore_spsr: bool,
        /// Bit `n` selects register `Rn`
        register_mask: u32,
    }
}

operator_payload! {
    /// Payload of [`Operator::move_floating_point_registers`].
    pub struct MoveFloatingPointRegisters {
        /// `FLDM` when set, `FSTM` otherwise
        load: bool,
        /// Include the registers computed by register allocation in the range
        add_computed_registers: bool,
        /// First register of the range
        first_register: RegisterDescriptor,
        /// Number of registers in the range
        register_count: u32,
    }
}

operator_payload! {
    /// Payload of [`Operator::move_stack_pointer`].
    pub struct MoveStackPointer {
        /// Push when set, pop otherwise
        push: bool,
    }
}

operator_payload! {
    /// Payload of [`Operator::move_to_coprocessor`].
    pub struct MoveToCoprocessor {
        /// Coprocessor number
        cp_num: u32,
        /// First opcode
        op1: u32,
        /// Destination coprocessor register
        crn: u32,
        /// Additional coprocessor register
        crm: u32,
        /// Second opcode
        op2: u32,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_initialize`].
    pub struct VectorHackInitialize {
        /// Vector length
        size: u32,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_prepare`].
    pub struct VectorHackPrepare {
        /// Vector length
        size: u32,
        /// First register of the accumulator bank
        result_bank_base: RegisterDescriptor,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_load_data`].
    pub struct VectorHackLoadData {
        /// Vector length
        size: u32,
        /// First register of the loaded bank
        destination_bank_base: RegisterDescriptor,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_multiply_and_accumulate`].
    pub struct VectorHackMultiplyAndAccumulate {
        /// Vector length
        size: u32,
        /// First register of the left operand bank
        left_bank_base: RegisterDescriptor,
        /// First register of the right operand bank
        right_bank_base: RegisterDescriptor,
        /// First register of the accumulator bank
        result_bank_base: RegisterDescriptor,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_finalize`].
    pub struct VectorHackFinalize {
        /// Vector length
        size: u32,
        /// First register of the accumulator bank
        result_bank_base: RegisterDescriptor,
    }
}

operator_payload! {
    /// Payload of [`Operator::vector_hack_cleanup`].
    pub struct VectorHackCleanup {
        /// Vector length
        size: u32,
    }
}

/// Facets shared by every ARM low-level operator that touches machine state directly.
const MACHINE_STATE: Caps = Caps::IS_NON_COMMUTATIVE
    .union(Caps::MAY_MUTATE_EXISTING_STORAGE)
    .union(Caps::DOES_NOT_ALLOCATE_STORAGE)
    .union(Caps::DOES_NOT_THROW)
    .union(Caps::DOES_NOT_CAPTURE_POINTER_OPERANDS);

const NO_POINTER_ACCESS: Caps = Caps::DOES_NOT_READ_THROUGH_POINTER_OPERANDS
    .union(Caps::DOES_NOT_WRITE_THROUGH_POINTER_OPERANDS);

const BANK_TRANSFER: Caps =
    Caps::MAY_READ_THROUGH_POINTER_OPERANDS.union(Caps::MAY_WRITE_THROUGH_POINTER_OPERANDS);

fn indirect_capabilities(volatile: bool, load: bool) -> Caps {
    let mutate = if volatile {
        Caps::MAY_MUTATE_EXISTING_STORAGE
    } else {
        Caps::DOES_NOT_MUTATE_EXISTING_STORAGE
    };

    let access = if load {
        Caps::MAY_READ_EXISTING_MUTABLE_STORAGE
            | Caps::MAY_READ_THROUGH_POINTER_OPERANDS
            | Caps::DOES_NOT_WRITE_THROUGH_POINTER_OPERANDS
    } else {
        Caps::DOES_NOT_READ_EXISTING_MUTABLE_STORAGE
            | Caps::DOES_NOT_READ_THROUGH_POINTER_OPERANDS
            | Caps::MAY_WRITE_THROUGH_POINTER_OPERANDS
    };

    Caps::IS_NON_COMMUTATIVE
        | Caps::DOES_NOT_ALLOCATE_STORAGE
        | Caps::MAY_THROW
        | Caps::DOES_NOT_CAPTURE_POINTER_OPERANDS
        | mutate
        | access
}

impl Operator {
    /// Creates `result = left alu (right shift_alu shift)`.
    ///
    /// The operator is commutative exactly when `alu` is one of ADD, MUL, AND, OR or XOR.
    ///
    /// # Arguments
    ///
    /// * `alu` - The main operation
    /// * `signed` - Whether the main operation is signed
    /// * `shift_alu` - The shift applied to `right`
    /// * `shift_signed` - Whether the shift is arithmetic
    /// * `result` - Receives the result
    /// * `left` - First operand
    /// * `right` - Operand to shift
    /// * `shift` - Shift amount
    #[must_use]
    pub fn binary_op_with_shift(
        alu: Alu,
        signed: bool,
        shift_alu: Alu,
        shift_signed: bool,
        result: VarId,
        left: Expression,
        right: Expression,
        shift: Expression,
    ) -> Self {
        let commutativity = if alu.is_commutative() {
            Caps::IS_COMMUTATIVE
        } else {
            Caps::IS_NON_COMMUTATIVE
        };

        Self::from_parts(
            OperatorKind::BinaryOpWithShift(BinaryOpWithShift::new(
                alu,
                signed,
                shift_alu,
                shift_signed,
            )),
            Caps::PURE | commutativity,
            vec![result],
            vec![left, right, shift],
        )
    }

    /// Creates a software breakpoint.
    #[must_use]
    pub fn breakpoint(value: u32) -> Self {
        Self::from_parts(
            OperatorKind::Breakpoint(Breakpoint::new(value)),
            MACHINE_STATE | Caps::MAY_READ_EXISTING_MUTABLE_STORAGE | NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    /// Creates `result = CPSR` (or SPSR).
    #[must_use]
    pub fn get_status_register(use_spsr: bool, result: VarId) -> Self {
        Self::from_parts(
            OperatorKind::GetStatusRegister(GetStatusRegister::new(use_spsr)),
            Caps::IS_NON_COMMUTATIVE
                | Caps::DOES_NOT_MUTATE_EXISTING_STORAGE
                | Caps::DOES_NOT_ALLOCATE_STORAGE
                | Caps::MAY_READ_EXISTING_MUTABLE_STORAGE
                | Caps::DOES_NOT_THROW
                | Caps::DOES_NOT_CAPTURE_POINTER_OPERANDS
                | NO_POINTER_ACCESS,
            vec![result],
            Vec::new(),
        )
    }

    /// Creates `CPSR[fields] = value` (or SPSR).
    #[must_use]
    pub fn set_status_register(use_spsr: bool, fields: u32, value: Expression) -> Self {
        Self::from_parts(
            OperatorKind::SetStatusRegister(SetStatusRegister::new(use_spsr, fields)),
            MACHINE_STATE | Caps::DOES_NOT_READ_EXISTING_MUTABLE_STORAGE | NO_POINTER_ACCESS,
            Vec::new(),
            vec![value],
        )
    }

    /// Creates a load through `base` that also writes `base + update` to `updated_base`.
    ///
    /// Results are `[value, updated_base]`, arguments `[base, update]`. `volatile` selects
    /// between the may-mutate and does-not-mutate facet and changes nothing else.
    #[must_use]
    pub fn load_indirect_with_index_update(
        ty: TypeRef,
        access_path: FieldPath,
        offset: i32,
        post_update: bool,
        volatile: bool,
        value: VarId,
        updated_base: VarId,
        base: Expression,
        update: Expression,
    ) -> Self {
        Self::from_parts(
            OperatorKind::LoadIndirectWithIndexUpdate(IndirectWithIndexUpdate::new(
                ty,
                access_path,
                offset,
                post_update,
            )),
            indirect_capabilities(volatile, true),
            vec![value, updated_base],
            vec![base, update],
        )
    }

    /// Creates a store through `base` that also writes `base + update` to `updated_base`.
    ///
    /// Results are `[updated_base]`, arguments `[base, update, value]`. `volatile` selects
    /// between the may-mutate and does-not-mutate facet and changes nothing else.
    #[must_use]
    pub fn store_indirect_with_index_update(
        ty: TypeRef,
        access_path: FieldPath,
        offset: i32,
        post_update: bool,
        volatile: bool,
        updated_base: VarId,
        base: Expression,
        update: Expression,
        value: Expression,
    ) -> Self {
        Self::from_parts(
            OperatorKind::StoreIndirectWithIndexUpdate(IndirectWithIndexUpdate::new(
                ty,
                access_path,
                offset,
                post_update,
            )),
            indirect_capabilities(volatile, false),
            vec![updated_base],
            vec![base, update, value],
        )
    }

    /// Creates an `LDM`/`STM` of the registers selected by `register_mask`.
    ///
    /// `base` is the optional address operand and `writeback` the optional updated base.
    #[must_use]
    pub fn move_integer_registers(
        load: bool,
        add_computed_registers: bool,
        restore_spsr: bool,
        register_mask: u32,
        writeback: Option<VarId>,
        base: Option<Expression>,
    ) -> Self {
        Self::from_parts(
            OperatorKind::MoveIntegerRegisters(MoveIntegerRegisters::new(
                load,
                add_computed_registers,
                restore_spsr,
                register_mask,
            )),
            MACHINE_STATE | Caps::MAY_READ_EXISTING_MUTABLE_STORAGE | BANK_TRANSFER,
            writeback.into_iter().collect(),
            base.into_iter().collect(),
        )
    }

    /// Creates an `FLDM`/`FSTM` of `register_count` registers starting at `first_register`.
    #[must_use]
    pub fn move_floating_point_registers(
        load: bool,
        add_computed_registers: bool,
        first_register: RegisterDescriptor,
        register_count: u32,
        writeback: Option<VarId>,
        base: Option<Expression>,
    ) -> Self {
        Self::from_parts(
            OperatorKind::MoveFloatingPointRegisters(MoveFloatingPointRegisters::new(
                load,
                add_computed_registers,
                first_register,
                register_count,
            )),
            MACHINE_STATE | Caps::MAY_READ_EXISTING_MUTABLE_STORAGE | BANK_TRANSFER,
            writeback.into_iter().collect(),
            base.into_iter().collect(),
        )
    }

    /// Creates a stack pointer push (`push == true`) or pop.
    #[must_use]
    pub fn move_stack_pointer(push: bool) -> Self {
        Self::from_parts(
            OperatorKind::MoveStackPointer(MoveStackPointer::new(push)),
            MACHINE_STATE | Caps::DOES_NOT_READ_EXISTING_MUTABLE_STORAGE | NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    /// Creates `MCR p<cp_num>, op1, value, c<crn>, c<crm>, op2`.
    #[must_use]
    pub fn move_to_coprocessor(
        cp_num: u32,
        op1: u32,
        crn: u32,
        crm: u32,
        op2: u32,
        value: Expression,
    ) -> Self {
        Self::from_parts(
            OperatorKind::MoveToCoprocessor(MoveToCoprocessor::new(cp_num, op1, crn, crm, op2)),
            MACHINE_STATE | Caps::DOES_NOT_READ_EXISTING_MUTABLE_STORAGE | NO_POINTER_ACCESS,
            Vec::new(),
            vec![value],
        )
    }

    /// Sets the VFP vector length to `size`.
    #[must_use]
    pub fn vector_hack_initialize(size: u32) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackInitialize(VectorHackInitialize::new(size)),
            NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    /// Clears `size` registers of the accumulator bank.
    #[must_use]
    pub fn vector_hack_prepare(size: u32, result_bank_base: RegisterDescriptor) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackPrepare(VectorHackPrepare::new(size, result_bank_base)),
            NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    /// Loads `size` registers starting at `destination_bank_base` from `pointer`.
    #[must_use]
    pub fn vector_hack_load_data(
        size: u32,
        destination_bank_base: RegisterDescriptor,
        pointer: Expression,
    ) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackLoadData(VectorHackLoadData::new(size, destination_bank_base)),
            Caps::MAY_READ_THROUGH_POINTER_OPERANDS | Caps::DOES_NOT_WRITE_THROUGH_POINTER_OPERANDS,
            Vec::new(),
            vec![pointer],
        )
    }

    /// Multiplies the left and right banks into the accumulator bank.
    #[must_use]
    pub fn vector_hack_multiply_and_accumulate(
        size: u32,
        left_bank_base: RegisterDescriptor,
        right_bank_base: RegisterDescriptor,
        result_bank_base: RegisterDescriptor,
    ) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackMultiplyAndAccumulate(VectorHackMultiplyAndAccumulate::new(
                size,
                left_bank_base,
                right_bank_base,
                result_bank_base,
            )),
            NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    /// Sums the accumulator bank into `result`.
    #[must_use]
    pub fn vector_hack_finalize(
        size: u32,
        result_bank_base: RegisterDescriptor,
        result: VarId,
    ) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackFinalize(VectorHackFinalize::new(size, result_bank_base)),
            NO_POINTER_ACCESS,
            vec![result],
            Vec::new(),
        )
    }

    /// Restores the scalar VFP mode.
    #[must_use]
    pub fn vector_hack_cleanup(size: u32) -> Self {
        Self::vector_hack(
            OperatorKind::VectorHackCleanup(VectorHackCleanup::new(size)),
            NO_POINTER_ACCESS,
            Vec::new(),
            Vec::new(),
        )
    }

    fn vector_hack(
        kind: OperatorKind,
        pointer_access: Caps,
        lhs: Vec<VarId>,
        rhs: Vec<Expression>,
    ) -> Self {
        Self::from_parts(
            kind,
            MACHINE_STATE | Caps::MAY_READ_EXISTING_MUTABLE_STORAGE | pointer_access,
            lhs,
            rhs,
        )
    }
}
