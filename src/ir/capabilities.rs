//! Operator capability bitsets.
//!
//! Every operator declares a side-effect envelope as a set of facets. Each facet is encoded as
//! a pair of bits, one positive (`MAY_*`, `IS_COMMUTATIVE`) and one negative (`DOES_NOT_*`,
//! `IS_NON_COMMUTATIVE`); a well-formed bitset sets exactly one bit of every pair. Optimization
//! passes consult these facets instead of inspecting operator-specific logic.
//!
//! The positive bit of a pair always sits at the even position and the negative bit directly
//! above it, which is what [`OperatorCapabilities::is_well_formed`] relies on.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    /// Side-effect envelope of an operator.
    pub struct OperatorCapabilities: u32 {
        /// Arguments may be swapped without changing the result
        const IS_COMMUTATIVE = 0x0000_0001;
        /// Argument order is significant
        const IS_NON_COMMUTATIVE = 0x0000_0002;
        /// May modify storage that existed before the operator ran
        const MAY_MUTATE_EXISTING_STORAGE = 0x0000_0004;
        /// Never modifies pre-existing storage
        const DOES_NOT_MUTATE_EXISTING_STORAGE = 0x0000_0008;
        /// May allocate new storage
        const MAY_ALLOCATE_STORAGE = 0x0000_0010;
        /// Never allocates
        const DOES_NOT_ALLOCATE_STORAGE = 0x0000_0020;
        /// May read storage that other operators can mutate
        const MAY_READ_EXISTING_MUTABLE_STORAGE = 0x0000_0040;
        /// Only reads immutable storage or its own operands
        const DOES_NOT_READ_EXISTING_MUTABLE_STORAGE = 0x0000_0080;
        /// May raise an exception
        const MAY_THROW = 0x0000_0100;
        /// Never raises an exception
        const DOES_NOT_THROW = 0x0000_0200;
        /// May dereference pointer operands for reading
        const MAY_READ_THROUGH_POINTER_OPERANDS = 0x0000_0400;
        /// Never reads through pointer operands
        const DOES_NOT_READ_THROUGH_POINTER_OPERANDS = 0x0000_0800;
        /// May dereference pointer operands for writing
        const MAY_WRITE_THROUGH_POINTER_OPERANDS = 0x0000_1000;
        /// Never writes through pointer operands
        const DOES_NOT_WRITE_THROUGH_POINTER_OPERANDS = 0x0000_2000;
        /// May store pointer operands where they outlive the operator
        const MAY_CAPTURE_POINTER_OPERANDS = 0x0000_4000;
        /// Never captures pointer operands
        const DOES_NOT_CAPTURE_POINTER_OPERANDS = 0x0000_8000;
        /// Operator carries bookkeeping only and emits no code
        const IS_META_OPERATOR = 0x0001_0000;
    }
}

impl OperatorCapabilities {
    /// All positive bits of the paired facets.
    pub const POSITIVE_MASK: u32 = 0x5555;
    /// All negative bits of the paired facets.
    pub const NEGATIVE_MASK: u32 = 0xAAAA;
    /// Union of every paired facet bit.
    pub const MUTUALLY_EXCLUSIVE: u32 = 0xFFFF;

    /// The envelope of an operator that only computes its results from its arguments.
    pub const PURE: Self = Self::DOES_NOT_MUTATE_EXISTING_STORAGE
        .union(Self::DOES_NOT_ALLOCATE_STORAGE)
        .union(Self::DOES_NOT_READ_EXISTING_MUTABLE_STORAGE)
        .union(Self::DOES_NOT_THROW)
        .union(Self::DOES_NOT_READ_THROUGH_POINTER_OPERANDS)
        .union(Self::DOES_NOT_WRITE_THROUGH_POINTER_OPERANDS)
        .union(Self::DOES_NOT_CAPTURE_POINTER_OPERANDS);

    /// The envelope of an operator about which nothing is known.
    pub const OPAQUE: Self = Self::IS_NON_COMMUTATIVE
        .union(Self::MAY_MUTATE_EXISTING_STORAGE)
        .union(Self::MAY_ALLOCATE_STORAGE)
        .union(Self::MAY_READ_EXISTING_MUTABLE_STORAGE)
        .union(Self::MAY_THROW)
        .union(Self::MAY_READ_THROUGH_POINTER_OPERANDS)
        .union(Self::MAY_WRITE_THROUGH_POINTER_OPERANDS)
        .union(Self::MAY_CAPTURE_POINTER_OPERANDS);

    /// Returns `true` if exactly one bit of every facet pair is set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armir::ir::OperatorCapabilities;
    ///
    /// let add = OperatorCapabilities::PURE | OperatorCapabilities::IS_COMMUTATIVE;
    /// assert!(add.is_well_formed());
    /// assert!(!OperatorCapabilities::PURE.is_well_formed());
    /// ```
    #[must_use]
    pub const fn is_well_formed(self) -> bool {
        let positive = self.bits() & Self::POSITIVE_MASK;
        let negative = (self.bits() & Self::NEGATIVE_MASK) >> 1;

        (positive ^ negative) == Self::POSITIVE_MASK && (positive & negative) == 0
    }

    /// Returns `true` if the arguments may be reordered.
    #[must_use]
    pub const fn is_commutative(self) -> bool {
        self.contains(Self::IS_COMMUTATIVE)
    }

    /// Returns `true` if pre-existing storage may be modified.
    #[must_use]
    pub const fn may_mutate_existing_storage(self) -> bool {
        self.contains(Self::MAY_MUTATE_EXISTING_STORAGE)
    }

    /// Returns `true` if new storage may be allocated.
    #[must_use]
    pub const fn may_allocate_storage(self) -> bool {
        self.contains(Self::MAY_ALLOCATE_STORAGE)
    }

    /// Returns `true` if mutable storage may be read.
    #[must_use]
    pub const fn may_read_existing_mutable_storage(self) -> bool {
        self.contains(Self::MAY_READ_EXISTING_MUTABLE_STORAGE)
    }

    /// Returns `true` if the operator may raise an exception.
    #[must_use]
    pub const fn may_throw(self) -> bool {
        self.contains(Self::MAY_THROW)
    }

    /// Returns `true` if pointer operands may be read through.
    #[must_use]
    pub const fn may_read_through_pointer_operands(self) -> bool {
        self.contains(Self::MAY_READ_THROUGH_POINTER_OPERANDS)
    }

    /// Returns `true` if pointer operands may be written through.
    #[must_use]
    pub const fn may_write_through_pointer_operands(self) -> bool {
        self.contains(Self::MAY_WRITE_THROUGH_POINTER_OPERANDS)
    }

    /// Returns `true` if pointer operands may be captured.
    #[must_use]
    pub const fn may_capture_pointer_operands(self) -> bool {
        self.contains(Self::MAY_CAPTURE_POINTER_OPERANDS)
    }

    /// Returns `true` for bookkeeping operators.
    #[must_use]
    pub const fn is_meta_operator(self) -> bool {
        self.contains(Self::IS_META_OPERATOR)
    }

    /// Returns `true` if removing the operator has no observable effect when its results are
    /// unused.
    #[must_use]
    pub const fn is_side_effect_free(self) -> bool {
        !self.may_mutate_existing_storage()
            && !self.may_allocate_storage()
            && !self.may_throw()
            && !self.may_write_through_pointer_operands()
            && !self.may_capture_pointer_operands()
    }
}

impl fmt::Display for OperatorCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}
