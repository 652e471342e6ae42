//! Target-independent operators used by the optimization passes.

use crate::ir::{Expression, Operator, OperatorCapabilities as Caps, OperatorKind, VarId};

operator_payload! {
    /// Payload of [`Operator::single_assignment`].
    pub struct SingleAssignment {}
}

operator_payload! {
    /// Payload of [`Operator::direct_call`].
    pub struct DirectCall {
        /// Name of the called method, as used by the method lookup of a dump
        target: String,
    }
}

impl DirectCall {
    /// Returns the called method name without copying it.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target
    }
}

impl Operator {
    /// Creates `result = value`.
    #[must_use]
    pub fn single_assignment(result: VarId, value: Expression) -> Self {
        Self::from_parts(
            OperatorKind::SingleAssignment(SingleAssignment::new()),
            Caps::PURE | Caps::IS_NON_COMMUTATIVE,
            vec![result],
            vec![value],
        )
    }

    /// Creates a call of the method named `target`.
    ///
    /// Nothing is known about the callee, so the operator gets the most conservative
    /// capability set.
    #[must_use]
    pub fn direct_call(target: &str, results: Vec<VarId>, arguments: Vec<Expression>) -> Self {
        Self::from_parts(
            OperatorKind::DirectCall(DirectCall::new(target.to_string())),
            Caps::OPAQUE,
            results,
            arguments,
        )
    }

    /// Returns `true` for `result = variable` copies.
    #[must_use]
    pub fn is_copy(&self) -> bool {
        matches!(self.kind, OperatorKind::SingleAssignment(_))
            && self.lhs.len() == 1
            && self.rhs.len() == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ConstValue, TypeRef};

    #[test]
    fn assignment_is_pure() {
        let op = Operator::single_assignment(
            VarId::new(0),
            Expression::constant(TypeRef::new("int"), ConstValue::I32(1)),
        );
        assert!(op.capabilities().is_side_effect_free());
        assert!(op.is_copy());
        assert!(!op.should_not_be_removed());
    }

    #[test]
    fn call_is_opaque() {
        let op = Operator::direct_call("Helper::Run", vec![], vec![VarId::new(1).into()]);
        assert_eq!(op.call_target(), Some("Helper::Run"));
        assert!(op.may_throw());
        assert!(op.may_mutate_existing_storage());
        assert!(op.capabilities().is_well_formed());
    }
}
