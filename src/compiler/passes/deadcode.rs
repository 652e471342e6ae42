//! Dead code elimination pass.
//!
//! Removes operators whose results are never read and whose removal cannot be observed.
//!
//! An operator is removed when all of the following hold:
//!
//! - it has at least one result, and no argument slot in the method reads any of them
//! - every result is a local or a temporary (arguments and physical registers outlive the
//!   method body)
//! - [`Operator::should_not_be_removed`] is `false`
//! - its capabilities are side-effect free
//!
//! Removal can make the operators feeding it dead, so the pass sweeps until nothing changes.

use std::collections::HashMap;

use crate::{
    compiler::{EventKind, EventLog, IrPass},
    ir::{Method, Operator, OperatorId, VarId, VariableKind},
    Result,
};

/// Dead code elimination pass.
pub struct DeadCodeEliminationPass;

impl Default for DeadCodeEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadCodeEliminationPass {
    /// Creates a new dead code elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn use_counts(method: &Method) -> HashMap<VarId, usize> {
        let mut counts = HashMap::new();
        for (_, op) in method.operators() {
            for var in op.arguments().iter().filter_map(|e| e.var()) {
                *counts.entry(var).or_insert(0) += 1;
            }
        }
        counts
    }

    fn is_dead(method: &Method, op: &Operator, uses: &HashMap<VarId, usize>) -> bool {
        if op.results().is_empty()
            || op.should_not_be_removed()
            || !op.capabilities().is_side_effect_free()
        {
            return false;
        }

        op.results().iter().all(|var| {
            let removable = method.variables().get(*var).is_some_and(|v| {
                matches!(v.kind, VariableKind::Local | VariableKind::Temporary)
            });
            removable && uses.get(var).copied().unwrap_or(0) == 0
        })
    }

    fn find_dead(method: &Method) -> Vec<OperatorId> {
        let uses = Self::use_counts(method);
        method
            .operators()
            .filter(|(_, op)| Self::is_dead(method, op, &uses))
            .filter_map(|(_, op)| op.id())
            .collect()
    }
}

impl IrPass for DeadCodeEliminationPass {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn description(&self) -> &'static str {
        "Removes side-effect free operators whose results are never read"
    }

    fn run_on_method(&self, method: &mut Method, events: &mut EventLog) -> Result<bool> {
        let mut removed = 0;

        loop {
            let dead = Self::find_dead(method);
            if dead.is_empty() {
                break;
            }

            for id in dead {
                let op = method.remove_operator(id)?;
                events
                    .record(EventKind::OperatorRemoved)
                    .at(method.name(), id)
                    .message(op.name());
                removed += 1;
            }
        }

        if removed > 0 {
            log::debug!("removed {} dead operators from {}", removed, method.name());
        }
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Alu, BasicBlockKind, ConstValue, Expression, RegisterDescriptor, TypeRef};

    fn int() -> TypeRef {
        TypeRef::new("int")
    }

    #[test]
    fn removes_unused_chains() -> Result<()> {
        let mut method = Method::new("m");
        let a = method.add_argument("a", int(), 0);
        let t = method.add_temporary("t", int());
        let u = method.add_local("u", int());
        let b = method.add_block(BasicBlockKind::Entry);

        method.append_operator(b, Operator::single_assignment(t, a.into()))?;
        method.append_operator(
            b,
            Operator::binary_op_with_shift(
                Alu::Add,
                true,
                Alu::Shl,
                false,
                u,
                t.into(),
                a.into(),
                Expression::constant(int(), ConstValue::I32(0)),
            ),
        )?;

        let mut events = EventLog::new();
        assert!(DeadCodeEliminationPass::new().run_on_method(&mut method, &mut events)?);
        assert_eq!(method.operator_count(), 0);
        assert_eq!(events.count(EventKind::OperatorRemoved), 2);

        assert!(!DeadCodeEliminationPass::new().run_on_method(&mut method, &mut events)?);
        Ok(())
    }

    #[test]
    fn keeps_effects_and_escaping_results() -> Result<()> {
        let mut method = Method::new("m");
        let x = method.add_local("x", int());
        let r0 = method.add_register(RegisterDescriptor::integer(0), int());
        let b = method.add_block(BasicBlockKind::Entry);

        method.append_operator(b, Operator::get_status_register(false, x))?;
        method.append_operator(b, Operator::single_assignment(r0, x.into()))?;
        method.append_operator(b, Operator::breakpoint(1))?;
        method.append_operator(b, Operator::direct_call("Callee", vec![x], vec![]))?;

        let mut events = EventLog::new();
        let changed = DeadCodeEliminationPass::new().run_on_method(&mut method, &mut events)?;
        assert!(!changed);
        assert_eq!(method.operator_count(), 4);
        Ok(())
    }
}
