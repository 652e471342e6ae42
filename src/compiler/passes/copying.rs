//! Copy propagation pass.
//!
//! This pass replaces reads of a copy destination with the copy source, within the block
//! that contains the copy. The copies themselves are left in place for dead code elimination.
//!
//! # Example
//!
//! Before:
//! ```text
//! t = a
//! u = t ADD.signed (b SHL.unsigned 2)
//! ```
//!
//! After:
//! ```text
//! t = a
//! u = a ADD.signed (b SHL.unsigned 2)
//! ```
//!
//! # Algorithm
//!
//! Each block is scanned in execution order with a map from copy destination to source:
//!
//! 1. Arguments reading a mapped destination are replaced, if the reading operator accepts the
//!    replacement ([`Operator::can_propagate_copy`])
//! 2. Every result of the operator kills the entries it overwrites, both as destination and as
//!    source. An operator that may mutate existing storage also kills every entry that has a
//!    physical register on either side, since calls and register bank moves write registers
//!    they do not list as results
//! 3. A `dest = source` copy then adds its own entry
//!
//! Chains resolve on the fly: in `t = a; u = t; v = u`, the second copy is rewritten to
//! `u = a` before it is recorded, so `v` also reads `a`.

use std::collections::{HashMap, HashSet};

use crate::{
    compiler::{EventKind, EventLog, IrPass},
    ir::{BlockId, Expression, Method, Operator, VarId, VariableKind},
    Result,
};

/// Block-local copy propagation pass.
pub struct CopyPropagationPass;

impl Default for CopyPropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CopyPropagationPass {
    /// Creates a new copy propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Rewrites the arguments of `op` through the copy map.
    ///
    /// # Returns
    ///
    /// The number of argument slots replaced.
    fn propagate_into(op: &mut Operator, copies: &HashMap<VarId, Expression>) -> usize {
        let reads: Vec<VarId> = op
            .arguments()
            .iter()
            .filter_map(Expression::var)
            .filter(|var| copies.contains_key(var))
            .collect();

        let mut replaced = 0;
        for var in reads {
            let Some(source) = copies.get(&var) else {
                continue;
            };
            if op.can_propagate_copy(&Expression::Variable(var), source) {
                replaced += op.substitute_usage(var, source);
            }
        }
        replaced
    }

    /// Drops every entry invalidated by `op`.
    fn kill(
        op: &Operator,
        registers: &HashSet<VarId>,
        copies: &mut HashMap<VarId, Expression>,
    ) {
        for &result in op.results() {
            copies.remove(&result);
            copies.retain(|_, source| !source.refers_to(result));
        }

        if op.may_mutate_existing_storage() {
            copies.retain(|dest, source| {
                !registers.contains(dest) && !source.var().is_some_and(|v| registers.contains(&v))
            });
        }
    }

    /// Collects the variables standing for machine registers.
    fn registers(method: &Method) -> HashSet<VarId> {
        method
            .variables()
            .iter()
            .filter(|(_, v)| matches!(v.kind, VariableKind::PhysicalRegister(_)))
            .map(|(id, _)| id)
            .collect()
    }

    fn run_on_block(
        method: &mut Method,
        block: BlockId,
        events: &mut EventLog,
    ) -> Result<usize> {
        let name = method.name().to_string();
        let registers = Self::registers(method);
        let operators = method.block_mut(block)?.operators_mut();

        let mut copies: HashMap<VarId, Expression> = HashMap::new();
        let mut total = 0;

        for op in operators.iter_mut() {
            let replaced = Self::propagate_into(op, &copies);
            if replaced > 0 {
                let event = events.record(EventKind::CopyPropagated);
                event.method(&name).message(format!("{replaced} uses"));
                if let Some(id) = op.id() {
                    event.operator = Some(id);
                }
                total += replaced;
            }

            Self::kill(op, &registers, &mut copies);

            if op.is_copy() {
                if let (Some(dest), Some(source)) = (op.first_result(), op.first_argument()) {
                    if !source.refers_to(dest) {
                        copies.insert(dest, source.clone());
                    }
                }
            }
        }

        Ok(total)
    }
}

impl IrPass for CopyPropagationPass {
    fn name(&self) -> &'static str {
        "copy-propagation"
    }

    fn description(&self) -> &'static str {
        "Replaces uses of copy destinations with their sources inside each block"
    }

    fn run_on_method(&self, method: &mut Method, events: &mut EventLog) -> Result<bool> {
        let blocks: Vec<BlockId> = method.blocks().iter().map(|b| b.id()).collect();

        let mut replaced = 0;
        for block in blocks {
            replaced += Self::run_on_block(method, block, events)?;
        }

        if replaced > 0 {
            log::debug!("propagated {} copy uses in {}", replaced, method.name());
        }
        Ok(replaced > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{
        Alu, BasicBlockKind, ConstValue, EdgeKind, OperatorId, RegisterDescriptor, TypeRef,
    };

    fn int() -> TypeRef {
        TypeRef::new("int")
    }

    #[test]
    fn chains_resolve_to_the_first_source() -> Result<()> {
        let mut method = Method::new("m");
        let a = method.add_argument("a", int(), 0);
        let t = method.add_temporary("t", int());
        let u = method.add_temporary("u", int());
        let v = method.add_local("v", int());
        let b = method.add_block(BasicBlockKind::Entry);

        method.append_operator(b, Operator::single_assignment(t, a.into()))?;
        method.append_operator(b, Operator::single_assignment(u, t.into()))?;
        let last = method.append_operator(
            b,
            Operator::binary_op_with_shift(
                Alu::Sub,
                true,
                Alu::Shl,
                false,
                v,
                u.into(),
                t.into(),
                Expression::constant(int(), ConstValue::I32(1)),
            ),
        )?;

        let mut events = EventLog::new();
        assert!(CopyPropagationPass::new().run_on_method(&mut method, &mut events)?);

        let op = method.operator(last).ok_or(crate::Error::UnknownOperator(last))?;
        assert_eq!(op.arguments()[0], Expression::Variable(a));
        assert_eq!(op.arguments()[1], Expression::Variable(a));
        assert_eq!(events.count(EventKind::CopyPropagated), 2);
        Ok(())
    }

    #[test]
    fn redefinition_stops_propagation() -> Result<()> {
        let mut method = Method::new("m");
        let a = method.add_local("a", int());
        let t = method.add_local("t", int());
        let b = method.add_block(BasicBlockKind::Entry);

        method.append_operator(b, Operator::single_assignment(t, a.into()))?;
        method.append_operator(b, Operator::get_status_register(false, a))?;
        let read = method.append_operator(b, Operator::set_status_register(false, 1, t.into()))?;

        let mut events = EventLog::new();
        assert!(!CopyPropagationPass::new().run_on_method(&mut method, &mut events)?);
        let op = method.operator(read).ok_or(crate::Error::UnknownOperator(read))?;
        assert_eq!(op.arguments()[0], Expression::Variable(t));
        Ok(())
    }

    #[test]
    fn respects_operator_veto_and_block_boundaries() -> Result<()> {
        let mut method = Method::new("m");
        let t = method.add_local("t", int());
        let r0 = method.add_register(RegisterDescriptor::integer(0), int());
        let first = method.add_block(BasicBlockKind::Entry);
        let second = method.add_block(BasicBlockKind::Exit);
        method.add_edge(first, second, EdgeKind::Fallthrough)?;

        method.append_operator(
            first,
            Operator::single_assignment(t, Expression::constant(int(), ConstValue::I32(4))),
        )?;
        let mcr = method.append_operator(
            first,
            Operator::move_to_coprocessor(15, 0, 1, 0, 0, t.into()),
        )?;
        let ldm = method.append_operator(
            first,
            Operator::move_integer_registers(true, false, false, 0x3, None, Some(t.into())),
        )?;
        let later = method.append_operator(second, Operator::single_assignment(r0, t.into()))?;

        let mut events = EventLog::new();
        assert!(!CopyPropagationPass::new().run_on_method(&mut method, &mut events)?);

        for id in [mcr, ldm, later] {
            let op = method.operator(id).ok_or(crate::Error::UnknownOperator(id))?;
            assert_eq!(op.arguments()[0], Expression::Variable(t));
        }
        Ok(())
    }

    /// `t = $R0; clobber; <CPSR> = t` and `$R0 = a; clobber; <CPSR> = $R0`
    fn register_copies_across(clobber: Operator) -> Result<(Method, Vec<OperatorId>)> {
        let mut method = Method::new("m");
        let a = method.add_local("a", int());
        let t = method.add_local("t", int());
        let sp = method.add_local("sp", int());
        let r0 = method.add_register(RegisterDescriptor::integer(0), int());
        let b = method.add_block(BasicBlockKind::Entry);

        method.append_operator(b, Operator::single_assignment(t, r0.into()))?;
        method.append_operator(b, Operator::single_assignment(sp, a.into()))?;
        method.append_operator(b, clobber.clone())?;
        let from_register =
            method.append_operator(b, Operator::set_status_register(false, 1, t.into()))?;
        method.append_operator(b, Operator::single_assignment(r0, a.into()))?;
        method.append_operator(b, clobber)?;
        let into_register =
            method.append_operator(b, Operator::set_status_register(false, 2, r0.into()))?;
        let local = method.append_operator(b, Operator::set_status_register(true, 4, sp.into()))?;
        Ok((method, vec![from_register, into_register, local]))
    }

    #[test]
    fn storage_mutation_kills_register_copies() -> Result<()> {
        let clobbers = [
            Operator::direct_call("Other", Vec::new(), Vec::new()),
            Operator::move_integer_registers(true, false, false, 0x1, None, None),
        ];

        for clobber in clobbers {
            let name = clobber.name();
            let (mut method, reads) = register_copies_across(clobber)?;
            let mut events = EventLog::new();
            CopyPropagationPass::new().run_on_method(&mut method, &mut events)?;

            let args: Vec<Expression> = reads
                .iter()
                .map(|&id| {
                    method
                        .operator(id)
                        .map(|op| op.arguments()[0].clone())
                        .ok_or(crate::Error::UnknownOperator(id))
                })
                .collect::<Result<_>>()?;

            let vars: Vec<VarId> = method.variables().iter().map(|(id, _)| id).collect();
            let (a, t, r0) = (vars[0], vars[1], vars[3]);
            assert_eq!(args[0], Expression::Variable(t), "{name}");
            assert_eq!(args[1], Expression::Variable(r0), "{name}");
            assert_eq!(args[2], Expression::Variable(a), "{name}");
            assert_eq!(events.count(EventKind::CopyPropagated), 1, "{name}");
        }
        Ok(())
    }
}
