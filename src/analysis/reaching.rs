//! Reaching definitions analysis.
//!
//! Computes, for each basic block, which definitions may reach the block entry without being
//! killed by an intervening definition of the same variable. A definition is one
//! `(operator, variable)` pair: an operator with several results creates one definition per
//! result, and each is killed independently.
//!
//! # Algorithm
//!
//! For each block B:
//! - `GEN[B]` = definitions in B not overwritten later in B
//! - `KILL[B]` = all definitions of variables that B defines
//! - `IN[B]` = ∪{OUT[P] | P is a predecessor of B}
//! - `OUT[B]` = GEN[B] ∪ (IN[B] - KILL[B])
//!
//! Iterated to a fixpoint in block order. Edges of every kind, including exception edges,
//! propagate definitions.

use std::collections::HashMap;

use crate::ir::{BlockId, Method, OperatorId, VarId};

/// A set of definition indices.
#[derive(Clone, PartialEq, Eq)]
struct DefinitionSet {
    words: Vec<u64>,
}

impl DefinitionSet {
    fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(64)],
        }
    }

    fn insert(&mut self, index: usize) {
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    fn contains(&self, index: usize) -> bool {
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    fn union_with(&mut self, other: &Self) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
    }

    fn difference_with(&mut self, other: &Self) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !*b;
        }
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| w * 64 + bit)
        })
    }
}

/// One definition site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Definition {
    /// The defining operator
    pub operator: OperatorId,
    /// The defined variable
    pub variable: VarId,
}

/// Reaching definitions of one method.
///
/// # Example
///
/// ```rust
/// use armir::{analysis::ReachingDefinitions, prelude::*};
///
/// let mut method = Method::new("m");
/// let x = method.add_local("x", TypeRef::new("int"));
/// let entry = method.add_block(BasicBlockKind::Entry);
/// let exit = method.add_block(BasicBlockKind::Exit);
/// method.add_edge(entry, exit, EdgeKind::Fallthrough)?;
/// let def = method.append_operator(entry, Operator::get_status_register(false, x))?;
///
/// let reaching = ReachingDefinitions::compute(&method);
/// assert_eq!(reaching.reaching(exit, x), vec![def]);
/// # Ok::<(), armir::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct ReachingDefinitions {
    definitions: Vec<Definition>,
    entry: HashMap<BlockId, Vec<usize>>,
    iterations: usize,
}

impl ReachingDefinitions {
    /// Runs the analysis.
    #[must_use]
    pub fn compute(method: &Method) -> Self {
        let mut definitions = Vec::new();
        let mut by_variable: HashMap<VarId, Vec<usize>> = HashMap::new();
        let mut block_defs: Vec<Vec<usize>> = Vec::with_capacity(method.blocks().len());

        for block in method.blocks() {
            let mut local = Vec::new();
            for op in block.operators() {
                let Some(operator) = op.id() else {
                    continue;
                };
                for &variable in op.results() {
                    let index = definitions.len();
                    definitions.push(Definition { operator, variable });
                    by_variable.entry(variable).or_default().push(index);
                    local.push(index);
                }
            }
            block_defs.push(local);
        }

        let n = definitions.len();
        let mut gen = Vec::with_capacity(block_defs.len());
        let mut kill = Vec::with_capacity(block_defs.len());

        for local in &block_defs {
            let mut g = DefinitionSet::new(n);
            let mut k = DefinitionSet::new(n);

            let mut last: HashMap<VarId, usize> = HashMap::new();
            for &index in local {
                last.insert(definitions[index].variable, index);
            }
            for (var, index) in last {
                g.insert(index);
                for &other in &by_variable[&var] {
                    k.insert(other);
                }
            }

            gen.push(g);
            kill.push(k);
        }

        let blocks = method.blocks();
        let mut inputs = vec![DefinitionSet::new(n); blocks.len()];
        let mut outputs = vec![DefinitionSet::new(n); blocks.len()];
        let mut iterations = 0;

        loop {
            iterations += 1;
            let mut changed = false;

            for (i, block) in blocks.iter().enumerate() {
                let mut input = DefinitionSet::new(n);
                for pred in method.predecessors(block.id()) {
                    input.union_with(&outputs[pred.index()]);
                }

                let mut output = input.clone();
                output.difference_with(&kill[i]);
                output.union_with(&gen[i]);

                if output != outputs[i] {
                    outputs[i] = output;
                    changed = true;
                }
                inputs[i] = input;
            }

            if !changed {
                break;
            }
        }

        let entry = blocks
            .iter()
            .zip(&inputs)
            .map(|(block, set)| (block.id(), set.iter().collect()))
            .collect();

        log::trace!(
            "reaching definitions of {}: {} definitions, {} iterations",
            method.name(),
            n,
            iterations
        );

        Self {
            definitions,
            entry,
            iterations,
        }
    }

    /// Returns every definition reaching the entry of `block`, in layout order.
    #[must_use]
    pub fn at_entry(&self, block: BlockId) -> Vec<Definition> {
        self.entry
            .get(&block)
            .map(|indices| indices.iter().map(|&i| self.definitions[i]).collect())
            .unwrap_or_default()
    }

    /// Returns the operators whose definition of `var` reaches the entry of `block`.
    #[must_use]
    pub fn reaching(&self, block: BlockId, var: VarId) -> Vec<OperatorId> {
        self.at_entry(block)
            .into_iter()
            .filter(|d| d.variable == var)
            .map(|d| d.operator)
            .collect()
    }

    /// Returns `true` if the definition of `var` by `operator` reaches the entry of `block`.
    #[must_use]
    pub fn reaches(&self, block: BlockId, operator: OperatorId, var: VarId) -> bool {
        let target = Definition {
            operator,
            variable: var,
        };
        match (self.entry.get(&block), self.definitions.iter().position(|d| *d == target)) {
            (Some(indices), Some(index)) => indices.contains(&index),
            _ => false,
        }
    }

    /// Returns the number of definition sites in the method.
    #[must_use]
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Returns the number of fixpoint iterations the solver needed.
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BasicBlockKind, EdgeKind, Operator, TypeRef};
    use crate::Result;

    #[test]
    fn set_operations() {
        let mut a = DefinitionSet::new(130);
        a.insert(1);
        a.insert(129);
        let mut b = DefinitionSet::new(130);
        b.insert(129);
        a.difference_with(&b);
        assert!(a.contains(1));
        assert!(!a.contains(129));
        b.union_with(&a);
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![1, 129]);
    }

    #[test]
    fn redefinition_kills_and_join_merges() -> Result<()> {
        let mut method = Method::new("m");
        let x = method.add_local("x", TypeRef::new("int"));
        let entry = method.add_block(BasicBlockKind::Entry);
        let left = method.add_block(BasicBlockKind::Normal);
        let right = method.add_block(BasicBlockKind::Normal);
        let join = method.add_block(BasicBlockKind::Exit);
        method.add_edge(entry, left, EdgeKind::BranchTaken)?;
        method.add_edge(entry, right, EdgeKind::BranchNotTaken)?;
        method.add_edge(left, join, EdgeKind::Unconditional)?;
        method.add_edge(right, join, EdgeKind::Fallthrough)?;

        let first = method.append_operator(entry, Operator::get_status_register(false, x))?;
        let second = method.append_operator(entry, Operator::get_status_register(true, x))?;
        let in_left = method.append_operator(left, Operator::get_status_register(false, x))?;

        let reaching = ReachingDefinitions::compute(&method);
        assert_eq!(reaching.reaching(left, x), vec![second]);
        assert!(!reaching.reaches(left, first, x));

        let mut at_join = reaching.reaching(join, x);
        at_join.sort();
        assert_eq!(at_join, vec![second, in_left]);
        assert!(reaching.reaching(entry, x).is_empty());
        assert_eq!(reaching.definition_count(), 3);
        Ok(())
    }

    #[test]
    fn loops_reach_fixpoint() -> Result<()> {
        let mut method = Method::new("loop");
        let x = method.add_local("x", TypeRef::new("int"));
        let head = method.add_block(BasicBlockKind::Entry);
        let body = method.add_block(BasicBlockKind::Normal);
        method.add_edge(head, body, EdgeKind::Fallthrough)?;
        method.add_edge(body, body, EdgeKind::BranchTaken)?;
        let def = method.append_operator(body, Operator::get_status_register(false, x))?;

        let reaching = ReachingDefinitions::compute(&method);
        assert_eq!(reaching.reaching(body, x), vec![def]);
        assert!(reaching.iterations() >= 2);
        Ok(())
    }
}
