//! The read-only model of a parsed XML dump.
//!
//! Blocks and operators are addressed by position ([`BlockRef`], [`OperatorRef`]) inside their
//! method. Edges and reaching definitions hold these positions once the parser has resolved
//! them, so every reference in a parsed [`Document`] points at an existing element.

use std::fmt;

use crate::ir::BasicBlockKind;

/// Position of a block inside its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockRef(pub(crate) usize);

impl BlockRef {
    /// Returns the position in [`Method::basic_blocks`].
    #[must_use]
    pub fn position(self) -> usize {
        self.0
    }
}

/// Position of an operator inside its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperatorRef {
    /// The block holding the operator
    pub block: BlockRef,
    /// Position in [`BasicBlock::operators`]
    pub position: usize,
}

/// Source span of an operator.
///
/// Missing line and column attributes are `0`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Debug {
    /// Source file path
    pub file: String,
    /// Name of the source method
    pub method_name: String,
    /// First line
    pub begin_line: u32,
    /// First column
    pub begin_column: u32,
    /// Last line
    pub end_line: u32,
    /// Last column
    pub end_column: u32,
}

impl fmt::Display for Debug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({},{})-({},{})",
            self.file, self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}

/// One rendered operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operator {
    /// Method-wide operator index, `None` if the attribute is missing
    pub index: Option<u32>,
    /// Operator kind name
    pub ty: String,
    /// Rendered operator text
    pub value: String,
    /// Name of the called method, for calls
    pub call: Option<String>,
    /// Source span
    pub debug: Option<Debug>,
}

/// Operators whose definition of a variable reaches a block entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachingDefinition {
    /// The variable name
    pub variable: String,
    /// The defining operators
    pub definitions: Vec<OperatorRef>,
}

/// A method variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variable {
    /// Display name
    pub name: String,
    /// Type name
    pub ty: String,
}

/// A basic block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicBlock {
    /// Block label, unique within the method
    pub id: String,
    /// Layout index, `None` if the attribute is missing
    pub index: Option<u32>,
    /// Block type name
    pub ty: String,
    /// Operators in execution order
    pub operators: Vec<Operator>,
    /// Reaching definitions at the block entry
    pub reaching_definitions: Vec<ReachingDefinition>,
    /// Handled exception types
    pub handlers: Vec<String>,
}

impl BasicBlock {
    /// Returns the block role derived from its type name.
    #[must_use]
    pub fn kind(&self) -> BasicBlockKind {
        BasicBlockKind::from_type_name(&self.ty)
    }
}

/// A resolved edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlockEdge {
    /// Source block
    pub from: BlockRef,
    /// Destination block
    pub to: BlockRef,
    /// Edge label as written in the dump
    pub kind: String,
}

/// A parsed method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Method {
    /// Method name, the key used by [`Operator::call`]
    pub name: String,
    /// Variables in declaration order
    pub variables: Vec<Variable>,
    /// Blocks in document order
    pub basic_blocks: Vec<BasicBlock>,
    /// Edges in document order
    pub edges: Vec<BasicBlockEdge>,
}

impl Method {
    /// Returns the position of the block labelled `id`.
    #[must_use]
    pub fn block_ref(&self, id: &str) -> Option<BlockRef> {
        self.basic_blocks.iter().position(|b| b.id == id).map(BlockRef)
    }

    /// Returns the block labelled `id`.
    #[must_use]
    pub fn block(&self, id: &str) -> Option<&BasicBlock> {
        self.basic_blocks.iter().find(|b| b.id == id)
    }

    /// Returns the block at a position.
    #[must_use]
    pub fn block_at(&self, block: BlockRef) -> Option<&BasicBlock> {
        self.basic_blocks.get(block.0)
    }

    /// Returns the operator at a position.
    #[must_use]
    pub fn operator_at(&self, op: OperatorRef) -> Option<&Operator> {
        self.block_at(op.block)?.operators.get(op.position)
    }

    /// Finds the first operator carrying `index`.
    #[must_use]
    pub fn find_operator(&self, index: u32) -> Option<OperatorRef> {
        self.basic_blocks.iter().enumerate().find_map(|(b, block)| {
            block
                .operators
                .iter()
                .position(|op| op.index == Some(index))
                .map(|position| OperatorRef {
                    block: BlockRef(b),
                    position,
                })
        })
    }

    /// Iterates over the edges leaving `block`.
    pub fn edges_from(&self, block: BlockRef) -> impl Iterator<Item = &BasicBlockEdge> + '_ {
        self.edges.iter().filter(move |e| e.from == block)
    }

    /// Iterates over the edges entering `block`.
    pub fn edges_to(&self, block: BlockRef) -> impl Iterator<Item = &BasicBlockEdge> + '_ {
        self.edges.iter().filter(move |e| e.to == block)
    }

    /// Iterates over the operators named by a reaching definition.
    pub fn definitions<'a>(
        &'a self,
        reaching: &'a ReachingDefinition,
    ) -> impl Iterator<Item = &'a Operator> + 'a {
        reaching
            .definitions
            .iter()
            .filter_map(move |op| self.operator_at(*op))
    }

    /// Iterates over every operator with its position.
    pub fn operators(&self) -> impl Iterator<Item = (OperatorRef, &Operator)> + '_ {
        self.basic_blocks.iter().enumerate().flat_map(|(b, block)| {
            block.operators.iter().enumerate().map(move |(position, op)| {
                (
                    OperatorRef {
                        block: BlockRef(b),
                        position,
                    },
                    op,
                )
            })
        })
    }
}

/// All methods of one dump.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Methods in document order
    pub methods: Vec<Method>,
}

impl Document {
    /// Returns the method named `name`.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Returns the method called by `op`, if it is a call to a method of this document.
    #[must_use]
    pub fn resolve_call(&self, op: &Operator) -> Option<&Method> {
        op.call.as_deref().and_then(|name| self.method(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let caller = Method {
            name: "Caller".into(),
            basic_blocks: vec![
                BasicBlock {
                    id: "BB0".into(),
                    ty: "EntryBasicBlock".into(),
                    operators: vec![Operator {
                        index: Some(4),
                        ty: "DirectCall".into(),
                        call: Some("Callee".into()),
                        ..Operator::default()
                    }],
                    ..BasicBlock::default()
                },
                BasicBlock {
                    id: "BB1".into(),
                    ty: "Custom".into(),
                    ..BasicBlock::default()
                },
            ],
            edges: vec![BasicBlockEdge {
                from: BlockRef(0),
                to: BlockRef(1),
                kind: "Unconditional".into(),
            }],
            ..Method::default()
        };
        let callee = Method {
            name: "Callee".into(),
            ..Method::default()
        };
        Document {
            methods: vec![caller, callee],
        }
    }

    #[test]
    fn navigation() {
        let doc = sample();
        let caller = &doc.methods[0];

        assert_eq!(caller.block("BB1").map(BasicBlock::kind), Some(BasicBlockKind::Normal));
        assert_eq!(caller.basic_blocks[0].kind(), BasicBlockKind::Entry);

        let bb0 = caller.block_ref("BB0");
        assert_eq!(bb0, Some(BlockRef(0)));
        assert_eq!(caller.edges_from(BlockRef(0)).count(), 1);
        assert_eq!(caller.edges_to(BlockRef(0)).count(), 0);

        let call = caller.find_operator(4).and_then(|r| caller.operator_at(r));
        let target = call.and_then(|op| doc.resolve_call(op)).map(|m| m.name.as_str());
        assert_eq!(target, Some("Callee"));
        assert!(caller.find_operator(5).is_none());
    }
}
