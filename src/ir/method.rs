//! Methods, basic blocks and edges.
//!
//! A [`Method`] is the root of ownership of the IR: it owns the variable table, the ordered
//! basic blocks (each exclusively owning its ordered operators) and the ordered edges between
//! blocks. Blocks and operators are addressed by [`BlockId`] and [`OperatorId`]; edges hold ids,
//! never references, and both endpoints are validated against the method when an edge is added.
//!
//! # Cloning
//!
//! [`Method::clone_method`] produces an independent copy through one [`CloningContext`]:
//! variables keep their table order, operators are renumbered in layout order, and every shared
//! variable stays shared. [`Method::inline_from`] clones the operators of a block of another
//! method into a block of this one, adding only the variables the cloned operators reference.

use std::fmt;

use strum::{Display, EnumIter, EnumString};

use crate::{
    ir::{
        CloningContext, ContextFrame, Expression, FieldMut, FieldVisitor, Operator, OperatorId,
        RegisterDescriptor, TransformationContext, TypeConverter, TypeRef, VarId,
        VariableExpression, VariableKind, VariableTable,
    },
    Error, Result,
};

/// Identity of a basic block within its method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    /// Creates a block id from its index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the position of the block in its method.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BB{}", self.0)
    }
}

/// Role of a basic block.
///
/// The string forms are the `Type` attribute values of the XML dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum BasicBlockKind {
    /// The single entry of the method
    #[strum(serialize = "EntryBasicBlock")]
    Entry,
    /// The single exit of the method
    #[strum(serialize = "ExitBasicBlock")]
    Exit,
    /// Start of an exception handler
    #[strum(serialize = "ExceptionHandlerBasicBlock")]
    ExceptionHandler,
    /// Any other block
    #[strum(serialize = "NormalBasicBlock")]
    Normal,
}

impl BasicBlockKind {
    /// Maps a dump `Type` attribute to a kind; unrecognized names are [`Self::Normal`].
    #[must_use]
    pub fn from_type_name(name: &str) -> Self {
        name.parse().unwrap_or(Self::Normal)
    }
}

/// Label of a control flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum EdgeKind {
    /// Unconditional jump
    Unconditional,
    /// Fall through into the next block
    Fallthrough,
    /// Taken branch of a conditional
    BranchTaken,
    /// Not-taken branch of a conditional
    BranchNotTaken,
    /// Exceptional control flow into a handler
    Exception,
}

/// A directed edge between two blocks of the same method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlockEdge {
    /// Source block
    pub from: BlockId,
    /// Destination block
    pub to: BlockId,
    /// Edge label
    pub kind: EdgeKind,
}

/// A straight-line sequence of operators.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    id: BlockId,
    kind: BasicBlockKind,
    operators: Vec<Operator>,
    handlers: Vec<TypeRef>,
}

impl BasicBlock {
    /// Returns the block id.
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Returns the block role.
    #[must_use]
    pub fn kind(&self) -> BasicBlockKind {
        self.kind
    }

    /// Returns the operators in execution order.
    #[must_use]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    /// Returns the exception types handled by this block.
    #[must_use]
    pub fn handlers(&self) -> &[TypeRef] {
        &self.handlers
    }

    /// Returns the number of operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    /// Returns `true` if the block has no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Returns the position of an operator inside the block.
    #[must_use]
    pub fn position(&self, id: OperatorId) -> Option<usize> {
        self.operators.iter().position(|op| op.id() == Some(id))
    }

    pub(crate) fn operators_mut(&mut self) -> &mut Vec<Operator> {
        &mut self.operators
    }
}

/// A method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    name: String,
    variables: VariableTable,
    blocks: Vec<BasicBlock>,
    edges: Vec<BasicBlockEdge>,
    next_operator: u32,
}

impl Method {
    /// Creates an empty method.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            variables: VariableTable::new(),
            blocks: Vec::new(),
            edges: Vec::new(),
            next_operator: 0,
        }
    }

    /// Returns the method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the variable table.
    #[must_use]
    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Returns the blocks in layout order.
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[BasicBlockEdge] {
        &self.edges
    }

    /// Returns a block by id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Result<&mut BasicBlock> {
        self.blocks.get_mut(id.index()).ok_or(Error::UnknownBlock(id))
    }

    /// Returns the entry block, if the method has one.
    #[must_use]
    pub fn entry(&self) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.kind == BasicBlockKind::Entry)
    }

    /// Adds a storage location.
    pub fn add_variable(&mut self, variable: VariableExpression) -> VarId {
        self.variables.add(variable)
    }

    /// Adds a local variable.
    pub fn add_local(&mut self, name: &str, ty: TypeRef) -> VarId {
        self.add_variable(VariableExpression {
            name: name.to_string(),
            ty,
            kind: VariableKind::Local,
        })
    }

    /// Adds a method argument at signature position `index`.
    pub fn add_argument(&mut self, name: &str, ty: TypeRef, index: u16) -> VarId {
        self.add_variable(VariableExpression {
            name: name.to_string(),
            ty,
            kind: VariableKind::Argument(index),
        })
    }

    /// Adds a compiler temporary.
    pub fn add_temporary(&mut self, name: &str, ty: TypeRef) -> VarId {
        self.add_variable(VariableExpression {
            name: name.to_string(),
            ty,
            kind: VariableKind::Temporary,
        })
    }

    /// Adds a physical register, named `$<register>`.
    pub fn add_register(&mut self, register: RegisterDescriptor, ty: TypeRef) -> VarId {
        self.add_variable(VariableExpression {
            name: format!("${register}"),
            ty,
            kind: VariableKind::PhysicalRegister(register),
        })
    }

    /// Appends a new, empty block.
    pub fn add_block(&mut self, kind: BasicBlockKind) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            id,
            kind,
            operators: Vec::new(),
            handlers: Vec::new(),
        });
        id
    }

    /// Records that `block` handles exceptions of type `ty`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if the block does not belong to this method.
    pub fn add_handler(&mut self, block: BlockId, ty: TypeRef) -> Result<()> {
        self.block_mut(block)?.handlers.push(ty);
        Ok(())
    }

    /// Adds an edge between two blocks of this method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if either endpoint does not belong to this method.
    pub fn add_edge(&mut self, from: BlockId, to: BlockId, kind: EdgeKind) -> Result<()> {
        for id in [from, to] {
            if self.block(id).is_none() {
                return Err(Error::UnknownBlock(id));
            }
        }

        self.edges.push(BasicBlockEdge { from, to, kind });
        Ok(())
    }

    /// Iterates over the edges leaving `block`.
    pub fn edges_from(&self, block: BlockId) -> impl Iterator<Item = &BasicBlockEdge> + '_ {
        self.edges.iter().filter(move |e| e.from == block)
    }

    /// Iterates over the edges entering `block`.
    pub fn edges_to(&self, block: BlockId) -> impl Iterator<Item = &BasicBlockEdge> + '_ {
        self.edges.iter().filter(move |e| e.to == block)
    }

    /// Returns the distinct successors of `block` in edge order.
    #[must_use]
    pub fn successors(&self, block: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        for edge in self.edges_from(block) {
            if !out.contains(&edge.to) {
                out.push(edge.to);
            }
        }
        out
    }

    /// Returns the distinct predecessors of `block` in edge order.
    #[must_use]
    pub fn predecessors(&self, block: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        for edge in self.edges_to(block) {
            if !out.contains(&edge.from) {
                out.push(edge.from);
            }
        }
        out
    }

    fn check_operands(&self, op: &Operator) -> Result<()> {
        let vars = op
            .results()
            .iter()
            .copied()
            .chain(op.arguments().iter().filter_map(Expression::var));

        for var in vars {
            self.variables.lookup(var)?;
        }
        Ok(())
    }

    fn allocate_operator_id(&mut self) -> OperatorId {
        let id = OperatorId::new(self.next_operator);
        self.next_operator += 1;
        id
    }

    /// Appends an operator to `block` and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] for a foreign block and [`Error::UnknownVariable`] if
    /// an operand is not in this method's variable table.
    pub fn append_operator(&mut self, block: BlockId, op: Operator) -> Result<OperatorId> {
        let len = self.block(block).ok_or(Error::UnknownBlock(block))?.len();
        self.insert_operator(block, len, op)
    }

    /// Inserts an operator into `block` at `position` and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] for a foreign block, [`Error::UnknownVariable`] for
    /// foreign operands and [`Error::Malformed`] if `position` is past the end of the block.
    pub fn insert_operator(
        &mut self,
        block: BlockId,
        position: usize,
        mut op: Operator,
    ) -> Result<OperatorId> {
        self.check_operands(&op)?;

        let len = self.block(block).ok_or(Error::UnknownBlock(block))?.len();
        if position > len {
            return Err(malformed_error!(
                "Insert position {} is past the end of {} ({} operators)",
                position,
                block,
                len
            ));
        }

        let id = self.allocate_operator_id();
        op.set_id(id);
        self.block_mut(block)?.operators.insert(position, op);
        Ok(id)
    }

    /// Removes an operator and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownOperator`] if no block holds the operator.
    pub fn remove_operator(&mut self, id: OperatorId) -> Result<Operator> {
        let (block, index) = self.locate(id).ok_or(Error::UnknownOperator(id))?;
        Ok(self.block_mut(block)?.operators.remove(index))
    }

    /// Returns the block and position of an operator.
    #[must_use]
    pub fn locate(&self, id: OperatorId) -> Option<(BlockId, usize)> {
        self.blocks
            .iter()
            .find_map(|b| b.position(id).map(|index| (b.id, index)))
    }

    /// Returns an operator by id.
    #[must_use]
    pub fn operator(&self, id: OperatorId) -> Option<&Operator> {
        let (block, index) = self.locate(id)?;
        self.block(block)?.operators.get(index)
    }

    /// Returns an operator by id for modification.
    pub fn operator_mut(&mut self, id: OperatorId) -> Option<&mut Operator> {
        let (block, index) = self.locate(id)?;
        self.blocks.get_mut(block.index())?.operators.get_mut(index)
    }

    /// Iterates over every operator in layout order, with its block.
    pub fn operators(&self) -> impl Iterator<Item = (BlockId, &Operator)> + '_ {
        self.blocks
            .iter()
            .flat_map(|b| b.operators.iter().map(move |op| (b.id, op)))
    }

    /// Returns the total number of operators.
    #[must_use]
    pub fn operator_count(&self) -> usize {
        self.blocks.iter().map(BasicBlock::len).sum()
    }

    /// Returns the number of argument slots reading `var` across the method.
    #[must_use]
    pub fn use_count(&self, var: VarId) -> usize {
        self.operators()
            .map(|(_, op)| op.arguments().iter().filter(|e| e.refers_to(var)).count())
            .sum()
    }

    /// Returns the ids of every operator defining `var`, in layout order.
    #[must_use]
    pub fn definitions(&self, var: VarId) -> Vec<OperatorId> {
        self.operators()
            .filter(|(_, op)| op.is_source_of(var))
            .filter_map(|(_, op)| op.id())
            .collect()
    }

    /// Walks every field of the method through the context.
    ///
    /// The order is fixed: the method frame, then each variable (`name`, `ty`), then each block
    /// with its operators in execution order.
    ///
    /// # Errors
    ///
    /// Propagates visitor errors.
    pub fn apply_transformation(&mut self, ctx: &mut TransformationContext<'_>) -> Result<()> {
        let mut scope = ctx.push(ContextFrame::Method(self.name.clone()));

        for (id, variable) in self.variables.iter_mut() {
            let mut frame = scope.push(ContextFrame::Variable(id));
            frame.transform("name", FieldMut::Text(&mut variable.name))?;
            frame.transform("ty", FieldMut::Type(&mut variable.ty))?;
        }

        for block in &mut self.blocks {
            let mut frame = scope.push(ContextFrame::Block(block.id));
            for handler in &mut block.handlers {
                frame.transform("handler", FieldMut::Type(handler))?;
            }
            for op in &mut block.operators {
                op.apply_transformation(&mut frame)?;
            }
        }

        Ok(())
    }

    /// Runs a visitor over the whole method.
    ///
    /// # Returns
    ///
    /// The number of visited fields.
    ///
    /// # Errors
    ///
    /// Propagates visitor errors and reports an unbalanced context.
    pub fn transform(&mut self, visitor: &mut dyn FieldVisitor) -> Result<usize> {
        let mut ctx = TransformationContext::new(visitor);
        self.apply_transformation(&mut ctx)?;
        ctx.finish()
    }

    /// Produces an independent copy of the method.
    ///
    /// # Arguments
    ///
    /// * `converter` - Type remapping applied to variables, constants and payload metadata
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if an operator refers outside the variable table.
    pub fn clone_method(&self, converter: &dyn TypeConverter) -> Result<Method> {
        let mut variables = VariableTable::new();
        let mut ctx = CloningContext::new(&self.variables, &mut variables, converter);

        for (id, _) in self.variables.iter() {
            ctx.clone_variable(id)?;
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for block in &self.blocks {
            ctx.register_block(block.id, block.id);

            let operators = block
                .operators
                .iter()
                .map(|op| op.clone_in(&mut ctx))
                .collect::<Result<Vec<_>>>()?;

            blocks.push(BasicBlock {
                id: block.id,
                kind: block.kind,
                operators,
                handlers: block
                    .handlers
                    .iter()
                    .map(|h| ctx.convert_type(h))
                    .collect(),
            });
        }

        let edges = self
            .edges
            .iter()
            .map(|e| {
                Ok(BasicBlockEdge {
                    from: ctx.block(e.from).ok_or(Error::UnknownBlock(e.from))?,
                    to: ctx.block(e.to).ok_or(Error::UnknownBlock(e.to))?,
                    kind: e.kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let next_operator = ctx.next_operator();
        drop(ctx);

        log::debug!(
            "cloned {} ({} blocks, {} operators)",
            self.name,
            blocks.len(),
            next_operator
        );

        Ok(Method {
            name: self.name.clone(),
            variables,
            blocks,
            edges,
            next_operator,
        })
    }

    /// Clones the operators of `source_block` in `source` to the end of `target_block`.
    ///
    /// Variables referenced by the cloned operators are added to this method once each,
    /// regardless of how many operators share them.
    ///
    /// # Returns
    ///
    /// The ids of the cloned operators, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBlock`] if either block does not exist, and
    /// [`Error::NotSupported`] if the source block is an exception handler.
    pub fn inline_from(
        &mut self,
        source: &Method,
        source_block: BlockId,
        target_block: BlockId,
        converter: &dyn TypeConverter,
    ) -> Result<Vec<OperatorId>> {
        let from = source
            .block(source_block)
            .ok_or(Error::UnknownBlock(source_block))?;
        if self.block(target_block).is_none() {
            return Err(Error::UnknownBlock(target_block));
        }
        if from.kind == BasicBlockKind::ExceptionHandler || !from.handlers.is_empty() {
            return Err(Error::NotSupported(format!(
                "inlining exception handler block {}:{}",
                source.name, source_block
            )));
        }

        let mut ctx = CloningContext::new(&source.variables, &mut self.variables, converter)
            .with_operator_base(self.next_operator);
        ctx.register_block(source_block, target_block);

        let cloned = from
            .operators
            .iter()
            .map(|op| op.clone_in(&mut ctx))
            .collect::<Result<Vec<_>>>()?;

        self.next_operator = ctx.next_operator();
        drop(ctx);

        let ids = cloned.iter().filter_map(Operator::id).collect();
        self.block_mut(target_block)?.operators.extend(cloned);

        log::debug!(
            "inlined {} operators from {}:{} into {}:{}",
            from.len(),
            source.name,
            source_block,
            self.name,
            target_block
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Alu, ConstValue, FieldTrace, IdentityConverter, TypeMap};

    fn int() -> TypeRef {
        TypeRef::new("System.Int32")
    }

    #[test]
    fn edges_require_known_blocks() {
        let mut method = Method::new("m");
        let a = method.add_block(BasicBlockKind::Entry);
        assert!(matches!(
            method.add_edge(a, BlockId::new(7), EdgeKind::Fallthrough),
            Err(Error::UnknownBlock(id)) if id == BlockId::new(7)
        ));
        assert!(method.edges().is_empty());
    }

    #[test]
    fn operators_get_fresh_ids() -> Result<()> {
        let mut method = Method::new("m");
        let x = method.add_local("x", int());
        let b = method.add_block(BasicBlockKind::Normal);

        let first = method.append_operator(b, Operator::single_assignment(x, x.into()))?;
        let second = method.insert_operator(b, 0, Operator::breakpoint(1))?;
        assert_ne!(first, second);
        assert_eq!(method.locate(second), Some((b, 0)));
        assert_eq!(method.locate(first), Some((b, 1)));

        let removed = method.remove_operator(second)?;
        assert_eq!(removed.name(), "Breakpoint");
        assert!(method.operator(second).is_none());
        assert!(matches!(method.remove_operator(second), Err(Error::UnknownOperator(_))));
        assert!(method.insert_operator(b, 5, Operator::breakpoint(2)).is_err());
        Ok(())
    }

    #[test]
    fn foreign_operands_are_rejected() {
        let mut method = Method::new("m");
        let b = method.add_block(BasicBlockKind::Normal);
        let op = Operator::single_assignment(VarId::new(3), VarId::new(4).into());
        assert!(matches!(
            method.append_operator(b, op),
            Err(Error::UnknownVariable(_))
        ));
    }

    #[test]
    fn transformation_visits_method_in_order() -> Result<()> {
        let mut method = Method::new("m");
        let x = method.add_local("x", int());
        let b = method.add_block(BasicBlockKind::Entry);
        method.append_operator(b, Operator::get_status_register(true, x))?;

        let mut trace = FieldTrace::new();
        let visited = method.transform(&mut trace)?;
        let fields: Vec<_> = trace.fields().collect();
        assert_eq!(
            fields,
            ["name", "ty", "debug_info", "capabilities", "lhs", "rhs", "use_spsr"]
        );
        assert_eq!(visited, fields.len());
        assert_eq!(trace.entries()[6].path, "m/BB0/GetStatusRegister#0");
        assert_eq!(trace.entries()[6].value, "true");
        Ok(())
    }

    #[test]
    fn inlining_shares_variables() -> Result<()> {
        let mut callee = Method::new("callee");
        let a = callee.add_local("a", int());
        let b = callee.add_local("b", int());
        let body = callee.add_block(BasicBlockKind::Entry);
        callee.append_operator(
            body,
            Operator::binary_op_with_shift(
                Alu::Add,
                false,
                Alu::Shl,
                false,
                a,
                b.into(),
                b.into(),
                Expression::constant(int(), ConstValue::I32(1)),
            ),
        )?;
        callee.append_operator(body, Operator::single_assignment(b, a.into()))?;

        let mut caller = Method::new("caller");
        caller.add_local("unrelated", int());
        let target = caller.add_block(BasicBlockKind::Entry);
        caller.append_operator(target, Operator::breakpoint(0))?;

        let converter = TypeMap::new().with(int(), TypeRef::new("System.UInt32"));
        let ids = caller.inline_from(&callee, body, target, &converter)?;

        assert_eq!(ids.len(), 2);
        assert_eq!(caller.variables().len(), 3);
        assert_eq!(caller.block(target).map(BasicBlock::len), Some(3));

        let first = caller.operator(ids[0]).ok_or(Error::UnknownOperator(ids[0]))?;
        let second = caller.operator(ids[1]).ok_or(Error::UnknownOperator(ids[1]))?;
        assert_eq!(first.results()[0], second.arguments()[0].var().unwrap_or(VarId::new(99)));
        assert_eq!(
            caller.variables().get(first.results()[0]).map(|v| v.ty.name()),
            Some("System.UInt32")
        );

        assert!(caller
            .inline_from(&callee, BlockId::new(4), target, &IdentityConverter)
            .is_err());
        Ok(())
    }

    #[test]
    fn handler_blocks_are_not_inlined() -> Result<()> {
        let mut callee = Method::new("callee");
        let entry = callee.add_block(BasicBlockKind::Entry);
        let handler = callee.add_block(BasicBlockKind::ExceptionHandler);
        let guarded = callee.add_block(BasicBlockKind::Normal);
        callee.add_handler(guarded, TypeRef::new("System.Exception"))?;
        for block in [entry, handler, guarded] {
            callee.append_operator(block, Operator::breakpoint(1))?;
        }

        let mut caller = Method::new("caller");
        let target = caller.add_block(BasicBlockKind::Entry);

        for block in [handler, guarded] {
            let result = caller.inline_from(&callee, block, target, &IdentityConverter);
            assert!(matches!(result, Err(Error::NotSupported(_))), "{block}");
        }
        assert_eq!(caller.operator_count(), 0);

        assert_eq!(caller.inline_from(&callee, entry, target, &IdentityConverter)?.len(), 1);
        Ok(())
    }
}
