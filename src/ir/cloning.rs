//! The cloning protocol.
//!
//! A [`CloningContext`] lives for exactly one clone operation. It owns the old-to-new maps for
//! variables, operators and basic blocks, and remaps type metadata through a [`TypeConverter`].
//! Every reference is cloned through the context, so a source element that is referenced from
//! several places is cloned once and the clone is shared the same way the source was.
//!
//! The context writes new variables into a target [`VariableTable`]. For a whole-method clone
//! that table is fresh; for inlining it is the table of the receiving method.

use std::collections::HashMap;

use crate::{
    ir::{
        Alu, BlockId, ConstantExpression, Expression, FieldPath, FieldRef, OperatorId,
        RegisterDescriptor, TypeRef, VarId, VariableTable,
    },
    Result,
};

/// Maps type-system references from the source universe into the target universe.
///
/// Specialization clones use this to substitute generic parameters or target-specific types.
pub trait TypeConverter: Sync {
    /// Converts a type descriptor.
    fn convert_type(&self, ty: &TypeRef) -> TypeRef;

    /// Converts a field access path.
    ///
    /// The default converts the declaring type of every field and keeps the names.
    fn convert_fields(&self, path: &FieldPath) -> FieldPath {
        path.fields()
            .iter()
            .map(|f| FieldRef {
                declaring_type: self.convert_type(&f.declaring_type),
                name: f.name.clone(),
            })
            .collect()
    }
}

/// A converter that keeps every type as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityConverter;

impl TypeConverter for IdentityConverter {
    fn convert_type(&self, ty: &TypeRef) -> TypeRef {
        ty.clone()
    }
}

/// A converter backed by an explicit substitution table; unknown types are kept.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    map: HashMap<TypeRef, TypeRef>,
}

impl TypeMap {
    /// Creates an empty substitution table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a substitution and returns the table.
    #[must_use]
    pub fn with(mut self, from: TypeRef, to: TypeRef) -> Self {
        self.map.insert(from, to);
        self
    }
}

impl TypeConverter for TypeMap {
    fn convert_type(&self, ty: &TypeRef) -> TypeRef {
        self.map.get(ty).cloned().unwrap_or_else(|| ty.clone())
    }
}

/// Identity map of one clone operation.
pub struct CloningContext<'a> {
    source: &'a VariableTable,
    target: &'a mut VariableTable,
    converter: &'a dyn TypeConverter,
    variables: HashMap<VarId, VarId>,
    operators: HashMap<OperatorId, OperatorId>,
    blocks: HashMap<BlockId, BlockId>,
    next_operator: u32,
}

impl<'a> CloningContext<'a> {
    /// Creates a context cloning from `source` into `target`.
    ///
    /// # Arguments
    ///
    /// * `source` - Variable table the cloned operators refer to
    /// * `target` - Variable table receiving the cloned variables
    /// * `converter` - Type remapping applied to variables, constants and payload metadata
    pub fn new(
        source: &'a VariableTable,
        target: &'a mut VariableTable,
        converter: &'a dyn TypeConverter,
    ) -> Self {
        Self {
            source,
            target,
            converter,
            variables: HashMap::new(),
            operators: HashMap::new(),
            blocks: HashMap::new(),
            next_operator: 0,
        }
    }

    /// Sets the first id handed out to cloned operators.
    #[must_use]
    pub fn with_operator_base(mut self, next: u32) -> Self {
        self.next_operator = next;
        self
    }

    /// Returns the clone of a variable, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] if the handle is not in the source table.
    pub fn clone_variable(&mut self, id: VarId) -> Result<VarId> {
        if let Some(mapped) = self.variables.get(&id) {
            return Ok(*mapped);
        }

        let mut variable = self.source.lookup(id)?.clone();
        variable.ty = self.converter.convert_type(&variable.ty);

        let new = self.target.add(variable);
        self.variables.insert(id, new);
        Ok(new)
    }

    /// Clones an operand: variables through [`Self::clone_variable`], constants by value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownVariable`] for foreign variable handles.
    pub fn clone_expression(&mut self, expression: &Expression) -> Result<Expression> {
        Ok(match expression {
            Expression::Variable(id) => Expression::Variable(self.clone_variable(*id)?),
            Expression::Constant(c) => Expression::Constant(ConstantExpression {
                ty: self.converter.convert_type(&c.ty),
                value: c.value,
            }),
        })
    }

    /// Registers a source operator and returns the id of its clone.
    ///
    /// Registering the same operator again returns the same id.
    pub fn register_operator(&mut self, old: OperatorId) -> OperatorId {
        if let Some(mapped) = self.operators.get(&old) {
            return *mapped;
        }

        let new = OperatorId::new(self.next_operator);
        self.next_operator += 1;
        self.operators.insert(old, new);
        new
    }

    /// Registers the clone of a basic block.
    pub fn register_block(&mut self, old: BlockId, new: BlockId) {
        self.blocks.insert(old, new);
    }

    /// Returns the clone of a variable, if it was cloned.
    #[must_use]
    pub fn variable(&self, old: VarId) -> Option<VarId> {
        self.variables.get(&old).copied()
    }

    /// Returns the clone of an operator, if it was registered.
    #[must_use]
    pub fn operator(&self, old: OperatorId) -> Option<OperatorId> {
        self.operators.get(&old).copied()
    }

    /// Returns the clone of a basic block, if it was registered.
    #[must_use]
    pub fn block(&self, old: BlockId) -> Option<BlockId> {
        self.blocks.get(&old).copied()
    }

    /// Converts a type descriptor into the target universe.
    #[must_use]
    pub fn convert_type(&self, ty: &TypeRef) -> TypeRef {
        self.converter.convert_type(ty)
    }

    /// Converts a field access path into the target universe.
    #[must_use]
    pub fn convert_fields(&self, path: &FieldPath) -> FieldPath {
        self.converter.convert_fields(path)
    }

    /// Returns the next operator id that would be handed out.
    #[must_use]
    pub fn next_operator(&self) -> u32 {
        self.next_operator
    }

    /// Returns the number of variables cloned so far.
    #[must_use]
    pub fn cloned_variables(&self) -> usize {
        self.variables.len()
    }
}

/// A payload field type that can be reproduced inside a [`CloningContext`].
pub trait CloneField: Sized {
    /// Returns the clone of the field.
    ///
    /// # Errors
    ///
    /// Propagates failures of referenced element lookups.
    fn clone_field(&self, ctx: &mut CloningContext<'_>) -> Result<Self>;
}

macro_rules! clone_field_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CloneField for $ty {
                fn clone_field(&self, _ctx: &mut CloningContext<'_>) -> Result<Self> {
                    Ok(self.clone())
                }
            }
        )*
    };
}

clone_field_by_value!(bool, u8, u16, u32, i32, Alu, RegisterDescriptor, String);

impl CloneField for TypeRef {
    fn clone_field(&self, ctx: &mut CloningContext<'_>) -> Result<Self> {
        Ok(ctx.convert_type(self))
    }
}

impl CloneField for FieldPath {
    fn clone_field(&self, ctx: &mut CloningContext<'_>) -> Result<Self> {
        Ok(ctx.convert_fields(self))
    }
}
