//! The transformation protocol.
//!
//! A transformation walks every field of every operator in a fixed, declared order and hands
//! each one to a [`FieldVisitor`] that may inspect or rewrite it. The walk is driven by a
//! [`TransformationContext`] which tracks the nesting path (method, block, operator) as an
//! explicit stack.
//!
//! # Push/pop balance
//!
//! Frames are pushed with [`TransformationContext::push`], which returns a [`ContextScope`]
//! guard. Dropping the guard truncates the stack back to the depth it had before the push, so
//! an early return through `?` can never leave a stale frame behind. The guard dereferences to
//! the context, so nested walks simply keep using it.
//!
//! # Built-in visitors
//!
//! - [`FieldTrace`]: Records every visited field with its path and value
//! - [`VariableRenamer`]: Remaps variable handles in result and argument lists
//! - [`TypeSubstitution`]: Remaps type descriptors and field paths through a
//!   [`TypeConverter`]

use std::{
    collections::HashMap,
    fmt,
    ops::{Deref, DerefMut},
};

use crate::{
    ir::{
        Alu, BlockId, DebugInfo, Expression, FieldPath, OperatorCapabilities, OperatorId,
        RegisterDescriptor, TypeConverter, TypeRef, VarId,
    },
    Error, Result,
};

/// One level of the nesting path of a transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextFrame {
    /// A method, by name
    Method(String),
    /// A basic block of the current method
    Block(BlockId),
    /// An operator, by kind name and id
    Operator {
        /// Kind name of the operator
        kind: &'static str,
        /// Id of the operator, if it is owned by a method
        id: Option<OperatorId>,
    },
    /// An entry of the variable table
    Variable(VarId),
}

impl fmt::Display for ContextFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Method(name) => write!(f, "{name}"),
            Self::Block(id) => write!(f, "{id}"),
            Self::Operator { kind, id: Some(id) } => write!(f, "{kind}#{id}"),
            Self::Operator { kind, id: None } => write!(f, "{kind}"),
            Self::Variable(id) => write!(f, "{id}"),
        }
    }
}

/// Mutable access to one field, tagged with its declared type.
#[derive(Debug)]
pub enum FieldMut<'a> {
    /// A flag
    Bool(&'a mut bool),
    /// An 8-bit immediate
    U8(&'a mut u8),
    /// A 16-bit immediate
    U16(&'a mut u16),
    /// A 32-bit immediate or mask
    U32(&'a mut u32),
    /// A signed offset
    I32(&'a mut i32),
    /// An ALU code
    Alu(&'a mut Alu),
    /// A machine register
    Register(&'a mut RegisterDescriptor),
    /// A type descriptor
    Type(&'a mut TypeRef),
    /// A field access path
    FieldPath(&'a mut FieldPath),
    /// A name
    Text(&'a mut String),
    /// The capability bitset
    Capabilities(&'a mut OperatorCapabilities),
    /// The optional source span
    DebugInfo(&'a mut Option<DebugInfo>),
    /// The result operands
    Results(&'a mut [VarId]),
    /// The argument operands
    Arguments(&'a mut [Expression]),
}

impl FieldMut<'_> {
    /// Renders the current value of the field.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::U8(v) => v.to_string(),
            Self::U16(v) => v.to_string(),
            Self::U32(v) => format!("0x{v:X}"),
            Self::I32(v) => v.to_string(),
            Self::Alu(v) => v.to_string(),
            Self::Register(v) => v.to_string(),
            Self::Type(v) => v.to_string(),
            Self::FieldPath(v) => v.to_string(),
            Self::Text(v) => v.to_string(),
            Self::Capabilities(v) => v.to_string(),
            Self::DebugInfo(Some(v)) => v.to_string(),
            Self::DebugInfo(None) => "<none>".to_string(),
            Self::Results(v) => join(v.iter().map(ToString::to_string)),
            Self::Arguments(v) => join(v.iter().map(|e| match e {
                Expression::Variable(id) => id.to_string(),
                Expression::Constant(c) => c.to_string(),
            })),
        }
    }
}

fn join(items: impl Iterator<Item = String>) -> String {
    let mut out = String::from("[");
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&item);
    }
    out.push(']');
    out
}

/// Receives every field of a transformation walk.
///
/// # Arguments
///
/// * `path` - The nesting path at the time of the visit, outermost first
/// * `field` - The declared field name
/// * `value` - Mutable access to the field
///
/// # Errors
///
/// Any error aborts the walk and is propagated to the caller of the transformation.
pub trait FieldVisitor {
    /// Visits one field.
    fn visit(
        &mut self,
        path: &[ContextFrame],
        field: &'static str,
        value: FieldMut<'_>,
    ) -> Result<()>;
}

/// Context threaded through a transformation walk.
pub struct TransformationContext<'v> {
    stack: Vec<ContextFrame>,
    visitor: &'v mut dyn FieldVisitor,
    visited: usize,
}

impl<'v> TransformationContext<'v> {
    /// Creates a context dispatching to the given visitor.
    pub fn new(visitor: &'v mut dyn FieldVisitor) -> Self {
        Self {
            stack: Vec::new(),
            visitor,
            visited: 0,
        }
    }

    /// Pushes a frame for the duration of the returned scope.
    pub fn push(&mut self, frame: ContextFrame) -> ContextScope<'_, 'v> {
        let depth = self.stack.len();
        self.stack.push(frame);
        ContextScope { ctx: self, depth }
    }

    /// Hands one field to the visitor.
    ///
    /// # Errors
    ///
    /// Returns whatever error the visitor produces.
    pub fn transform(&mut self, field: &'static str, value: FieldMut<'_>) -> Result<()> {
        self.visited += 1;
        self.visitor.visit(&self.stack, field, value)
    }

    /// Returns the current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the current nesting path, outermost first.
    #[must_use]
    pub fn path(&self) -> &[ContextFrame] {
        &self.stack
    }

    /// Returns the number of fields visited so far.
    #[must_use]
    pub fn visited(&self) -> usize {
        self.visited
    }

    /// Ends the walk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnbalancedContext`] if frames are still pushed.
    pub fn finish(self) -> Result<usize> {
        if self.stack.is_empty() {
            Ok(self.visited)
        } else {
            Err(Error::UnbalancedContext(self.stack.len()))
        }
    }
}

/// Guard of a pushed [`ContextFrame`]; pops it on drop.
pub struct ContextScope<'c, 'v> {
    ctx: &'c mut TransformationContext<'v>,
    depth: usize,
}

impl<'v> Deref for ContextScope<'_, 'v> {
    type Target = TransformationContext<'v>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl DerefMut for ContextScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl Drop for ContextScope<'_, '_> {
    fn drop(&mut self) {
        self.ctx.stack.truncate(self.depth);
    }
}

/// A payload field type that takes part in the transformation walk.
pub trait TransformField {
    /// Hands the field to the context under its declared name.
    ///
    /// # Errors
    ///
    /// Returns whatever error the visitor produces.
    fn transform_field(
        &mut self,
        name: &'static str,
        ctx: &mut TransformationContext<'_>,
    ) -> Result<()>;
}

macro_rules! transform_field_impl {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl TransformField for $ty {
                fn transform_field(
                    &mut self,
                    name: &'static str,
                    ctx: &mut TransformationContext<'_>,
                ) -> Result<()> {
                    ctx.transform(name, FieldMut::$variant(self))
                }
            }
        )*
    };
}

transform_field_impl! {
    bool => Bool,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    i32 => I32,
    Alu => Alu,
    RegisterDescriptor => Register,
    TypeRef => Type,
    FieldPath => FieldPath,
    String => Text,
}

/// One visited field, as recorded by [`FieldTrace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    /// Nesting path rendered as `outer/inner`
    pub path: String,
    /// Field name
    pub field: &'static str,
    /// Rendered value at the time of the visit
    pub value: String,
}

/// Records the field walk without changing anything.
#[derive(Debug, Default)]
pub struct FieldTrace {
    entries: Vec<TraceEntry>,
}

impl FieldTrace {
    /// Creates an empty trace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded entries in visit order.
    #[must_use]
    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Returns the visited field names in visit order.
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.field)
    }
}

impl FieldVisitor for FieldTrace {
    fn visit(
        &mut self,
        path: &[ContextFrame],
        field: &'static str,
        value: FieldMut<'_>,
    ) -> Result<()> {
        let path = path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("/");
        log::trace!("{path}.{field}");
        self.entries.push(TraceEntry {
            path,
            field,
            value: value.describe(),
        });
        Ok(())
    }
}

/// Remaps variable handles in result and argument lists.
#[derive(Debug, Default)]
pub struct VariableRenamer {
    map: HashMap<VarId, VarId>,
    renamed: usize,
}

impl VariableRenamer {
    /// Creates a renamer from an old-to-new handle map.
    #[must_use]
    pub fn new(map: HashMap<VarId, VarId>) -> Self {
        Self { map, renamed: 0 }
    }

    /// Adds one mapping.
    pub fn rename(&mut self, from: VarId, to: VarId) -> &mut Self {
        self.map.insert(from, to);
        self
    }

    /// Returns the number of operand slots rewritten so far.
    #[must_use]
    pub fn renamed(&self) -> usize {
        self.renamed
    }

    fn remap(&mut self, id: &mut VarId) {
        if let Some(new) = self.map.get(id) {
            *id = *new;
            self.renamed += 1;
        }
    }
}

impl FieldVisitor for VariableRenamer {
    fn visit(
        &mut self,
        _path: &[ContextFrame],
        _field: &'static str,
        value: FieldMut<'_>,
    ) -> Result<()> {
        match value {
            FieldMut::Results(results) => {
                for id in results {
                    self.remap(id);
                }
            }
            FieldMut::Arguments(args) => {
                for arg in args {
                    if let Expression::Variable(id) = arg {
                        self.remap(id);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Remaps type descriptors and field paths through a [`TypeConverter`].
///
/// Applied to a whole method this also rewrites the declared types of the variable table and
/// the types of inline constants.
pub struct TypeSubstitution<'a> {
    converter: &'a dyn TypeConverter,
}

impl<'a> TypeSubstitution<'a> {
    /// Creates a substitution backed by the given converter.
    #[must_use]
    pub fn new(converter: &'a dyn TypeConverter) -> Self {
        Self { converter }
    }
}

impl FieldVisitor for TypeSubstitution<'_> {
    fn visit(
        &mut self,
        _path: &[ContextFrame],
        _field: &'static str,
        value: FieldMut<'_>,
    ) -> Result<()> {
        match value {
            FieldMut::Type(ty) => *ty = self.converter.convert_type(ty),
            FieldMut::FieldPath(path) => *path = self.converter.convert_fields(path),
            FieldMut::Arguments(args) => {
                for arg in args {
                    if let Expression::Constant(c) = arg {
                        c.ty = self.converter.convert_type(&c.ty);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}
