//! Operands of IR operators.
//!
//! Operators never own the values they read or write. Mutable storage locations (variables and
//! physical registers) live in a [`VariableTable`] owned by the method and are referenced through
//! lightweight [`VarId`] handles, so that "two operators share a variable" is simply handle
//! equality. Constants are immutable values that travel inline inside an [`Expression`].
//!
//! # Key Types
//! - [`VarId`]: Handle into the variable table of a method
//! - [`VariableExpression`]: A named, typed storage location (variable or physical register)
//! - [`Expression`]: An operand, either a variable handle or a constant
//! - [`TypeRef`], [`FieldRef`], [`FieldPath`]: Type-system descriptors carried by operators
//! - [`RegisterDescriptor`]: A machine register (core, VFP, status or system)

use std::{fmt, sync::Arc};

use strum::{Display, EnumString};

use crate::{Error, Result};

/// Handle of a variable or physical register inside a method's [`VariableTable`].
///
/// The handle is stable for the lifetime of the owning method. It is only meaningful together
/// with the table that produced it; cloning into another table remaps handles through a
/// [`CloningContext`](crate::ir::CloningContext).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(usize);

impl VarId {
    /// Creates a handle from a raw table index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying table index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A reference to a type of the compiled program.
///
/// The IR only needs type identity and a printable name; the full type-system model lives with
/// the front end. Cloning shares the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef(Arc<str>);

impl TypeRef {
    /// Creates a type reference from its fully qualified name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A reference to an instance or static field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    /// The type declaring the field
    pub declaring_type: TypeRef,
    /// The field name
    pub name: Arc<str>,
}

impl FieldRef {
    /// Creates a field reference.
    #[must_use]
    pub fn new(declaring_type: TypeRef, name: &str) -> Self {
        Self {
            declaring_type,
            name: Arc::from(name),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}

/// The chain of fields an indirect access walks through, outermost first.
///
/// An empty path means the access targets the pointed-to value itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<FieldRef>);

impl FieldPath {
    /// Creates an empty access path.
    #[must_use]
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Creates an access path from a list of fields.
    #[must_use]
    pub fn new(fields: Vec<FieldRef>) -> Self {
        Self(fields)
    }

    /// Returns the fields of the path.
    #[must_use]
    pub fn fields(&self) -> &[FieldRef] {
        &self.0
    }

    /// Returns `true` if the path has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FieldRef> for FieldPath {
    fn from_iter<I: IntoIterator<Item = FieldRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&field.name)?;
        }
        Ok(())
    }
}

/// Register file a machine register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
pub enum RegisterClass {
    /// Core integer registers `R0`-`R15`
    #[strum(serialize = "R")]
    Integer,
    /// VFP single precision registers `S0`-`S31`
    #[strum(serialize = "S")]
    SinglePrecision,
    /// VFP double precision registers `D0`-`D15`
    #[strum(serialize = "D")]
    DoublePrecision,
    /// Program status registers
    #[strum(serialize = "PSR")]
    Status,
    /// Coprocessor and system registers
    #[strum(serialize = "SYS")]
    System,
}

/// A machine register, also used as the base of a register bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterDescriptor {
    /// The register file
    pub class: RegisterClass,
    /// Register number inside the file
    pub number: u32,
}

impl RegisterDescriptor {
    /// Creates a register descriptor.
    #[must_use]
    pub const fn new(class: RegisterClass, number: u32) -> Self {
        Self { class, number }
    }

    /// Core integer register `Rn`.
    #[must_use]
    pub const fn integer(number: u32) -> Self {
        Self::new(RegisterClass::Integer, number)
    }

    /// VFP single precision register `Sn`.
    #[must_use]
    pub const fn single(number: u32) -> Self {
        Self::new(RegisterClass::SinglePrecision, number)
    }

    /// VFP double precision register `Dn`.
    #[must_use]
    pub const fn double(number: u32) -> Self {
        Self::new(RegisterClass::DoublePrecision, number)
    }
}

impl fmt::Display for RegisterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.number)
    }
}

/// What kind of storage a [`VariableExpression`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// Method argument with its position in the signature
    Argument(u16),
    /// Local variable declared by the method
    Local,
    /// Temporary introduced by the compiler
    Temporary,
    /// A physical machine register
    PhysicalRegister(RegisterDescriptor),
}

/// A mutable storage location referenced by operators.
///
/// Identity is the [`VarId`] under which the table stores it, not its name: two variables
/// may share a name and still be distinct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExpression {
    /// Display name used by dumpers
    pub name: String,
    /// The declared type
    pub ty: TypeRef,
    /// Variable, argument, temporary or register
    pub kind: VariableKind,
}

impl VariableExpression {
    /// Returns the physical register, if this location is one.
    #[must_use]
    pub fn register(&self) -> Option<RegisterDescriptor> {
        match self.kind {
            VariableKind::PhysicalRegister(reg) => Some(reg),
            _ => None,
        }
    }
}

/// Arena of the variables and physical registers of one method.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableTable {
    entries: Vec<VariableExpression>,
}

impl VariableTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a storage location and returns its handle.
    pub fn add(&mut self, variable: VariableExpression) -> VarId {
        self.entries.push(variable);
        VarId::new(self.entries.len() - 1)
    }

    /// Returns the location behind a handle.
    #[must_use]
    pub fn get(&self, id: VarId) -> Option<&VariableExpression> {
        self.entries.get(id.index())
    }

    /// Returns the location behind a handle for modification.
    pub fn get_mut(&mut self, id: VarId) -> Option<&mut VariableExpression> {
        self.entries.get_mut(id.index())
    }

    /// Returns the location behind a handle, failing on foreign handles.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownVariable`] if the handle is out of range.
    pub fn lookup(&self, id: VarId) -> Result<&VariableExpression> {
        self.get(id).ok_or(Error::UnknownVariable(id))
    }

    /// Returns the number of locations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(handle, location)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VariableExpression)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId::new(i), v))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (VarId, &mut VariableExpression)> {
        self.entries
            .iter_mut()
            .enumerate()
            .map(|(i, v)| (VarId::new(i), v))
    }
}

/// A compile-time constant value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// Single precision float
    F32(f32),
    /// Double precision float
    F64(f64),
    /// Null reference
    Null,
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::F32(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// An immutable typed constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantExpression {
    /// The type of the constant
    pub ty: TypeRef,
    /// The value
    pub value: ConstValue,
}

impl fmt::Display for ConstantExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$Const({} {})", self.ty, self.value)
    }
}

/// An operand of an operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A variable or physical register of the owning method
    Variable(VarId),
    /// An inline constant
    Constant(ConstantExpression),
}

impl Expression {
    /// Creates a constant operand.
    #[must_use]
    pub fn constant(ty: TypeRef, value: ConstValue) -> Self {
        Self::Constant(ConstantExpression { ty, value })
    }

    /// Returns `true` for constant operands.
    #[must_use]
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Returns the variable handle, if the operand is one.
    #[must_use]
    pub const fn var(&self) -> Option<VarId> {
        match self {
            Self::Variable(id) => Some(*id),
            Self::Constant(_) => None,
        }
    }

    /// Returns the variable handle of an operand that must be a mutable location.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConstantResult`] for constants; they are never coerced.
    pub fn as_variable(&self) -> Result<VarId> {
        match self {
            Self::Variable(id) => Ok(*id),
            Self::Constant(c) => Err(Error::ConstantResult(c.to_string())),
        }
    }

    /// Returns `true` if the operand refers to the given variable.
    #[must_use]
    pub fn refers_to(&self, id: VarId) -> bool {
        self.var() == Some(id)
    }
}

impl From<VarId> for Expression {
    fn from(id: VarId) -> Self {
        Self::Variable(id)
    }
}

impl From<ConstantExpression> for Expression {
    fn from(c: ConstantExpression) -> Self {
        Self::Constant(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_cannot_become_result() {
        let ex = Expression::constant(TypeRef::new("System.Int32"), ConstValue::I32(5));
        assert!(matches!(ex.as_variable(), Err(Error::ConstantResult(_))));
        assert!(ex.is_constant());
    }

    #[test]
    fn table_handles_are_stable() {
        let mut table = VariableTable::new();
        let a = table.add(VariableExpression {
            name: "a".into(),
            ty: TypeRef::new("int"),
            kind: VariableKind::Local,
        });
        let r0 = table.add(VariableExpression {
            name: "$R0".into(),
            ty: TypeRef::new("int"),
            kind: VariableKind::PhysicalRegister(RegisterDescriptor::integer(0)),
        });

        assert_eq!(a.index(), 0);
        assert_eq!(
            table.get(r0).and_then(VariableExpression::register),
            Some(RegisterDescriptor::integer(0))
        );
        assert!(table.lookup(VarId::new(9)).is_err());
        assert!(Expression::from(a).refers_to(a));
    }

    #[test]
    fn display_forms() {
        let path: FieldPath = [
            FieldRef::new(TypeRef::new("Node"), "next"),
            FieldRef::new(TypeRef::new("Node"), "value"),
        ]
        .into_iter()
        .collect();
        assert_eq!(path.to_string(), "next.value");
        assert_eq!(RegisterDescriptor::double(3).to_string(), "D3");
        assert_eq!(
            Expression::constant(TypeRef::new("int"), ConstValue::I32(-2)),
            Expression::Constant(ConstantExpression {
                ty: TypeRef::new("int"),
                value: ConstValue::I32(-2)
            })
        );
    }
}
