//! Rendering of operators and methods as text.
//!
//! [`IrDumper`] is the single formatting seam: operators describe themselves as a template with
//! `{n}` placeholders plus positional [`FormatArg`]s, and the dumper decides how variables and
//! constants are named. [`PlainDumper`] names variables from a method's variable table,
//! [`TextDumper`] renders whole methods.

use std::fmt::Write;

use crate::ir::{ConstantExpression, Expression, Method, VarId, VariableTable};

/// One positional argument of an operator template.
#[derive(Debug, Clone)]
pub enum FormatArg<'a> {
    /// A result operand
    Variable(VarId),
    /// An argument operand
    Expression(&'a Expression),
    /// Payload text, inserted verbatim
    Text(String),
}

/// Renders operator templates.
pub trait IrDumper {
    /// Returns the display name of a variable.
    fn create_name(&self, var: VarId) -> String;

    /// Returns the display form of a constant.
    fn format_constant(&self, constant: &ConstantExpression) -> String {
        constant.to_string()
    }

    /// Substitutes every `{n}` placeholder of `template` with the rendered argument `n`.
    ///
    /// Placeholders without a matching argument are kept as they are.
    fn format_output(&self, template: &str, args: &[FormatArg<'_>]) -> String {
        let mut out = String::with_capacity(template.len() + args.len() * 8);
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];

            let placeholder = after
                .find('}')
                .and_then(|end| after[..end].parse::<usize>().ok().map(|n| (n, end)));

            match placeholder.and_then(|(n, end)| args.get(n).map(|a| (a, end))) {
                Some((arg, end)) => {
                    out.push_str(&self.render_arg(arg));
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Renders a single argument.
    fn render_arg(&self, arg: &FormatArg<'_>) -> String {
        match arg {
            FormatArg::Variable(id) => self.create_name(*id),
            FormatArg::Expression(Expression::Variable(id)) => self.create_name(*id),
            FormatArg::Expression(Expression::Constant(c)) => self.format_constant(c),
            FormatArg::Text(text) => text.clone(),
        }
    }
}

/// Names variables by their handle (`v0`, `v1`, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct HandleDumper;

impl IrDumper for HandleDumper {
    fn create_name(&self, var: VarId) -> String {
        var.to_string()
    }
}

/// Names variables from a variable table; unknown handles fall back to `v<n>`.
#[derive(Debug, Clone, Copy)]
pub struct PlainDumper<'a> {
    variables: &'a VariableTable,
}

impl<'a> PlainDumper<'a> {
    /// Creates a dumper for the given table.
    #[must_use]
    pub fn new(variables: &'a VariableTable) -> Self {
        Self { variables }
    }

    /// Creates a dumper for the variables of a method.
    #[must_use]
    pub fn for_method(method: &'a Method) -> Self {
        Self::new(method.variables())
    }
}

impl IrDumper for PlainDumper<'_> {
    fn create_name(&self, var: VarId) -> String {
        match self.variables.get(var) {
            Some(v) => v.name.clone(),
            None => var.to_string(),
        }
    }
}

/// Renders a whole method as indented text.
///
/// ```text
/// Method Sample::Add
///   a : System.Int32
///   BB0 [EntryBasicBlock]
///     0: a = ...
///     -> BB1 (Unconditional)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDumper;

impl TextDumper {
    /// Renders `method`.
    #[must_use]
    pub fn dump(&self, method: &Method) -> String {
        let dumper = PlainDumper::for_method(method);
        let mut out = String::new();

        let _ = writeln!(out, "Method {}", method.name());
        for (_, var) in method.variables().iter() {
            let _ = writeln!(out, "  {} : {}", var.name, var.ty);
        }

        for block in method.blocks() {
            let _ = writeln!(out, "  {} [{}]", block.id(), block.kind());
            for handler in block.handlers() {
                let _ = writeln!(out, "    handler for {handler}");
            }
            for op in block.operators() {
                let index = op.id().map_or_else(|| "-".to_string(), |id| id.to_string());
                let _ = writeln!(out, "    {}: {}", index, op.format_output(&dumper));
            }
            for edge in method.edges_from(block.id()) {
                let _ = writeln!(out, "    -> {} ({})", edge.to, edge.kind);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ConstValue, TypeRef};

    #[test]
    fn placeholders_are_substituted() {
        let c = Expression::constant(TypeRef::new("int"), ConstValue::I32(3));
        let out = HandleDumper.format_output(
            "{0} = {1} + {2} {9} {x}",
            &[
                FormatArg::Variable(VarId::new(0)),
                FormatArg::Expression(&c),
                FormatArg::Text("tail".into()),
            ],
        );
        assert_eq!(out, "v0 = $Const(int 3) + tail {9} {x}");
    }
}
