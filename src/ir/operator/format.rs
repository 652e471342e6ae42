//! Textual rendering of operators.
//!
//! Every kind builds a template with `{n}` placeholders and hands it, together with its
//! operands, to [`IrDumper::format_output`]. How variables and constants are named is entirely
//! up to the dumper.

use std::fmt::Write;

use crate::ir::{Expression, FormatArg, IrDumper, Operator, OperatorKind, VarId};

/// Incrementally built template with its positional arguments.
struct Template<'a> {
    text: String,
    args: Vec<FormatArg<'a>>,
}

impl<'a> Template<'a> {
    fn new() -> Self {
        Self {
            text: String::new(),
            args: Vec::new(),
        }
    }

    fn lit(mut self, text: &str) -> Self {
        self.text.push_str(text);
        self
    }

    fn arg(mut self, arg: FormatArg<'a>) -> Self {
        let _ = write!(self.text, "{{{}}}", self.args.len());
        self.args.push(arg);
        self
    }

    fn var(self, id: VarId) -> Self {
        self.arg(FormatArg::Variable(id))
    }

    fn expr(self, expression: &'a Expression) -> Self {
        self.arg(FormatArg::Expression(expression))
    }

    fn text(self, text: impl Into<String>) -> Self {
        self.arg(FormatArg::Text(text.into()))
    }

    fn opt_var(self, id: Option<VarId>) -> Self {
        match id {
            Some(id) => self.var(id),
            None => self.text("-"),
        }
    }

    fn opt_expr(self, expression: Option<&'a Expression>) -> Self {
        match expression {
            Some(e) => self.expr(e),
            None => self.text("-"),
        }
    }

    fn vars(mut self, ids: &[VarId]) -> Self {
        for (i, id) in ids.iter().enumerate() {
            if i > 0 {
                self = self.lit(", ");
            }
            self = self.var(*id);
        }
        self
    }

    fn exprs(mut self, expressions: &'a [Expression]) -> Self {
        for (i, e) in expressions.iter().enumerate() {
            if i > 0 {
                self = self.lit(", ");
            }
            self = self.expr(e);
        }
        self
    }

    fn render(self, dumper: &dyn IrDumper) -> String {
        dumper.format_output(&self.text, &self.args)
    }
}

fn signedness(signed: bool) -> &'static str {
    if signed {
        ".signed"
    } else {
        ".unsigned"
    }
}

fn status_register(use_spsr: bool) -> &'static str {
    if use_spsr {
        "SPSR"
    } else {
        "CPSR"
    }
}

impl Operator {
    /// Renders the operator as one line of text.
    ///
    /// Pure; the dumper decides how operands are named.
    #[must_use]
    pub fn format_output(&self, dumper: &dyn IrDumper) -> String {
        let res = |i: usize| self.lhs.get(i).copied();
        let arg = |i: usize| self.rhs.get(i);

        let t = Template::new();
        let t = match &self.kind {
            OperatorKind::SingleAssignment(_) => t.vars(&self.lhs).lit(" = ").exprs(&self.rhs),
            OperatorKind::DirectCall(call) => {
                let t = if self.lhs.is_empty() {
                    t
                } else {
                    t.vars(&self.lhs).lit(" = ")
                };
                t.lit("call ")
                    .text(call.target_name())
                    .lit("(")
                    .exprs(&self.rhs)
                    .lit(")")
            }
            OperatorKind::BinaryOpWithShift(p) => t
                .opt_var(res(0))
                .lit(" = ")
                .opt_expr(arg(0))
                .lit(" ")
                .text(format!("{}{}", p.alu(), signedness(p.signed())))
                .lit(" (")
                .opt_expr(arg(1))
                .lit(" ")
                .text(format!("{}{}", p.shift_alu(), signedness(p.shift_signed())))
                .lit(" ")
                .opt_expr(arg(2))
                .lit(")"),
            OperatorKind::Breakpoint(p) => t.lit("breakpoint ").text(format!("0x{:X}", p.value())),
            OperatorKind::GetStatusRegister(p) => t
                .opt_var(res(0))
                .lit(" = <")
                .text(status_register(p.use_spsr()))
                .lit(">"),
            OperatorKind::SetStatusRegister(p) => t
                .lit("<")
                .text(status_register(p.use_spsr()))
                .lit(" fields ")
                .text(format!("0x{:X}", p.fields()))
                .lit("> = ")
                .opt_expr(arg(0)),
            OperatorKind::LoadIndirectWithIndexUpdate(p) => {
                let t = t
                    .opt_var(res(0))
                    .lit(" = ")
                    .text(if self.is_volatile() { "volatile " } else { "" })
                    .lit("load ")
                    .text(p.ty().to_string());
                let t = if p.access_path().is_empty() {
                    t
                } else {
                    t.lit(".").text(p.access_path().to_string())
                };
                t.lit(" [")
                    .opt_expr(arg(0))
                    .lit(" + ")
                    .text(p.offset().to_string())
                    .lit("], ")
                    .opt_var(res(1))
                    .lit(" = ")
                    .opt_expr(arg(0))
                    .lit(" + ")
                    .opt_expr(arg(1))
                    .lit(if p.post_update() { " post" } else { " pre" })
            }
            OperatorKind::StoreIndirectWithIndexUpdate(p) => {
                let t = t
                    .text(if self.is_volatile() { "volatile " } else { "" })
                    .lit("store ")
                    .text(p.ty().to_string());
                let t = if p.access_path().is_empty() {
                    t
                } else {
                    t.lit(".").text(p.access_path().to_string())
                };
                t.lit(" [")
                    .opt_expr(arg(0))
                    .lit(" + ")
                    .text(p.offset().to_string())
                    .lit("] = ")
                    .opt_expr(arg(2))
                    .lit(", ")
                    .opt_var(res(0))
                    .lit(" = ")
                    .opt_expr(arg(0))
                    .lit(" + ")
                    .opt_expr(arg(1))
                    .lit(if p.post_update() { " post" } else { " pre" })
            }
            OperatorKind::MoveIntegerRegisters(p) => t
                .lit(if p.load() { "ldm " } else { "stm " })
                .opt_expr(arg(0))
                .lit(" {")
                .text(format!("0x{:04X}", p.register_mask()))
                .lit("}")
                .lit(if p.add_computed_registers() { " +computed" } else { "" })
                .lit(if p.restore_spsr() { " ^" } else { "" })
                .lit(" -> ")
                .opt_var(res(0)),
            OperatorKind::MoveFloatingPointRegisters(p) => t
                .lit(if p.load() { "fldm " } else { "fstm " })
                .opt_expr(arg(0))
                .lit(" {")
                .text(p.first_register().to_string())
                .lit(" x")
                .text(p.register_count().to_string())
                .lit("}")
                .lit(if p.add_computed_registers() { " +computed" } else { "" })
                .lit(" -> ")
                .opt_var(res(0)),
            OperatorKind::MoveStackPointer(p) => {
                t.lit(if p.push() { "push sp" } else { "pop sp" })
            }
            OperatorKind::MoveToCoprocessor(p) => t
                .lit("mcr ")
                .text(format!(
                    "p{}, {}, c{}, c{}, {}",
                    p.cp_num(),
                    p.op1(),
                    p.crn(),
                    p.crm(),
                    p.op2()
                ))
                .lit(" <- ")
                .opt_expr(arg(0)),
            OperatorKind::VectorHackInitialize(p) => {
                t.lit("vector initialize size ").text(p.size().to_string())
            }
            OperatorKind::VectorHackPrepare(p) => t
                .lit("vector prepare ")
                .text(p.result_bank_base().to_string())
                .lit(" size ")
                .text(p.size().to_string()),
            OperatorKind::VectorHackLoadData(p) => t
                .lit("vector load ")
                .text(p.destination_bank_base().to_string())
                .lit(" size ")
                .text(p.size().to_string())
                .lit(" from ")
                .opt_expr(arg(0)),
            OperatorKind::VectorHackMultiplyAndAccumulate(p) => t
                .lit("vector mac ")
                .text(p.result_bank_base().to_string())
                .lit(" += ")
                .text(p.left_bank_base().to_string())
                .lit(" * ")
                .text(p.right_bank_base().to_string())
                .lit(" size ")
                .text(p.size().to_string()),
            OperatorKind::VectorHackFinalize(p) => t
                .opt_var(res(0))
                .lit(" = vector finalize ")
                .text(p.result_bank_base().to_string())
                .lit(" size ")
                .text(p.size().to_string()),
            OperatorKind::VectorHackCleanup(p) => {
                t.lit("vector cleanup size ").text(p.size().to_string())
            }
        };

        t.render(dumper)
    }
}
