//! XML dumps of methods.
//!
//! Produces the document consumed by [`viewer::Parser`](crate::viewer::Parser):
//!
//! ```text
//! Methods
//!   Method(Name)
//!     Variable(Name, Type)*
//!     BasicBlock(Id, Index, Type)*
//!       Edge(From, To, Kind)*
//!       ReachingDefinition(Variable)*
//!         Definition(Index)*
//!       HandlerFor(Type)*
//!       Operator(Index, Type, Call?)*
//!         Debug(File, MethodName, BeginLine, BeginColumn, EndLine, EndColumn)?
//!         text
//! ```
//!
//! Edges are listed under their source block. Reaching definitions are emitted for every
//! variable the block reads, naming the operators whose definition reaches the block entry.

use std::path::Path;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};

use crate::{
    analysis::ReachingDefinitions,
    ir::{BasicBlock, DebugInfo, IrDumper, Method, Operator, PlainDumper, VarId},
    Error, Result,
};

struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl XmlWriter {
    fn new(indent: Option<usize>) -> Self {
        let inner = match indent {
            Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
            None => Writer::new(Vec::new()),
        };
        Self { inner }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| Error::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.event(Event::Start(element))
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.event(Event::Empty(element))
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.event(Event::Text(BytesText::new(text)))
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| Error::Xml(e.to_string()))
    }
}

/// Writes methods as an XML dump.
#[derive(Debug, Clone, Copy)]
pub struct XmlDumper {
    indent: Option<usize>,
}

impl Default for XmlDumper {
    fn default() -> Self {
        Self { indent: Some(2) }
    }
}

impl XmlDumper {
    /// Creates a dumper producing indented output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a dumper producing a single line.
    #[must_use]
    pub fn compact() -> Self {
        Self { indent: None }
    }

    /// Dumps one method.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] if the writer fails.
    pub fn dump(&self, method: &Method) -> Result<String> {
        self.dump_methods(std::slice::from_ref(method))
    }

    /// Dumps several methods into one document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] if the writer fails.
    pub fn dump_methods(&self, methods: &[Method]) -> Result<String> {
        let mut w = XmlWriter::new(self.indent);
        w.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        w.start("Methods", &[])?;
        for method in methods {
            write_method(&mut w, method)?;
        }
        w.end("Methods")?;
        w.finish()
    }

    /// Dumps several methods into a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] if the writer fails and [`Error::FileError`] if the file cannot
    /// be written.
    pub fn dump_to_file(&self, methods: &[Method], path: &Path) -> Result<()> {
        let xml = self.dump_methods(methods)?;
        std::fs::write(path, xml)?;
        Ok(())
    }
}

fn write_method(w: &mut XmlWriter, method: &Method) -> Result<()> {
    w.start("Method", &[("Name", method.name())])?;

    for (_, var) in method.variables().iter() {
        let ty = var.ty.to_string();
        w.empty("Variable", &[("Name", var.name.as_str()), ("Type", ty.as_str())])?;
    }

    let reaching = ReachingDefinitions::compute(method);
    for (index, block) in method.blocks().iter().enumerate() {
        write_block(w, method, &reaching, index, block)?;
    }

    w.end("Method")
}

fn write_block(
    w: &mut XmlWriter,
    method: &Method,
    reaching: &ReachingDefinitions,
    index: usize,
    block: &BasicBlock,
) -> Result<()> {
    let id = block.id().to_string();
    let index = index.to_string();
    let kind = block.kind().to_string();
    w.start(
        "BasicBlock",
        &[
            ("Id", id.as_str()),
            ("Index", index.as_str()),
            ("Type", kind.as_str()),
        ],
    )?;

    for edge in method.edges_from(block.id()) {
        let from = edge.from.to_string();
        let to = edge.to.to_string();
        let kind = edge.kind.to_string();
        w.empty(
            "Edge",
            &[
                ("From", from.as_str()),
                ("To", to.as_str()),
                ("Kind", kind.as_str()),
            ],
        )?;
    }

    let dumper = PlainDumper::for_method(method);

    let mut used: Vec<VarId> = Vec::new();
    for op in block.operators() {
        for var in op.arguments().iter().filter_map(|e| e.var()) {
            if !used.contains(&var) {
                used.push(var);
            }
        }
    }
    for var in used {
        let defs = reaching.reaching(block.id(), var);
        if defs.is_empty() {
            continue;
        }

        let name = dumper.create_name(var);
        w.start("ReachingDefinition", &[("Variable", name.as_str())])?;
        for def in defs {
            let index = def.to_string();
            w.empty("Definition", &[("Index", index.as_str())])?;
        }
        w.end("ReachingDefinition")?;
    }

    for handler in block.handlers() {
        w.empty("HandlerFor", &[("Type", handler.name())])?;
    }

    for op in block.operators() {
        write_operator(w, op, &dumper)?;
    }

    w.end("BasicBlock")
}

fn write_operator(w: &mut XmlWriter, op: &Operator, dumper: &PlainDumper<'_>) -> Result<()> {
    let index = op.id().map(|id| id.to_string()).unwrap_or_default();
    let text = op.format_output(dumper);

    for line in text.split('\n') {
        let mut attributes = vec![("Index", index.as_str()), ("Type", op.name())];
        if let Some(target) = op.call_target() {
            attributes.push(("Call", target));
        }

        w.start("Operator", &attributes)?;
        if let Some(debug) = op.debug_info() {
            write_debug(w, debug)?;
        }
        w.text(line)?;
        w.end("Operator")?;
    }
    Ok(())
}

fn write_debug(w: &mut XmlWriter, debug: &DebugInfo) -> Result<()> {
    let begin_line = debug.begin_line.to_string();
    let begin_column = debug.begin_column.to_string();
    let end_line = debug.end_line.to_string();
    let end_column = debug.end_column.to_string();

    w.empty(
        "Debug",
        &[
            ("File", &*debug.file),
            ("MethodName", &*debug.method_name),
            ("BeginLine", begin_line.as_str()),
            ("BeginColumn", begin_column.as_str()),
            ("EndLine", end_line.as_str()),
            ("EndColumn", end_column.as_str()),
        ],
    )
}
