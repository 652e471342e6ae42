//! Two-pass parser for XML dumps.
//!
//! Pass 1 walks the element tree and builds every method, block and operator, filling the
//! lookup tables (block label to position, operator index to position). Edges and reaching
//! definitions are only collected. Pass 2 resolves the collected references against the
//! finished tables, which are no longer modified, so a reference may name a block or operator
//! that appears later in the document.
//!
//! Errors local to one node (a malformed numeric attribute, a repeated block id, a reference
//! that does not resolve) drop that node, are logged at `warn` and are returned as
//! diagnostics. With [`ParserConfig::strict`] the first such error fails the whole parse.

use std::{collections::HashMap, path::Path};

use crate::{
    viewer::{
        model::{
            BasicBlock, BasicBlockEdge, BlockRef, Debug, Document, Method, Operator, OperatorRef,
            ReachingDefinition, Variable,
        },
        xmltree::{parse_document, Element},
    },
    Error, ParserConfig, Result,
};

/// Result of a successful parse.
#[derive(Debug)]
pub struct ParseOutcome {
    /// The parsed methods
    pub document: Document,
    /// Per-node errors; each one dropped the node it names
    pub diagnostics: Vec<Error>,
}

/// Collects per-node errors.
struct Diagnostics {
    strict: bool,
    errors: Vec<Error>,
}

impl Diagnostics {
    fn report(&mut self, error: Error) -> Result<()> {
        if self.strict {
            return Err(error);
        }
        log::warn!("skipping node: {error}");
        self.errors.push(error);
        Ok(())
    }
}

/// An edge waiting for pass 2.
struct PendingEdge {
    from: String,
    to: String,
    kind: String,
}

/// A reaching definition waiting for pass 2.
struct PendingReaching {
    block: usize,
    variable: String,
    indices: Vec<u32>,
}

/// Lookup tables built by pass 1.
#[derive(Default)]
struct LookupTables {
    blocks: HashMap<String, BlockRef>,
    operators: HashMap<u32, OperatorRef>,
}

/// Reads the optional numeric attribute `name`.
fn numeric(node: &Element, name: &str) -> Result<Option<u32>> {
    match node.attr(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(|_| Error::MalformedAttribute {
                node: node.name.clone(),
                attribute: name.to_string(),
                value: raw.to_string(),
            }),
    }
}

fn text(node: &Element, name: &str) -> String {
    node.attr(name).unwrap_or_default().to_string()
}

/// Parser for XML dumps.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Creates a parser.
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parses a dump held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Xml`] if the document is not well-formed. In strict mode the first
    /// [`Error::MalformedAttribute`] or [`Error::DanglingReference`] is returned as well.
    pub fn parse_str(&self, xml: &str) -> Result<ParseOutcome> {
        let root = parse_document(xml)?;
        let mut diagnostics = Diagnostics {
            strict: self.config.strict,
            errors: Vec::new(),
        };

        let method_nodes: Vec<&Element> = if root.name == "Method" {
            vec![&root]
        } else {
            root.children_named("Method").collect()
        };

        let mut methods = Vec::with_capacity(method_nodes.len());
        for node in method_nodes {
            methods.push(Self::parse_method(node, &mut diagnostics)?);
        }

        log::debug!(
            "parsed {} methods, {} diagnostics",
            methods.len(),
            diagnostics.errors.len()
        );

        Ok(ParseOutcome {
            document: Document { methods },
            diagnostics: diagnostics.errors,
        })
    }

    /// Reads and parses a dump file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileError`] if the file cannot be read, otherwise as
    /// [`Parser::parse_str`].
    pub fn parse_file(&self, path: &Path) -> Result<ParseOutcome> {
        let xml = std::fs::read_to_string(path)?;
        self.parse_str(&xml)
    }

    fn parse_method(node: &Element, diagnostics: &mut Diagnostics) -> Result<Method> {
        let mut method = Method {
            name: text(node, "Name"),
            ..Method::default()
        };

        let mut tables = LookupTables::default();
        let mut edges = Vec::new();
        let mut reaching = Vec::new();

        // Pass 1
        for child in &node.children {
            match child.name.as_str() {
                "Variable" => method.variables.push(Variable {
                    name: text(child, "Name"),
                    ty: text(child, "Type"),
                }),
                "BasicBlock" => {
                    let position = method.basic_blocks.len();
                    let block = Self::parse_block(
                        child,
                        position,
                        &mut tables,
                        &mut edges,
                        &mut reaching,
                        diagnostics,
                    )?;
                    method.basic_blocks.extend(block);
                }
                "Edge" => Self::collect_edge(child, &mut edges),
                _ => {}
            }
        }

        // Pass 2
        let tables = &tables;
        for edge in edges {
            match (tables.blocks.get(&edge.from), tables.blocks.get(&edge.to)) {
                (Some(&from), Some(&to)) => method.edges.push(BasicBlockEdge {
                    from,
                    to,
                    kind: edge.kind,
                }),
                (from, _) => {
                    let id = if from.is_none() { edge.from } else { edge.to };
                    diagnostics.report(Error::DanglingReference {
                        node: "Edge".to_string(),
                        kind: "BasicBlock",
                        id,
                    })?;
                }
            }
        }

        for pending in reaching {
            let mut definitions = Vec::with_capacity(pending.indices.len());
            for index in pending.indices {
                match tables.operators.get(&index) {
                    Some(&op) => definitions.push(op),
                    None => diagnostics.report(Error::DanglingReference {
                        node: "Definition".to_string(),
                        kind: "Operator",
                        id: index.to_string(),
                    })?,
                }
            }

            if let Some(block) = method.basic_blocks.get_mut(pending.block) {
                block.reaching_definitions.push(ReachingDefinition {
                    variable: pending.variable,
                    definitions,
                });
            }
        }

        Ok(method)
    }

    fn collect_edge(node: &Element, edges: &mut Vec<PendingEdge>) {
        edges.push(PendingEdge {
            from: text(node, "From"),
            to: text(node, "To"),
            kind: text(node, "Kind"),
        });
    }

    fn parse_block(
        node: &Element,
        position: usize,
        tables: &mut LookupTables,
        edges: &mut Vec<PendingEdge>,
        reaching: &mut Vec<PendingReaching>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<BasicBlock>> {
        let index = match numeric(node, "Index") {
            Ok(index) => index,
            Err(error) => {
                diagnostics.report(error)?;
                return Ok(None);
            }
        };

        let id = text(node, "Id");
        if tables.blocks.contains_key(&id) {
            diagnostics.report(Error::DuplicateId {
                node: node.name.clone(),
                id,
            })?;
            return Ok(None);
        }
        tables.blocks.insert(id.clone(), BlockRef(position));

        let mut block = BasicBlock {
            id,
            index,
            ty: text(node, "Type"),
            ..BasicBlock::default()
        };

        for child in &node.children {
            match child.name.as_str() {
                "Operator" => {
                    if let Some(op) = Self::parse_operator(child, diagnostics)? {
                        if let Some(index) = op.index {
                            tables.operators.entry(index).or_insert(OperatorRef {
                                block: BlockRef(position),
                                position: block.operators.len(),
                            });
                        }
                        block.operators.push(op);
                    }
                }
                "ReachingDefinition" => {
                    let mut indices = Vec::new();
                    for def in child.children_named("Definition") {
                        match numeric(def, "Index") {
                            Ok(Some(index)) => indices.push(index),
                            Ok(None) => {}
                            Err(error) => diagnostics.report(error)?,
                        }
                    }
                    reaching.push(PendingReaching {
                        block: position,
                        variable: text(child, "Variable"),
                        indices,
                    });
                }
                "HandlerFor" => block.handlers.push(text(child, "Type")),
                "Edge" => Self::collect_edge(child, edges),
                _ => {}
            }
        }

        Ok(Some(block))
    }

    fn parse_operator(node: &Element, diagnostics: &mut Diagnostics) -> Result<Option<Operator>> {
        let index = match numeric(node, "Index") {
            Ok(index) => index,
            Err(error) => {
                diagnostics.report(error)?;
                return Ok(None);
            }
        };

        let mut debug = None;
        if let Some(child) = node.children_named("Debug").next() {
            match Self::parse_debug(child) {
                Ok(parsed) => debug = Some(parsed),
                Err(error) => diagnostics.report(error)?,
            }
        }

        Ok(Some(Operator {
            index,
            ty: text(node, "Type"),
            value: node.text.clone(),
            call: node.attr("Call").map(str::to_string),
            debug,
        }))
    }

    fn parse_debug(node: &Element) -> Result<Debug> {
        Ok(Debug {
            file: text(node, "File"),
            method_name: text(node, "MethodName"),
            begin_line: numeric(node, "BeginLine")?.unwrap_or(0),
            begin_column: numeric(node, "BeginColumn")?.unwrap_or(0),
            end_line: numeric(node, "EndLine")?.unwrap_or(0),
            end_column: numeric(node, "EndColumn")?.unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::BasicBlockKind;

    const DUMP: &str = r#"
        <Methods>
          <Method Name="Sample">
            <Variable Name="x" Type="int"/>
            <BasicBlock Id="BB0" Index="0" Type="EntryBasicBlock">
              <Edge From="BB0" To="BB1" Kind="Unconditional"/>
              <Operator Index="0" Type="GetStatusRegister">x = CPSR</Operator>
            </BasicBlock>
            <BasicBlock Id="BB1" Index="1" Type="ExitBasicBlock">
              <ReachingDefinition Variable="x"><Definition Index="0"/></ReachingDefinition>
              <Operator Index="1" Type="SetStatusRegister">
                <Debug File="a.cs" BeginLine="3" BeginColumn="1" EndLine="3" EndColumn="9"/>
                CPSR[0x1] = x
              </Operator>
            </BasicBlock>
          </Method>
        </Methods>"#;

    #[test]
    fn parses_and_resolves() -> Result<()> {
        let outcome = Parser::default().parse_str(DUMP)?;
        assert!(outcome.diagnostics.is_empty());

        let method = outcome.document.method("Sample").expect("missing method");
        assert_eq!(method.basic_blocks.len(), 2);
        assert_eq!(method.edges.len(), 1);
        assert_eq!(method.edges[0].to, BlockRef(1));

        let exit = &method.basic_blocks[1];
        let defs: Vec<_> = method.definitions(&exit.reaching_definitions[0]).collect();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].value, "x = CPSR");

        let debug = exit.operators[0].debug.as_ref().expect("no debug");
        assert_eq!(debug.begin_line, 3);
        assert_eq!(debug.method_name, "");
        assert_eq!(exit.operators[0].value, "CPSR[0x1] = x");
        Ok(())
    }

    #[test]
    fn malformed_nodes_are_dropped() -> Result<()> {
        let dump = r#"
            <Methods><Method Name="m">
              <BasicBlock Id="BB0" Type="EntryBasicBlock">
                <Operator Index="zero" Type="Breakpoint">bkpt</Operator>
                <Operator Type="Breakpoint">bkpt 2</Operator>
                <Edge From="BB0" To="BB9" Kind="Fallthrough"/>
              </BasicBlock>
            </Method></Methods>"#;

        let outcome = Parser::default().parse_str(dump)?;
        let block = &outcome.document.methods[0].basic_blocks[0];
        assert_eq!(block.index, None);
        assert_eq!(block.operators.len(), 1);
        assert_eq!(block.operators[0].index, None);
        assert!(outcome.document.methods[0].edges.is_empty());

        assert!(matches!(
            &outcome.diagnostics[0],
            Error::MalformedAttribute { attribute, value, .. }
                if attribute == "Index" && value == "zero"
        ));
        assert!(matches!(
            &outcome.diagnostics[1],
            Error::DanglingReference { id, .. } if id == "BB9"
        ));

        assert!(Parser::new(ParserConfig::strict()).parse_str(dump).is_err());
        Ok(())
    }

    #[test]
    fn malformed_spans_and_definitions_are_dropped() -> Result<()> {
        let bad_span = r#"
            <Method Name="m">
              <BasicBlock Id="BB0" Index="0" Type="EntryBasicBlock">
                <Operator Index="0" Type="Breakpoint">
                  <Debug File="a.cs" BeginLine="ten" EndLine="12"/>
                  breakpoint 0x0
                </Operator>
                <Operator Index="1" Type="Breakpoint">breakpoint 0x1</Operator>
              </BasicBlock>
            </Method>"#;
        let bad_definition = r#"
            <Method Name="m">
              <BasicBlock Id="BB0" Index="0" Type="EntryBasicBlock">
                <ReachingDefinition Variable="x">
                  <Definition Index="q"/>
                  <Definition Index="0"/>
                </ReachingDefinition>
                <Operator Index="0" Type="GetStatusRegister">x = CPSR</Operator>
              </BasicBlock>
            </Method>"#;

        let outcome = Parser::default().parse_str(bad_span)?;
        let block = &outcome.document.methods[0].basic_blocks[0];
        assert_eq!(block.operators.len(), 2);
        assert_eq!(block.operators[0].index, Some(0));
        assert_eq!(block.operators[0].value, "breakpoint 0x0");
        assert!(block.operators[0].debug.is_none());
        assert!(matches!(
            &outcome.diagnostics[..],
            [Error::MalformedAttribute { node, attribute, value }]
                if node == "Debug" && attribute == "BeginLine" && value == "ten"
        ));

        let outcome = Parser::default().parse_str(bad_definition)?;
        let method = &outcome.document.methods[0];
        let reaching = &method.basic_blocks[0].reaching_definitions[0];
        assert_eq!(reaching.definitions.len(), 1);
        let defs: Vec<_> = method.definitions(reaching).collect();
        assert_eq!(defs[0].value, "x = CPSR");
        assert!(matches!(
            &outcome.diagnostics[..],
            [Error::MalformedAttribute { node, attribute, value }]
                if node == "Definition" && attribute == "Index" && value == "q"
        ));

        let strict = Parser::new(ParserConfig::strict());
        for dump in [bad_span, bad_definition] {
            assert!(matches!(
                strict.parse_str(dump),
                Err(Error::MalformedAttribute { .. })
            ));
        }
        Ok(())
    }

    #[test]
    fn duplicate_block_ids_are_reported() -> Result<()> {
        let dump = r#"
            <Method Name="m">
              <BasicBlock Id="BB0" Index="0" Type="EntryBasicBlock">
                <Operator Index="0" Type="Breakpoint">breakpoint 0x0</Operator>
              </BasicBlock>
              <BasicBlock Id="BB0" Index="1" Type="ExitBasicBlock">
                <Operator Index="1" Type="Breakpoint">breakpoint 0x1</Operator>
              </BasicBlock>
              <BasicBlock Id="BB1" Index="2" Type="ExitBasicBlock"/>
              <Edge From="BB0" To="BB1" Kind="Fallthrough"/>
            </Method>"#;

        let outcome = Parser::default().parse_str(dump)?;
        let method = &outcome.document.methods[0];
        assert_eq!(method.basic_blocks.len(), 2);
        assert_eq!(method.basic_blocks[0].kind(), BasicBlockKind::Entry);
        assert!(method.find_operator(1).is_none());
        assert_eq!(method.edges[0].from, BlockRef(0));
        assert_eq!(method.edges[0].to, BlockRef(1));
        assert!(matches!(
            &outcome.diagnostics[..],
            [Error::DuplicateId { node, id }] if node == "BasicBlock" && id == "BB0"
        ));

        assert!(matches!(
            Parser::new(ParserConfig::strict()).parse_str(dump),
            Err(Error::DuplicateId { .. })
        ));
        Ok(())
    }
}
