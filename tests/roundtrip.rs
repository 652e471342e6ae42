//! XML dump round-trip tests.
//!
//! Methods are written with `XmlDumper` and read back with the two-pass `Parser`; the parsed
//! model must reproduce variables, blocks, operators, debug spans, edges and reaching
//! definitions of the source graph.

use armir::{
    ir::{PlainDumper, RegisterDescriptor},
    prelude::*,
    viewer,
    Error, Result,
};

fn int() -> TypeRef {
    TypeRef::new("System.Int32")
}

/// A three-block method with a handler block, a call and debug spans.
fn sample() -> Result<Method> {
    let mut method = Method::new("Sample::Compute");
    let a = method.add_argument("a", int(), 0);
    let t = method.add_temporary("t", int());
    let r0 = method.add_register(RegisterDescriptor::integer(0), int());

    let entry = method.add_block(BasicBlockKind::Entry);
    let handler = method.add_block(BasicBlockKind::ExceptionHandler);
    let exit = method.add_block(BasicBlockKind::Exit);
    method.add_handler(handler, TypeRef::new("System.Exception"))?;
    method.add_edge(entry, exit, EdgeKind::Fallthrough)?;
    method.add_edge(entry, handler, EdgeKind::Exception)?;
    method.add_edge(handler, exit, EdgeKind::Unconditional)?;

    method.append_operator(
        entry,
        Operator::binary_op_with_shift(
            Alu::Sub,
            true,
            Alu::Shr,
            true,
            t,
            a.into(),
            a.into(),
            Expression::constant(int(), ConstValue::I32(1)),
        )
        .with_debug_info(DebugInfo::new("Sample.cs", "Compute", 10, 5, 10, 21)),
    )?;
    method.append_operator(
        entry,
        Operator::direct_call("Sample::Helper", vec![t], vec![t.into()])
            .with_debug_info(DebugInfo::line("Sample.cs", "Compute", 11)),
    )?;
    method.append_operator(handler, Operator::set_status_register(false, 0x8, t.into()))?;
    method.append_operator(exit, Operator::single_assignment(r0, t.into()))?;
    Ok(method)
}

fn helper() -> Method {
    let mut method = Method::new("Sample::Helper");
    method.add_block(BasicBlockKind::Entry);
    method
}

#[test]
fn dump_and_parse_reproduce_the_graph() -> Result<()> {
    let method = sample()?;
    let xml = XmlDumper::new().dump_methods(&[method.clone(), helper()])?;
    let outcome = Parser::default().parse_str(&xml)?;
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);

    let doc = &outcome.document;
    assert_eq!(doc.methods.len(), 2);
    let parsed = doc.method("Sample::Compute").expect("method missing");

    let variables: Vec<(String, String)> = method
        .variables()
        .iter()
        .map(|(_, v)| (v.name.clone(), v.ty.to_string()))
        .collect();
    let parsed_variables: Vec<(String, String)> = parsed
        .variables
        .iter()
        .map(|v| (v.name.clone(), v.ty.clone()))
        .collect();
    assert_eq!(parsed_variables, variables);
    assert_eq!(parsed.variables[2].name, "$R0");

    let dumper = PlainDumper::for_method(&method);
    assert_eq!(parsed.basic_blocks.len(), method.blocks().len());
    for (block, parsed_block) in method.blocks().iter().zip(&parsed.basic_blocks) {
        assert_eq!(parsed_block.id, block.id().to_string());
        assert_eq!(parsed_block.kind(), block.kind());
        assert_eq!(parsed_block.index, Some(block.id().value()));
        assert_eq!(parsed_block.operators.len(), block.len());

        for (op, parsed_op) in block.operators().iter().zip(&parsed_block.operators) {
            assert_eq!(parsed_op.index, op.id().map(|id| id.value()));
            assert_eq!(parsed_op.ty, op.name());
            assert_eq!(parsed_op.value, op.format_output(&dumper).trim());
            assert_eq!(parsed_op.call.as_deref(), op.call_target());

            match (op.debug_info(), &parsed_op.debug) {
                (Some(expected), Some(actual)) => {
                    assert_eq!(actual.file, &*expected.file);
                    assert_eq!(actual.method_name, &*expected.method_name);
                    assert_eq!(actual.begin_line, expected.begin_line);
                    assert_eq!(actual.begin_column, expected.begin_column);
                    assert_eq!(actual.end_line, expected.end_line);
                    assert_eq!(actual.end_column, expected.end_column);
                }
                (None, None) => {}
                other => panic!("debug span mismatch: {other:?}"),
            }
        }
    }
    assert_eq!(parsed.basic_blocks[1].handlers, ["System.Exception"]);

    let edges: Vec<(String, String, String)> = method
        .edges()
        .iter()
        .map(|e| (e.from.to_string(), e.to.to_string(), e.kind.to_string()))
        .collect();
    let mut parsed_edges: Vec<(String, String, String)> = parsed
        .edges
        .iter()
        .map(|e| {
            let from = parsed.block_at(e.from).map(|b| b.id.clone()).unwrap_or_default();
            let to = parsed.block_at(e.to).map(|b| b.id.clone()).unwrap_or_default();
            (from, to, e.kind.clone())
        })
        .collect();
    let mut edges_sorted = edges;
    edges_sorted.sort();
    parsed_edges.sort();
    assert_eq!(parsed_edges, edges_sorted);

    let call = &parsed.basic_blocks[0].operators[1];
    let target = doc.resolve_call(call).map(|m| m.name.as_str());
    assert_eq!(target, Some("Sample::Helper"));
    Ok(())
}

#[test]
fn reaching_definitions_survive_the_dump() -> Result<()> {
    let method = sample()?;
    let xml = XmlDumper::compact().dump(&method)?;
    let outcome = Parser::default().parse_str(&xml)?;
    let parsed = &outcome.document.methods[0];

    let exit = parsed.block("BB2").expect("exit missing");
    assert_eq!(exit.reaching_definitions.len(), 1);
    let reaching = &exit.reaching_definitions[0];
    assert_eq!(reaching.variable, "t");

    let mut kinds: Vec<&str> = parsed
        .definitions(reaching)
        .map(|op| op.ty.as_str())
        .collect();
    kinds.sort_unstable();
    assert_eq!(kinds, ["DirectCall"]);

    let entry = parsed.block("BB0").expect("entry missing");
    assert!(entry.reaching_definitions.is_empty());
    Ok(())
}

#[test]
fn forward_edges_resolve_to_later_blocks() -> Result<()> {
    let xml = r#"
        <Methods>
          <Method Name="Forward">
            <BasicBlock Id="L0" Index="0" Type="EntryBasicBlock">
              <Edge From="L0" To="L2" Kind="BranchTaken"/>
              <Edge From="L0" To="L1" Kind="BranchNotTaken"/>
              <Operator Index="0" Type="Breakpoint">breakpoint 0x1</Operator>
            </BasicBlock>
            <BasicBlock Id="L1" Index="1" Type="NormalBasicBlock">
              <ReachingDefinition Variable="x"><Definition Index="7"/></ReachingDefinition>
            </BasicBlock>
            <Edge From="L1" To="L2" Kind="Fallthrough"/>
            <BasicBlock Id="L2" Index="2" Type="ExitBasicBlock">
              <Operator Index="7" Type="GetStatusRegister">x = &lt;CPSR&gt;</Operator>
            </BasicBlock>
          </Method>
        </Methods>"#;

    let outcome = viewer::Parser::new(ParserConfig::strict()).parse_str(xml)?;
    let method = &outcome.document.methods[0];

    assert_eq!(method.edges.len(), 3);
    let taken = &method.edges[0];
    assert_eq!(taken.from.position(), 0);
    assert_eq!(method.block_at(taken.to).map(|b| b.id.as_str()), Some("L2"));
    assert_eq!(method.block_at(taken.to).map(|b| b.kind()), Some(BasicBlockKind::Exit));

    let l2 = method.block_ref("L2").expect("L2 missing");
    assert_eq!(method.edges_to(l2).count(), 2);
    assert_eq!(method.edges_from(l2).count(), 0);

    let l1 = &method.basic_blocks[1];
    let defs: Vec<_> = method.definitions(&l1.reaching_definitions[0]).collect();
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].value, "x = <CPSR>");
    Ok(())
}

#[test]
fn dump_file_parses_back() -> Result<()> {
    let path = std::env::temp_dir().join(format!("armir-roundtrip-{}.xml", std::process::id()));
    XmlDumper::default().dump_to_file(&[sample()?, helper()], &path)?;

    let outcome = Parser::default().parse_file(&path);
    std::fs::remove_file(&path)?;
    let outcome = outcome?;

    let names: Vec<&str> = outcome.document.methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["Sample::Compute", "Sample::Helper"]);
    assert_eq!(outcome.document.methods[0].operators().count(), 4);
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let path = std::env::temp_dir().join("armir-does-not-exist.xml");
    let result = Parser::default().parse_file(&path);
    assert!(matches!(result, Err(Error::FileError(_))));
}
