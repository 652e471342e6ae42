//! End-to-end tests of the pass pipeline.

use armir::{compiler::EventKind, prelude::*, Result};

fn int() -> TypeRef {
    TypeRef::new("System.Int32")
}

/// `t = a; u = t SUB (t SHL 1); R0 = u`
///
/// Copy propagation rewrites `u` to read `a`, which leaves `t = a` dead.
fn copy_then_use() -> Result<Method> {
    let mut method = Method::new("Pipeline::CopyThenUse");
    let a = method.add_argument("a", int(), 0);
    let t = method.add_temporary("t", int());
    let u = method.add_temporary("u", int());
    let r0 = method.add_register(RegisterDescriptor::integer(0), int());
    let entry = method.add_block(BasicBlockKind::Entry);

    method.append_operator(entry, Operator::single_assignment(t, a.into()))?;
    method.append_operator(
        entry,
        Operator::binary_op_with_shift(
            Alu::Sub,
            true,
            Alu::Shl,
            false,
            u,
            t.into(),
            t.into(),
            Expression::constant(int(), ConstValue::I32(1)),
        ),
    )?;
    method.append_operator(entry, Operator::single_assignment(r0, u.into()))?;
    Ok(method)
}

/// `t = a; w = t; breakpoint`
///
/// Both copies die once `w` reads `a` directly and nothing reads `w`.
fn dead_chain() -> Result<Method> {
    let mut method = Method::new("Pipeline::DeadChain");
    let a = method.add_argument("a", int(), 0);
    let t = method.add_temporary("t", int());
    let w = method.add_local("w", int());
    let entry = method.add_block(BasicBlockKind::Entry);

    method.append_operator(entry, Operator::single_assignment(t, a.into()))?;
    method.append_operator(entry, Operator::single_assignment(w, t.into()))?;
    method.append_operator(entry, Operator::breakpoint(0x1))?;
    Ok(method)
}

fn run(config: &PipelineConfig) -> Result<(Vec<Method>, EventLog, usize)> {
    let mut methods = vec![copy_then_use()?, dead_chain()?];
    let mut events = EventLog::new();
    let iterations = PassScheduler::new(config).run(&mut methods, &mut events)?;
    Ok((methods, events, iterations))
}

fn rendered(method: &Method) -> Vec<String> {
    let dumper = PlainDumper::for_method(method);
    method
        .operators()
        .map(|(_, op)| op.format_output(&dumper))
        .collect()
}

#[test]
fn copies_are_propagated_then_removed() -> Result<()> {
    let (methods, events, iterations) = run(&PipelineConfig::default().with_parallel(false))?;

    assert_eq!(iterations, 2);
    assert_eq!(events.count(EventKind::CopyPropagated), 2);
    assert_eq!(events.count(EventKind::OperatorRemoved), 3);

    assert_eq!(
        rendered(&methods[0]),
        ["u = a SUB.signed (a SHL.unsigned $Const(System.Int32 1))", "$R0 = u"]
    );
    assert_eq!(rendered(&methods[1]), ["breakpoint 0x1"]);
    Ok(())
}

#[test]
fn parallel_and_sequential_runs_agree() -> Result<()> {
    let (sequential, seq_events, seq_iterations) =
        run(&PipelineConfig::default().with_parallel(false))?;
    let (parallel, par_events, par_iterations) =
        run(&PipelineConfig::default().with_parallel(true))?;

    assert_eq!(seq_iterations, par_iterations);
    assert_eq!(seq_events.len(), par_events.len());
    for (a, b) in sequential.iter().zip(&parallel) {
        assert_eq!(rendered(a), rendered(b));
    }

    let methods: Vec<Option<&str>> = par_events.iter().map(|e| e.method.as_deref()).collect();
    let first_chain = methods
        .iter()
        .position(|m| *m == Some("Pipeline::DeadChain"))
        .unwrap_or(methods.len());
    assert!(methods[..first_chain]
        .iter()
        .all(|m| *m == Some("Pipeline::CopyThenUse")));
    Ok(())
}

#[test]
fn disabled_passes_leave_methods_untouched() -> Result<()> {
    let (methods, events, iterations) = run(&PipelineConfig::disabled())?;

    assert_eq!(iterations, 0);
    assert!(events.is_empty());
    assert_eq!(methods[0].operator_count(), 3);
    assert_eq!(methods[1].operator_count(), 3);
    Ok(())
}

#[test]
fn dead_code_alone_keeps_live_copies() -> Result<()> {
    let config = PipelineConfig::default()
        .with_copy_propagation(false)
        .with_parallel(false);
    let (methods, events, _) = run(&config)?;

    assert_eq!(PassScheduler::new(&config).pass_names(), ["dead-code-elimination"]);
    assert_eq!(events.count(EventKind::CopyPropagated), 0);
    assert_eq!(events.count(EventKind::OperatorRemoved), 2);
    assert_eq!(methods[0].operator_count(), 3);
    assert_eq!(rendered(&methods[1]), ["breakpoint 0x1"]);
    Ok(())
}

#[test]
fn register_copies_do_not_cross_calls() -> Result<()> {
    let mut method = Method::new("Pipeline::Clobber");
    let r0 = method.add_register(RegisterDescriptor::integer(0), int());
    let t = method.add_local("t", int());
    let entry = method.add_block(BasicBlockKind::Entry);

    method.append_operator(entry, Operator::single_assignment(t, r0.into()))?;
    method.append_operator(entry, Operator::direct_call("Other", Vec::new(), Vec::new()))?;
    method.append_operator(
        entry,
        Operator::move_integer_registers(true, false, false, 0x1, None, None),
    )?;
    let read = method.append_operator(entry, Operator::set_status_register(false, 1, t.into()))?;

    let mut events = EventLog::new();
    PassScheduler::new(&PipelineConfig::default()).run_method(&mut method, &mut events)?;

    let op = method.operator(read).ok_or(armir::Error::UnknownOperator(read))?;
    assert_eq!(op.arguments()[0], Expression::Variable(t));
    assert_eq!(method.operator_count(), 4);
    assert!(events.is_empty());
    Ok(())
}
