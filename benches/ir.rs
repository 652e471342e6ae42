#![allow(unused)]
extern crate armir;

use armir::{ir::RegisterDescriptor, prelude::*};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;

/// Builds a method with `blocks` blocks, each holding a short chain of copies and shifts.
fn build_method(blocks: u32) -> Method {
    let int = TypeRef::new("System.Int32");
    let mut method = Method::new("Bench::Chain");
    let a = method.add_argument("a", int.clone(), 0);
    let r0 = method.add_register(RegisterDescriptor::integer(0), int.clone());

    let mut previous = None;
    for i in 0..blocks {
        let kind = if i == 0 {
            BasicBlockKind::Entry
        } else {
            BasicBlockKind::Normal
        };
        let block = method.add_block(kind);
        if let Some(prev) = previous {
            method
                .add_edge(prev, block, EdgeKind::Fallthrough)
                .expect("blocks exist");
        }

        let t = method.add_temporary(&format!("t{i}"), int.clone());
        let u = method.add_local(&format!("u{i}"), int.clone());
        let ops = [
            Operator::single_assignment(t, a.into()),
            Operator::binary_op_with_shift(
                Alu::Add,
                true,
                Alu::Shl,
                false,
                u,
                t.into(),
                a.into(),
                Expression::constant(int.clone(), ConstValue::I32(2)),
            )
            .with_debug_info(DebugInfo::line("Bench.cs", "Chain", i)),
            Operator::single_assignment(r0, u.into()),
        ];
        for op in ops {
            method.append_operator(block, op).expect("block exists");
        }
        previous = Some(block);
    }
    method
}

fn bench_clone(c: &mut Criterion) {
    let method = build_method(64);

    let mut group = c.benchmark_group("clone");
    group.throughput(Throughput::Elements(method.operator_count() as u64));
    group.bench_function("clone_method", |b| {
        b.iter(|| black_box(method.clone_method(&IdentityConverter).unwrap()));
    });
    group.finish();
}

fn bench_xml(c: &mut Criterion) {
    let methods = vec![build_method(64)];
    let xml = XmlDumper::compact().dump_methods(&methods).unwrap();

    let mut group = c.benchmark_group("xml");
    group.throughput(Throughput::Bytes(xml.len() as u64));
    group.bench_function("dump", |b| {
        b.iter(|| black_box(XmlDumper::compact().dump_methods(black_box(&methods)).unwrap()));
    });
    group.bench_function("parse", |b| {
        b.iter(|| black_box(Parser::default().parse_str(black_box(&xml)).unwrap()));
    });
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let config = PipelineConfig::default().with_parallel(false);
    let scheduler = PassScheduler::new(&config);

    c.bench_function("pipeline", |b| {
        b.iter_batched(
            || vec![build_method(64)],
            |mut methods| {
                let mut events = EventLog::new();
                black_box(scheduler.run(&mut methods, &mut events).unwrap())
            },
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_clone, bench_xml, bench_pipeline);
criterion_main!(benches);
