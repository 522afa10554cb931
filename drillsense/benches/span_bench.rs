use criterion::{black_box, criterion_group, criterion_main, Criterion};
use drillsense::matrix::{LayerType, MatrixRow};
use drillsense::prelude::*;
use drillsense::SpanResolver;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Matrix of a 32-layer board with one backdrill row per inner layer pair.
fn deep_stack() -> Vec<MatrixRow> {
    let copper = 32;
    let mut rows = vec![MatrixRow::new(1, "smt", LayerType::SolderMask)];
    for i in 1..=copper {
        rows.push(MatrixRow::new(i + 1, format!("l{}", i), LayerType::Signal));
    }
    rows.push(MatrixRow::new(copper + 2, "smb", LayerType::SolderMask));
    for i in 2..copper {
        let row = copper + 1 + i;
        let (start, end) = if i % 2 == 0 {
            ("smt".to_string(), format!("l{}", i))
        } else {
            ("smb".to_string(), format!("l{}", i))
        };
        rows.push(MatrixRow::new(row, format!("bd_{}", i), LayerType::Drill).with_span(start, end));
    }
    rows
}

fn bench_resolve_spans(c: &mut Criterion) {
    let rows = deep_stack();

    c.bench_function("resolve_spans_32_layers", |b| {
        b.iter(|| SpanResolver::new(black_box(&rows)).resolve());
    });
}

fn bench_build_coupon(c: &mut Criterion) {
    let snapshot = JobSnapshot::load(&fixture_path("four_layer_job.json")).unwrap();
    let config = CouponConfig::from_map(drillsense::config::loader::embedded_default()).unwrap();

    c.bench_function("build_coupon_memory_host", |b| {
        b.iter(|| {
            let host = MemoryHost::from_snapshot(snapshot.clone());
            let mut builder =
                CouponBuilder::new(host, config.clone(), JobContext::new("bd_test_job"));
            builder.run()
        });
    });
}

criterion_group!(benches, bench_resolve_spans, bench_build_coupon);
criterion_main!(benches);
