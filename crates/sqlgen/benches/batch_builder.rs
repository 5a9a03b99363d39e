use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlgen::{AutoIdGenerator, Record, TableSpec};

fn spec() -> TableSpec {
    TableSpec::builder("bench_item")
        .fields(["id", "sku", "name", "qty"])
        .default("qty", 0)
        .unique(["sku"])
        .build()
        .expect("valid spec")
}

/// Generator holding `n` records with auto ids.
fn filled(n: usize) -> AutoIdGenerator {
    let mut g = AutoIdGenerator::new(spec(), 1).expect("pk in fields");
    for i in 0..n {
        g.add(
            Record::new()
                .with("sku", format!("SKU-{i:08}"))
                .with("name", format!("item '{i}'")),
        )
        .expect("no fail hook");
    }
    g
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_builder/add");

    for n in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| black_box(filled(n).len()));
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_builder/render");

    for n in [100, 1_000, 10_000] {
        let g = filled(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &g, |b, g| {
            b.iter(|| {
                for sql in g.batches(64 * 1024) {
                    black_box(sql);
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_add, bench_render);
criterion_main!(benches);
