//! Benchmarks pour le découpage de scripts SQL

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn synthetic_script(statements: usize) -> String {
    let mut sql = String::with_capacity(statements * 160);
    for i in 0..statements {
        sql.push_str(&format!(
            "-- layer {i}\nDROP TABLE IF EXISTS map_layer_{i};\n\
             CREATE TABLE map_layer_{i} AS\n  SELECT id, ST_Transform(geom, 4326) AS geom\n  FROM source_{i};\n\n"
        ));
    }
    sql
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_statements");

    for size in [10usize, 1_000, 50_000] {
        let sql = synthetic_script(size);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &sql, |b, sql| {
            b.iter(|| {
                let statements = sqlscript::split_statements(black_box(sql)).unwrap();
                black_box(statements)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_split);
criterion_main!(benches);
