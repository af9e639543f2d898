//! Table operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tabledb_bench::{populated_table, random_person};
use tabledb_core::{Config, IndexKind, Operator, Table, TableError};

/// Benchmark autocommitted puts in memory and on disk.
fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");

    group.bench_function("memory", |b| {
        let table = Table::open_in_memory().unwrap();
        let record = random_person(2);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            table.put(&format!("pk{i}"), black_box(&record)).unwrap();
        });
    });

    group.bench_function("file_no_sync", |b| {
        let temp = tempfile::tempdir().unwrap();
        let table = Table::open_with_config(
            temp.path().join("bench.tdb"),
            Config::default().sync_on_commit(false),
        )
        .unwrap();
        let record = random_person(2);
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            table.put(&format!("pk{i}"), black_box(&record)).unwrap();
        });
    });
    group.finish();
}

/// Benchmark batches of puts inside one transaction.
fn bench_transaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("transaction");

    for batch_size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*batch_size as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            batch_size,
            |b, &batch_size| {
                let table = Table::open_in_memory().unwrap();
                let records: Vec<_> = (0..batch_size)
                    .map(|i| (format!("pk{i}"), random_person(2)))
                    .collect();

                b.iter(|| {
                    table
                        .transaction(|t| -> Result<(), TableError> {
                            for (key, record) in &records {
                                t.put(key, black_box(record))?;
                            }
                            Ok(())
                        })
                        .unwrap();
                });
            },
        );
    }
    group.finish();
}

/// Benchmark random point reads.
fn bench_get(c: &mut Criterion) {
    let table = populated_table(10_000);
    let mut rng = rand::thread_rng();
    c.bench_function("get", |b| {
        b.iter(|| {
            let key = format!("pk{}", rng.gen_range(0..10_000));
            black_box(table.get(&key).unwrap());
        });
    });
}

/// Benchmark a selective numeric query with and without an index.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_age_eq");

    for indexed in [false, true] {
        let table = populated_table(10_000);
        if indexed {
            table.set_index("age", IndexKind::Decimal).unwrap();
        }
        let label = if indexed { "decimal_index" } else { "full_scan" };
        group.bench_function(label, |b| {
            b.iter(|| {
                table
                    .query(|q| {
                        q.add("age", Operator::NumEquals, "42").pk_only();
                    })
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_put,
    bench_transaction,
    bench_get,
    bench_query
);
criterion_main!(benches);
