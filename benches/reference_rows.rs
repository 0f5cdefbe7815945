use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use cropyield::estimator::MAX_REFERENCE_ROWS;
use cropyield::store::{ReferenceRow, SqliteRowStore};
use tempfile::{TempDir, tempdir};

const ROW_COUNT: usize = 5_000;

fn setup_store() -> (TempDir, SqliteRowStore) {
    let dir = tempdir().expect("tempdir");
    let store = SqliteRowStore::open(dir.path().join("rows.db")).expect("store open");
    let rows: Vec<ReferenceRow> = (0..ROW_COUNT)
        .map(|i| {
            let step = i as f64;
            ReferenceRow::observed(
                "wheat",
                [20.0, 600.0 + step, 55.0, 6.8, 85.0, 35.0, 110.0],
                3.0 + (step * 0.01) % 2.0,
            )
        })
        .collect();
    store.insert_reference_rows(&rows).expect("seed rows");
    (dir, store)
}

fn bench_reference_rows(c: &mut Criterion) {
    let (_dir, store) = setup_store();
    c.bench_with_input(
        BenchmarkId::new("reference_rows", MAX_REFERENCE_ROWS),
        &MAX_REFERENCE_ROWS,
        |b, limit| {
            b.iter(|| {
                store
                    .list_reference_rows(black_box(*limit))
                    .expect("list_reference_rows");
            });
        },
    );
}

criterion_group!(benches, bench_reference_rows);
criterion_main!(benches);
