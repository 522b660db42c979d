//! Batched vs. single-key lookup throughput.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use dialscope_core::phone::NONE;
use dialscope_core::tables::lrn::LrnBuilder;

const TABLE_ROWS: u64 = 1_000_000;
const BATCH: usize = 1024;

fn bench_get_rns(c: &mut Criterion) {
    let mut builder = LrnBuilder::new();
    builder.size_hint(TABLE_ROWS as usize);
    for i in 0..TABLE_ROWS {
        builder
            .add_row(2_000_000_000 + i * 7, 3_000_000_000 + i)
            .unwrap();
    }
    let table = builder.build();

    // Mix of hits and misses, scattered across the table.
    let keys: Vec<u64> = (0..BATCH as u64)
        .map(|i| 2_000_000_000 + (i * 104_729) % (TABLE_ROWS * 7))
        .collect();
    let mut out = vec![NONE; BATCH];

    c.bench_function("get_rns_batch_1024", |b| {
        b.iter(|| {
            table.get_rns(black_box(&keys), &mut out);
            black_box(&out);
        })
    });

    c.bench_function("get_rn_single_1024", |b| {
        b.iter(|| {
            for &key in &keys {
                black_box(table.get_rn(black_box(key)));
            }
        })
    });
}

criterion_group!(benches, bench_get_rns);
criterion_main!(benches);
