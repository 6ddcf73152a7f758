//! Bench: two-input merge-dedup over 1M persisted rows, across conflict
//! densities, with and without a key column.
//!
//! - "disjoint": O3 timestamps interleave between persisted ones, so the
//!   merge never enters a conflict band.
//! - "dense": every O3 timestamp collides with a persisted one, so every
//!   band goes through the bitmap + binary probe path.
//!
//! Run:
//!   cargo bench --bench merge_dedup_bench

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use tempo_dedup::{
    KeyColumn, KeyValues, merge_dedup_timestamp_index, merge_dedup_timestamp_index_with_keys,
};
use tempo_types::IndexEntry;

const N_ROWS: usize = 1_000_000;
const N_O3: usize = 100_000;
const SEED: u64 = 0xC0FF_EE00_0000_0031;

struct Inputs {
    src: Vec<u64>,
    index: Vec<IndexEntry>,
    column: Vec<i32>,
    o3: Vec<i32>,
}

fn seed_inputs(collide: bool) -> Inputs {
    let mut rng = StdRng::seed_from_u64(SEED);
    // Persisted timestamps at even positions leave odd gaps for the
    // disjoint shape; the dense shape reuses the even values.
    let src: Vec<u64> = (0..N_ROWS as u64).map(|i| i * 2).collect();
    let column: Vec<i32> = (0..N_ROWS).map(|_| rng.gen_range(0..1_000)).collect();

    let mut index = Vec::with_capacity(N_O3);
    let mut o3 = Vec::with_capacity(N_O3);
    let stride = (N_ROWS / N_O3) as u64;
    for i in 0..N_O3 as u64 {
        let ts = if collide { i * stride * 2 } else { i * stride * 2 + 1 };
        index.push(IndexEntry::new(ts, i));
        o3.push(rng.gen_range(0..1_000));
    }
    Inputs {
        src,
        index,
        column,
        o3,
    }
}

fn bench_merge_dedup(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_dedup_1m");
    group.sample_size(10);

    for (shape, collide) in [("disjoint", false), ("dense", true)] {
        let inputs = seed_inputs(collide);
        let mut dest = vec![IndexEntry::default(); N_ROWS + N_O3];

        group.bench_function(format!("{shape}/no_keys"), |b| {
            b.iter(|| {
                let written = merge_dedup_timestamp_index(
                    &inputs.src,
                    0..inputs.src.len(),
                    &inputs.index,
                    0..inputs.index.len(),
                    &mut dest,
                );
                black_box(written);
            })
        });

        group.bench_function(format!("{shape}/one_key"), |b| {
            let keys = [KeyColumn {
                column_top: 0,
                values: KeyValues::I32 {
                    column: &inputs.column,
                    o3: &inputs.o3,
                    null: i32::MIN,
                },
            }];
            b.iter(|| {
                let written = merge_dedup_timestamp_index_with_keys(
                    &inputs.src,
                    0..inputs.src.len(),
                    &inputs.index,
                    0..inputs.index.len(),
                    &mut dest,
                    &keys,
                );
                black_box(written);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_merge_dedup);
criterion_main!(benches);
