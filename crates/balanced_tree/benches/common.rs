use std::collections::BTreeSet;
use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{RuntimeConfig, distinct_keys};
use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, BenchmarkId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use balanced_tree::{AvlTree, OrderedSet, RbTree, TreeError};

const SIZES: [usize; 4] = [1_000, 16_000, 64_000, 256_000];
const OPS_PER_ITER: usize = 200;
const GET_HIT_RATE_PERCENT: u64 = 80;
const MIXED_UPDATES_PER_ITER: usize = OPS_PER_ITER / 10; // 10% inserts, 10% removes, 80% reads.
const SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// `std::collections::BTreeSet` behind the same interface, as a baseline.
#[derive(Default)]
struct StdBTreeSet(BTreeSet<u64>);

impl OrderedSet for StdBTreeSet {
    type Value = u64;

    fn len(&self) -> usize {
        self.0.len()
    }

    fn get(&self, value: &u64) -> Option<&u64> {
        self.0.get(value)
    }

    fn insert(&mut self, value: u64) -> Option<u64> {
        self.0.replace(value)
    }

    fn take(&mut self, value: &u64) -> Option<u64> {
        self.0.take(value)
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn check_invariants(&self) -> Result<(), TreeError> {
        Ok(())
    }
}

#[derive(Clone)]
enum Op {
    Get { key: u64 },
    Insert { key: u64 },
    Remove { key: u64 },
}

fn build<S: OrderedSet<Value = u64> + Default>(keys: &[u64]) -> S {
    let mut set = S::default();
    for &k in keys {
        black_box(set.insert(k));
    }
    set
}

fn run_ops<S: OrderedSet<Value = u64>>(set: &mut S, ops: &[Op]) {
    for op in ops {
        match *op {
            Op::Get { key } => {
                black_box(set.get(&key).copied());
            }
            Op::Insert { key } => {
                black_box(set.insert(key));
            }
            Op::Remove { key } => {
                black_box(set.remove(&key));
            }
        }
    }
}

fn bench_workload<S, T, G>(
    group: &mut BenchmarkGroup<'_, T>,
    label: &str,
    workload: u64,
    generate: G,
) where
    S: OrderedSet<Value = u64> + Default,
    T: Measurement<Value = Duration>,
    G: Fn(&[u64], u64, &mut StdRng) -> Vec<Op>,
{
    for &size in &SIZES {
        RuntimeConfig::for_size(size).apply(group);
        let base_seed = mix_seed(0x0DDB_A11A_2026_0000_u64 ^ (workload << 48) ^ size as u64);
        let mut init_rng = StdRng::seed_from_u64(base_seed);
        let keys = distinct_keys(&mut init_rng, size);
        let mut set = build::<S>(&keys);

        group.bench_function(BenchmarkId::new(label, size), |bencher| {
            bencher.iter_custom(|iters| {
                let mut total = Duration::ZERO;
                for iter in 0..iters {
                    let iter_seed = mix_seed(base_seed ^ iter.wrapping_mul(SEED_MIX));
                    let mut rng = StdRng::seed_from_u64(iter_seed);
                    let ops = generate(&keys, iter_seed, &mut rng);
                    let start = Instant::now();
                    run_ops(&mut set, &ops);
                    black_box(set.len());
                    total += start.elapsed();
                }
                total
            })
        });
    }
}

fn read_key(keys: &[u64], rng: &mut StdRng) -> u64 {
    let hit = rng.random_range(0..100) < GET_HIT_RATE_PERCENT;
    if hit {
        keys[rng.random_range(0..keys.len())]
    } else {
        rng.random()
    }
}

/// Keys inserted and removed again within one iteration. The high bit keeps
/// them apart from the initial keys.
fn fresh_key(iter_seed: u64, i: usize) -> u64 {
    mix_seed(iter_seed ^ (i as u64).wrapping_mul(SEED_MIX)) | (1 << 63)
}

fn generate_read_ops(keys: &[u64], _iter_seed: u64, rng: &mut StdRng) -> Vec<Op> {
    (0..OPS_PER_ITER)
        .map(|_| Op::Get {
            key: read_key(keys, rng),
        })
        .collect()
}

fn generate_update_ops(_keys: &[u64], iter_seed: u64, rng: &mut StdRng) -> Vec<Op> {
    let mut inserted = Vec::with_capacity(OPS_PER_ITER / 2);
    let mut ops = Vec::with_capacity(OPS_PER_ITER);
    for i in 0..OPS_PER_ITER {
        if i % 2 == 0 {
            let key = fresh_key(iter_seed, i);
            inserted.push(key);
            ops.push(Op::Insert { key });
        } else {
            let idx = rng.random_range(0..inserted.len());
            let key = inserted.swap_remove(idx);
            ops.push(Op::Remove { key });
        }
    }
    debug_assert!(inserted.is_empty());
    ops
}

fn generate_mixed_ops(keys: &[u64], iter_seed: u64, rng: &mut StdRng) -> Vec<Op> {
    let mut remaining_inserts = MIXED_UPDATES_PER_ITER;
    let mut remaining_removes = MIXED_UPDATES_PER_ITER;
    let mut remaining_reads = OPS_PER_ITER - 2 * MIXED_UPDATES_PER_ITER;
    let mut live_inserted: Vec<u64> = Vec::with_capacity(MIXED_UPDATES_PER_ITER);
    let mut ops = Vec::with_capacity(OPS_PER_ITER);

    while ops.len() < OPS_PER_ITER {
        let remaining_slots = OPS_PER_ITER - ops.len();
        let do_read = remaining_reads > 0
            && (remaining_inserts + remaining_removes == 0
                || rng.random_range(0..remaining_slots) < remaining_reads);
        if do_read {
            ops.push(Op::Get {
                key: read_key(keys, rng),
            });
            remaining_reads -= 1;
            continue;
        }

        let can_insert = remaining_inserts > 0;
        let can_remove = remaining_removes > 0 && !live_inserted.is_empty();
        let do_remove = can_remove
            && (!can_insert
                || rng.random_range(0..(remaining_inserts + remaining_removes))
                    < remaining_removes);

        if do_remove {
            let idx = rng.random_range(0..live_inserted.len());
            let key = live_inserted.swap_remove(idx);
            ops.push(Op::Remove { key });
            remaining_removes -= 1;
        } else {
            let key = fresh_key(iter_seed, MIXED_UPDATES_PER_ITER - remaining_inserts);
            live_inserted.push(key);
            ops.push(Op::Insert { key });
            remaining_inserts -= 1;
        }
    }

    debug_assert!(live_inserted.is_empty());
    ops
}

fn mix_seed(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

pub fn bench_all_read<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload::<StdBTreeSet, _, _>(group, "std_btree", 1, generate_read_ops);
    bench_workload::<AvlTree<u64>, _, _>(group, "avl", 1, generate_read_ops);
    bench_workload::<RbTree<u64>, _, _>(group, "rb", 1, generate_read_ops);
}

pub fn bench_all_update<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload::<StdBTreeSet, _, _>(group, "std_btree", 2, generate_update_ops);
    bench_workload::<AvlTree<u64>, _, _>(group, "avl", 2, generate_update_ops);
    bench_workload::<RbTree<u64>, _, _>(group, "rb", 2, generate_update_ops);
}

pub fn bench_all_mixed<T>(group: &mut BenchmarkGroup<'_, T>)
where
    T: Measurement<Value = Duration>,
{
    bench_workload::<StdBTreeSet, _, _>(group, "std_btree", 3, generate_mixed_ops);
    bench_workload::<AvlTree<u64>, _, _>(group, "avl", 3, generate_mixed_ops);
    bench_workload::<RbTree<u64>, _, _>(group, "rb", 3, generate_mixed_ops);
}
