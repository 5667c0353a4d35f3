//! Allocator benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use minarena_core::{ArenaAllocator, ArenaConfig};

const ARENA_SIZE: usize = 4 * 1024 * 1024;
const MAX_FRAGMENTS: usize = 4096;

fn bench_alloc_free_cycle(c: &mut Criterion) {
    let sizes: &[usize] = &[16, 64, 256, 1024, 4096, 32768];
    let mut group = c.benchmark_group("alloc_free_cycle");

    for &size in sizes {
        group.bench_with_input(BenchmarkId::new("arena", size), &size, |b, &sz| {
            let mut arena = vec![0u8; ARENA_SIZE];
            let mut alloc =
                ArenaAllocator::new(&mut arena, ArenaConfig::new(MAX_FRAGMENTS)).unwrap();
            b.iter(|| {
                let displacement = alloc.allocate(sz).unwrap();
                alloc.deallocate(displacement, sz).unwrap();
                criterion::black_box(displacement);
            });
        });
        group.bench_with_input(BenchmarkId::new("system", size), &size, |b, &sz| {
            b.iter(|| {
                let v = vec![0u8; sz];
                criterion::black_box(v);
            });
        });
    }
    group.finish();
}

fn bench_alloc_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_burst");

    group.bench_function("arena_1000x64B", |b| {
        let mut arena = vec![0u8; ARENA_SIZE];
        let mut alloc = ArenaAllocator::new(&mut arena, ArenaConfig::new(MAX_FRAGMENTS)).unwrap();
        b.iter(|| {
            let displacements: Vec<u64> = (0..1000).map(|_| alloc.allocate(64).unwrap()).collect();
            for &displacement in displacements.iter().rev() {
                alloc.deallocate(displacement, 64).unwrap();
            }
            criterion::black_box(displacements.len());
        });
    });

    group.bench_function("system_1000x64B", |b| {
        b.iter(|| {
            let allocs: Vec<Vec<u8>> = (0..1000).map(|_| vec![0u8; 64]).collect();
            criterion::black_box(allocs);
        });
    });

    group.finish();
}

/// Steady-state churn: keep 256 blocks live and replace one per
/// iteration, so the first-fit scan walks a populated free list.
fn bench_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("churn");

    group.bench_function("arena_replace_one_of_256", |b| {
        let mut arena = vec![0u8; ARENA_SIZE];
        let mut alloc = ArenaAllocator::new(&mut arena, ArenaConfig::new(MAX_FRAGMENTS)).unwrap();
        let mut live: Vec<u64> = (0..256).map(|_| alloc.allocate(128).unwrap()).collect();
        let mut cursor = 0usize;
        b.iter(|| {
            let victim = live[cursor];
            alloc.deallocate(victim, 128).unwrap();
            live[cursor] = alloc.allocate(128).unwrap();
            cursor = (cursor + 97) % live.len();
            criterion::black_box(live[cursor]);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_alloc_free_cycle, bench_alloc_burst, bench_churn);
criterion_main!(benches);
