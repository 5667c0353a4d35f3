//! End-to-end allocate/deallocate sequence tests over the public API.
//!
//! These exercise the allocator the way an embedding consumer would:
//! long mixed sequences, every free ordering of a small allocation set,
//! and live-range overlap checks, with the validator walks invoked
//! between operations.

use minarena_core::{AllocError, ArenaAllocator, ArenaConfig, NODE_SIZE};

fn aligned(size: usize, alignment: usize) -> usize {
    size.max(1).div_ceil(alignment) * alignment
}

/// Frees one randomly chosen live block. A free the pool cannot represent
/// is kept live and retried later; that is the documented recovery story
/// for `OutOfFragments`.
fn free_one(alloc: &mut ArenaAllocator<'_>, live: &mut Vec<(u64, usize)>, pick: usize) {
    let idx = pick % live.len();
    let (displacement, size) = live[idx];
    match alloc.deallocate(displacement, size) {
        Ok(()) => {
            live.swap_remove(idx);
        }
        Err(AllocError::OutOfFragments { .. }) => {}
        Err(err) => panic!("unexpected deallocate failure: {err}"),
    }
}

#[test]
fn every_free_order_of_four_allocations_restores_initial_state() {
    // All 24 permutations of freeing four blocks must converge back to
    // one fragment and a full pool; no fragment or byte lost either way.
    let sizes = [40usize, 104, 8, 72];
    let permutations: Vec<Vec<usize>> = {
        let mut out = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let order = vec![a, b, c, d];
                        let mut seen = order.clone();
                        seen.sort_unstable();
                        if seen == vec![0, 1, 2, 3] {
                            out.push(order);
                        }
                    }
                }
            }
        }
        out
    };
    assert_eq!(permutations.len(), 24);

    for order in permutations {
        let mut arena = vec![0u8; 4096];
        let mut alloc =
            ArenaAllocator::new(&mut arena, ArenaConfig::new(8)).expect("valid configuration");
        let blocks: Vec<(u64, usize)> = sizes
            .iter()
            .map(|&s| (alloc.allocate(s).expect("fits"), s))
            .collect();
        for &idx in &order {
            let (displacement, size) = blocks[idx];
            alloc.deallocate(displacement, size).expect("valid free");
            alloc.validate();
        }
        alloc.assert_is_in_initial_state();
    }
}

#[test]
fn live_ranges_never_overlap_each_other_or_the_table() {
    let mut arena = vec![0u8; 8192];
    let mut alloc =
        ArenaAllocator::new(&mut arena, ArenaConfig::new(16)).expect("valid configuration");
    let table_size = alloc.table_size() as u64;
    let alignment = alloc.alignment();

    let mut rng = 0x1234_5678_9abc_def0u64;
    let mut step = move || {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
        rng
    };

    let mut live: Vec<(u64, usize)> = Vec::new();
    for _ in 0..800 {
        let r = step();
        if live.is_empty() || r % 3 != 0 {
            let size = ((r >> 8) as usize % 120) + 1;
            match alloc.allocate(size) {
                Ok(displacement) => {
                    let len = aligned(size, alignment) as u64;
                    assert!(displacement >= table_size, "allocation inside node table");
                    assert!(displacement + len <= 8192, "allocation past arena end");
                    for &(other, other_size) in &live {
                        let other_len = aligned(other_size, alignment) as u64;
                        let disjoint =
                            displacement + len <= other || other + other_len <= displacement;
                        assert!(
                            disjoint,
                            "allocation at {displacement:#x} overlaps live block at {other:#x}"
                        );
                    }
                    live.push((displacement, size));
                }
                Err(AllocError::OutOfMemory { .. }) => {
                    free_one(&mut alloc, &mut live, (r >> 16) as usize);
                }
                Err(err) => panic!("unexpected allocate failure: {err}"),
            }
        } else {
            free_one(&mut alloc, &mut live, (r >> 16) as usize);
        }
        alloc.validate_free_list();
        alloc.validate_node_pool();
    }

    // Drain in ascending address order, retrying any free the pool cannot
    // represent yet; merges release nodes, so every pass makes progress.
    live.sort_unstable_by_key(|&(displacement, _)| displacement);
    while !live.is_empty() {
        let before = live.len();
        let mut idx = 0;
        while idx < live.len() {
            let (displacement, size) = live[idx];
            match alloc.deallocate(displacement, size) {
                Ok(()) => {
                    live.remove(idx);
                }
                Err(AllocError::OutOfFragments { .. }) => idx += 1,
                Err(err) => panic!("unexpected deallocate failure: {err}"),
            }
        }
        assert!(live.len() < before, "no progress draining live allocations");
    }
    alloc.assert_is_in_initial_state();
}

#[test]
fn coalescing_never_leaves_adjacent_fragments() {
    // Carve the whole usable region into equal slots, free them in a
    // striped order, and watch the fragment count collapse to one.
    let config = ArenaConfig::new(16);
    let slot = 64usize;
    let slots = 12usize;
    let mut arena = vec![0u8; config.table_size() + slot * slots];
    let mut alloc = ArenaAllocator::new(&mut arena, config).expect("valid configuration");

    let blocks: Vec<u64> = (0..slots)
        .map(|_| alloc.allocate(slot).expect("fits"))
        .collect();
    assert_eq!(alloc.free_fragment_count(), 0);

    // Evens first: maximal fragmentation, one fragment per freed slot.
    for (idx, &displacement) in blocks.iter().enumerate() {
        if idx % 2 == 0 {
            alloc.deallocate(displacement, slot).expect("valid free");
        }
    }
    assert_eq!(alloc.free_fragment_count(), slots / 2);

    // Odds bridge their neighbors pairwise until one fragment remains.
    for (idx, &displacement) in blocks.iter().enumerate() {
        if idx % 2 == 1 {
            alloc.deallocate(displacement, slot).expect("valid free");
            alloc.validate();
        }
    }
    assert_eq!(alloc.free_fragment_count(), 1);
    alloc.assert_is_in_initial_state();
}

#[test]
fn fragment_capacity_bounds_concurrent_fragments_not_allocations() {
    // Far more allocations than max_fragments succeed, as long as the
    // free list itself stays small.
    let mut arena = vec![0u8; 8192];
    let mut alloc =
        ArenaAllocator::new(&mut arena, ArenaConfig::new(2)).expect("valid configuration");
    let blocks: Vec<u64> = (0..32).map(|_| alloc.allocate(32).expect("fits")).collect();
    // Freeing in allocation order keeps everything in one growing head
    // fragment plus the remainder.
    for &displacement in &blocks {
        alloc.deallocate(displacement, 32).expect("valid free");
        assert!(alloc.free_fragment_count() <= 2);
    }
    alloc.assert_is_in_initial_state();
}

#[test]
fn table_overhead_matches_capacity() {
    let config = ArenaConfig::new(4);
    assert_eq!(config.table_size(), 5 * NODE_SIZE);
    let mut arena = vec![0u8; 4096];
    let alloc = ArenaAllocator::new(&mut arena, config).expect("valid configuration");
    assert_eq!(alloc.usable_size(), 4096 - 5 * NODE_SIZE);
}
