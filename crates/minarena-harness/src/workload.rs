//! Randomized workload execution.
//!
//! Drives a seeded allocate/free campaign against a live allocator while
//! keeping an independent mirror of every live allocation. After each
//! step the runner re-checks the externally observable properties: new
//! allocations never overlap live ones or the node table, and the
//! allocator's running free-byte total always equals usable bytes minus
//! mirrored live bytes. The campaign ends with a full drain, after which
//! the allocator must be back in its exact initial state.

use crate::report::CampaignReport;
use crate::rng::Lcg;

use minarena_core::{AllocError, ArenaAllocator, ArenaConfig, ConfigError};
use thiserror::Error;

/// Campaign parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
    pub seed: u64,
    /// Mixed allocate/free steps before the final drain.
    pub operations: usize,
    pub arena_size: usize,
    pub max_fragments: usize,
    pub alignment: usize,
    /// Request sizes are drawn uniformly from `min_alloc..=max_alloc`.
    pub min_alloc: usize,
    pub max_alloc: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed_cafe,
            operations: 4096,
            arena_size: 2 * 1024 * 1024,
            max_fragments: 2048,
            alignment: 8,
            min_alloc: 1,
            max_alloc: 32,
        }
    }
}

/// Campaign failure: either the allocator rejected something it should
/// not have, or an observable property broke.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkloadError {
    #[error("allocator configuration rejected: {0}")]
    Config(#[from] ConfigError),
    #[error("allocator failure at step {step}: {source}")]
    Alloc {
        step: usize,
        #[source]
        source: AllocError,
    },
    #[error("allocation at {displacement:#x} overlaps live block at {other:#x} (step {step})")]
    Overlap {
        step: usize,
        displacement: u64,
        other: u64,
    },
    #[error(
        "accounting identity broken at step {step}: allocator reports {reported} free bytes, mirror expects {expected}"
    )]
    Accounting {
        step: usize,
        reported: usize,
        expected: usize,
    },
    #[error("drain stalled with {remaining} live allocations")]
    DrainStalled { remaining: usize },
}

#[derive(Debug, Clone, Copy)]
struct LiveBlock {
    displacement: u64,
    size: usize,
}

/// Runs one seeded campaign and collects a report.
pub struct WorkloadRunner {
    config: WorkloadConfig,
}

impl WorkloadRunner {
    #[must_use]
    pub fn new(config: WorkloadConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<CampaignReport, WorkloadError> {
        let cfg = self.config;
        let mut arena = vec![0u8; cfg.arena_size];
        let mut alloc = ArenaAllocator::new(
            &mut arena,
            ArenaConfig::new(cfg.max_fragments).with_alignment(cfg.alignment),
        )?;
        alloc.assert_is_in_initial_state();

        let usable = alloc.usable_size();
        let table_size = alloc.table_size() as u64;
        let mut rng = Lcg::new(cfg.seed);
        let mut live: Vec<LiveBlock> = Vec::new();
        let mut live_bytes = 0usize;

        let mut allocations = 0usize;
        let mut deallocations = 0usize;
        let mut oom_events = 0usize;
        let mut fragment_stalls = 0usize;
        let mut peak_live_bytes = 0usize;
        let mut peak_live_count = 0usize;
        let mut peak_fragments = 0usize;

        for step in 0..cfg.operations {
            if live.is_empty() || rng.chance() {
                let size = rng.range(cfg.min_alloc.max(1), cfg.max_alloc);
                match alloc.allocate(size) {
                    Ok(displacement) => {
                        let len = aligned(size, cfg.alignment);
                        if displacement < table_size
                            || displacement + len as u64 > cfg.arena_size as u64
                        {
                            return Err(WorkloadError::Overlap {
                                step,
                                displacement,
                                other: 0,
                            });
                        }
                        for block in &live {
                            let other_len = aligned(block.size, cfg.alignment) as u64;
                            let disjoint = displacement + len as u64 <= block.displacement
                                || block.displacement + other_len <= displacement;
                            if !disjoint {
                                return Err(WorkloadError::Overlap {
                                    step,
                                    displacement,
                                    other: block.displacement,
                                });
                            }
                        }
                        live.push(LiveBlock { displacement, size });
                        live_bytes += len;
                        allocations += 1;
                    }
                    Err(AllocError::OutOfMemory { .. }) => {
                        oom_events += 1;
                        if !live.is_empty() {
                            let pick = rng.below(live.len() as u64) as usize;
                            release_one(
                                &mut alloc,
                                &mut live,
                                &mut live_bytes,
                                &mut deallocations,
                                &mut fragment_stalls,
                                cfg.alignment,
                                pick,
                                step,
                            )?;
                        }
                    }
                    Err(source) => return Err(WorkloadError::Alloc { step, source }),
                }
            } else {
                let pick = rng.below(live.len() as u64) as usize;
                release_one(
                    &mut alloc,
                    &mut live,
                    &mut live_bytes,
                    &mut deallocations,
                    &mut fragment_stalls,
                    cfg.alignment,
                    pick,
                    step,
                )?;
            }

            let expected = usable - live_bytes;
            if alloc.available_bytes() != expected {
                return Err(WorkloadError::Accounting {
                    step,
                    reported: alloc.available_bytes(),
                    expected,
                });
            }
            alloc.validate_free_list();
            alloc.validate_node_pool();

            peak_live_bytes = peak_live_bytes.max(live_bytes);
            peak_live_count = peak_live_count.max(live.len());
            peak_fragments = peak_fragments.max(alloc.free_fragment_count());
        }

        // Drain in ascending address order, retrying frees the pool cannot
        // represent yet; coalescing releases nodes, so each pass shrinks.
        live.sort_unstable_by_key(|block| block.displacement);
        while !live.is_empty() {
            let before = live.len();
            let mut idx = 0;
            while idx < live.len() {
                let block = live[idx];
                match alloc.deallocate(block.displacement, block.size) {
                    Ok(()) => {
                        live_bytes -= aligned(block.size, cfg.alignment);
                        deallocations += 1;
                        live.remove(idx);
                    }
                    Err(AllocError::OutOfFragments { .. }) => {
                        fragment_stalls += 1;
                        idx += 1;
                    }
                    Err(source) => {
                        return Err(WorkloadError::Alloc {
                            step: cfg.operations,
                            source,
                        });
                    }
                }
            }
            if live.len() == before {
                return Err(WorkloadError::DrainStalled {
                    remaining: live.len(),
                });
            }
        }

        alloc.assert_is_in_initial_state();

        Ok(CampaignReport {
            seed: cfg.seed,
            operations: cfg.operations,
            arena_size: cfg.arena_size,
            max_fragments: cfg.max_fragments,
            usable_bytes: usable,
            allocations,
            deallocations,
            oom_events,
            fragment_stalls,
            peak_live_bytes,
            peak_live_count,
            peak_fragments,
            final_state_ok: true,
        })
    }
}

fn aligned(size: usize, alignment: usize) -> usize {
    size.max(1).div_ceil(alignment) * alignment
}

/// Frees the `pick`-th live block. A free the pool cannot represent is
/// kept live and retried later; that is the caller-side recovery story
/// for `OutOfFragments`.
#[allow(clippy::too_many_arguments)]
fn release_one(
    alloc: &mut ArenaAllocator<'_>,
    live: &mut Vec<LiveBlock>,
    live_bytes: &mut usize,
    deallocations: &mut usize,
    fragment_stalls: &mut usize,
    alignment: usize,
    pick: usize,
    step: usize,
) -> Result<(), WorkloadError> {
    let block = live[pick];
    match alloc.deallocate(block.displacement, block.size) {
        Ok(()) => {
            *live_bytes -= aligned(block.size, alignment);
            *deallocations += 1;
            live.swap_remove(pick);
            Ok(())
        }
        Err(AllocError::OutOfFragments { .. }) => {
            *fragment_stalls += 1;
            Ok(())
        }
        Err(source) => Err(WorkloadError::Alloc { step, source }),
    }
}
