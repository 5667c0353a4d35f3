//! Allocator error kinds.
//!
//! The design is fail-fast: neither error class is retried internally.
//! Capacity exhaustion is surfaced as an explicit error kind so embedding
//! code may recover (free something, or give up), while invariant
//! violations remain debug-build panics in the validator.

use thiserror::Error;

/// Runtime allocation failure. Both variants are hard capacity limits
/// fixed at construction time, not transient conditions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    /// No free fragment is large enough for the (aligned) request.
    #[error("no free fragment can satisfy {requested} bytes ({available} bytes available)")]
    OutOfMemory { requested: usize, available: usize },
    /// The node pool is empty: representing one more fragment would
    /// exceed the design-time `max_fragments` bound.
    #[error("fragment capacity exhausted (max_fragments = {max_fragments})")]
    OutOfFragments { max_fragments: usize },
    /// The freed displacement lies inside the node table or past the
    /// arena end and cannot belong to a live allocation.
    #[error("displacement {displacement:#x} does not lie in the usable region")]
    ForeignDisplacement { displacement: u64 },
}

/// Construction-time precondition failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The arena cannot hold the node table plus a non-empty usable region.
    #[error("arena of {total_size} bytes cannot hold a {table_size}-byte node table")]
    ArenaTooSmall {
        total_size: usize,
        table_size: usize,
    },
    /// `max_fragments` must be at least 1.
    #[error("max_fragments must be at least 1")]
    ZeroFragmentCapacity,
    /// Alignment must be a non-zero power of two dividing the node size.
    #[error("alignment {alignment} must be a power of two dividing the node size")]
    BadAlignment { alignment: usize },
    /// An absolute-mode base address must honor the configured alignment.
    #[error("absolute addressing base {base:#x} is not aligned to {alignment}")]
    MisalignedBase { base: u64, alignment: usize },
    /// Address 0 is the sentinel; an absolute-mode arena cannot live there.
    #[error("absolute addressing cannot use base address 0 (reserved sentinel)")]
    NullBaseAddress,
}
