//! Fixed-capacity first-fit arena allocator with a self-hosted free list.
//!
//! `minarena-core` manages a single caller-supplied byte arena. The arena
//! is carved into a fixed table of metadata nodes followed by the usable
//! region; free regions live on an address-ordered doubly-linked list,
//! unused metadata slots on a pool chain, and both lists are built from
//! the same table using relative offsets ("displacements") instead of
//! native pointers. In the default relative addressing mode the whole
//! arena can be copied, persisted, or mapped elsewhere without
//! invalidating a single link.
//!
//! Design points:
//! - header-less: no per-allocation size metadata is stored; callers
//!   supply the original size on [`ArenaAllocator::deallocate`]
//! - first-fit with full coalescing; fragmentation is bounded by the
//!   fixed `max_fragments` capacity rather than by fit policy
//! - capacity exhaustion surfaces as [`AllocError`] values; invariant
//!   violations are caught by a debug-build validator that costs nothing
//!   in release builds
//! - single-threaded: no internal locking, no suspension points; wrap an
//!   instance in a mutex or give each thread its own arena

pub mod allocator;
pub mod config;
pub mod displacement;
pub mod error;
mod node;
mod validate;

pub use allocator::{
    AllocatorLogLevel, AllocatorLogRecord, ArenaAllocator, ArenaSnapshot, FragmentInfo,
};
pub use config::{ArenaConfig, DEFAULT_ALIGNMENT};
pub use displacement::{AddressingMode, SENTINEL};
pub use error::{AllocError, ConfigError};
pub use node::NODE_SIZE;
