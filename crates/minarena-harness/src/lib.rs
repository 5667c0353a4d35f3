//! Randomized workload harness for the minarena allocator.
//!
//! This crate is a consumer of `minarena-core`, not part of the allocator
//! design. It provides:
//! - a deterministic seeded generator, so every campaign is reproducible
//! - a workload runner driving random allocate/free sequences against a
//!   live allocator while mirror-tracking allocations and checking the
//!   no-overlap and byte-accounting properties after every step
//! - machine-readable campaign reports and JSONL structured logs

#![forbid(unsafe_code)]

pub mod report;
pub mod rng;
pub mod workload;

pub use report::{CampaignReport, LogEmitter, LogEntry, LogLevel};
pub use rng::Lcg;
pub use workload::{WorkloadConfig, WorkloadError, WorkloadRunner};
