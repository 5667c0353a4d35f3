//! Core allocator state.
//!
//! A first-fit free-list allocator over a caller-supplied byte arena. The
//! arena is carved into a fixed node table followed by the usable region;
//! free regions are tracked by an address-ordered doubly-linked list of
//! table nodes, unused nodes by a second linked chain (the pool). All
//! links are displacements stored inside the arena itself, so in relative
//! mode the whole buffer can be copied or persisted without invalidating
//! any metadata.
//!
//! Single-threaded by design: every call is a bounded walk over the node
//! table with no suspension points, and concurrent use must be externally
//! synchronized.

use crate::config::ArenaConfig;
use crate::displacement::{AddressingMode, SENTINEL};
use crate::error::{AllocError, ConfigError};
use crate::node::{NODE_SIZE, Node};

use std::fmt;

/// Allocator lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocatorLogLevel {
    Trace,
    Info,
    Warn,
}

/// Structured allocator lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorLogRecord {
    /// Monotonic decision/event id.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    /// Severity level.
    pub level: AllocatorLogLevel,
    /// Operation (`allocate`, `deallocate`).
    pub op: &'static str,
    /// Event kind (`fit_partial`, `merge_both`, `no_fit`, ...).
    pub event: &'static str,
    /// Displacement involved in the event.
    pub displacement: Option<u64>,
    /// Aligned size involved in the event.
    pub size: Option<u64>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Snapshot: bytes currently free.
    pub available_bytes: usize,
    /// Snapshot: live free-list node count.
    pub free_fragments: usize,
    /// Snapshot: pooled node count.
    pub pool_free: usize,
}

/// One free-list entry as reported by [`ArenaAllocator::dump_free_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentInfo {
    /// Displacement of the table node describing the fragment.
    pub node: u64,
    /// Displacement of the fragment itself.
    pub base: u64,
    /// Fragment length in bytes.
    pub size: u64,
}

impl fmt::Display for FragmentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node at {:#x}, base = {:#x}, size = {:#x}",
            self.node, self.base, self.size
        )
    }
}

/// Scalar bookkeeping held outside the arena.
///
/// Together with the arena bytes this is the allocator's entire state:
/// capture it, move the bytes, and [`ArenaAllocator::resume`] rebuilds a
/// working handle (relative mode only makes the move itself safe).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaSnapshot {
    pub free_head: u64,
    pub pool_head: u64,
    pub available_bytes: usize,
    pub free_fragments: usize,
    pub pool_free: usize,
}

/// Fixed-capacity first-fit allocator over a borrowed arena.
///
/// The arena outlives the allocator and ownership stays with the caller;
/// the allocator holds nothing beyond the borrow and a handful of
/// bookkeeping scalars.
pub struct ArenaAllocator<'a> {
    pub(crate) arena: &'a mut [u8],
    pub(crate) addressing: AddressingMode,
    pub(crate) alignment: usize,
    pub(crate) max_fragments: usize,
    /// Displacement of the first free-list node, `SENTINEL` when the
    /// usable region is fully allocated.
    pub(crate) free_head: u64,
    /// Displacement of the first pooled node, `SENTINEL` when the pool is
    /// exhausted.
    pub(crate) pool_head: u64,
    /// Running total of free bytes; must always equal the sum of free-list
    /// node sizes.
    pub(crate) available_bytes: usize,
    pub(crate) free_fragments: usize,
    pub(crate) pool_free: usize,
    next_decision_id: u64,
    lifecycle_logs: Vec<AllocatorLogRecord>,
}

impl<'a> ArenaAllocator<'a> {
    /// Initializes an allocator over `arena`.
    ///
    /// Reserves `(max_fragments + 1) * NODE_SIZE` bytes at the front of
    /// the arena for the node table, seeds one free node spanning the
    /// entire usable region, and threads the remaining slots into the
    /// pool. Fails if the configuration cannot describe a usable arena.
    pub fn new(arena: &'a mut [u8], config: ArenaConfig) -> Result<Self, ConfigError> {
        config.validate(arena.len())?;

        let table_size = config.table_size();
        let usable = arena.len() - table_size;

        let mut this = Self {
            arena,
            addressing: config.addressing,
            alignment: config.alignment,
            max_fragments: config.max_fragments,
            free_head: SENTINEL,
            pool_head: SENTINEL,
            available_bytes: usable,
            free_fragments: 1,
            pool_free: config.max_fragments - 1,
            next_decision_id: 1,
            lifecycle_logs: Vec::new(),
        };

        // Slot 0 stays reserved: its displacement doubles as the sentinel.
        let first = this.slot_displacement(1);
        this.put_node(
            first,
            Node {
                base: this.addressing.to_displacement(table_size),
                size: usable as u64,
                next: SENTINEL,
                previous: SENTINEL,
            },
        );
        this.free_head = first;

        for slot in 2..=config.max_fragments {
            let next = if slot == config.max_fragments {
                SENTINEL
            } else {
                this.slot_displacement(slot + 1)
            };
            let previous = if slot == 2 {
                SENTINEL
            } else {
                this.slot_displacement(slot - 1)
            };
            this.put_node(this.slot_displacement(slot), Node::pooled(next, previous));
        }
        if config.max_fragments >= 2 {
            this.pool_head = this.slot_displacement(2);
        }

        #[cfg(debug_assertions)]
        this.validate();

        Ok(this)
    }

    /// Rebuilds an allocator handle from arena bytes plus a previously
    /// captured [`ArenaSnapshot`].
    ///
    /// The bytes must come from an allocator constructed with the same
    /// `config`; in relative mode they may have been copied to a new
    /// buffer in between. The adopted state is re-checked by the debug
    /// validator.
    pub fn resume(
        arena: &'a mut [u8],
        config: ArenaConfig,
        snapshot: ArenaSnapshot,
    ) -> Result<Self, ConfigError> {
        config.validate(arena.len())?;

        let this = Self {
            arena,
            addressing: config.addressing,
            alignment: config.alignment,
            max_fragments: config.max_fragments,
            free_head: snapshot.free_head,
            pool_head: snapshot.pool_head,
            available_bytes: snapshot.available_bytes,
            free_fragments: snapshot.free_fragments,
            pool_free: snapshot.pool_free,
            next_decision_id: 1,
            lifecycle_logs: Vec::new(),
        };

        #[cfg(debug_assertions)]
        this.validate();

        Ok(this)
    }

    /// Captures the scalar bookkeeping needed by [`ArenaAllocator::resume`].
    #[must_use]
    pub fn snapshot(&self) -> ArenaSnapshot {
        ArenaSnapshot {
            free_head: self.free_head,
            pool_head: self.pool_head,
            available_bytes: self.available_bytes,
            free_fragments: self.free_fragments,
            pool_free: self.pool_free,
        }
    }

    /// Allocates `size` bytes, rounded up to the configured alignment
    /// (zero-size requests round up to one alignment unit).
    ///
    /// First-fit: scans the free list in ascending address order and
    /// takes the first fragment large enough. A strictly larger fragment
    /// is shrunk in place; an exact fit unlinks the node and recycles it
    /// to the pool. Returns the displacement of the allocated region.
    pub fn allocate(&mut self, size: usize) -> Result<u64, AllocError> {
        let Some(request) = self.align_request(size) else {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "allocate",
                "no_fit",
                None,
                Some(size as u64),
                "oom",
            );
            return Err(AllocError::OutOfMemory {
                requested: size,
                available: self.available_bytes,
            });
        };
        let request_len = request as u64;

        let mut cursor = self.free_head;
        while cursor != SENTINEL {
            let node = self.node_at(cursor);
            if node.size >= request_len {
                let result = node.base;
                let event = if node.size != request_len {
                    // Shrink in place, no link touches the list structure.
                    self.put_node(
                        cursor,
                        Node {
                            base: node.base + request_len,
                            size: node.size - request_len,
                            ..node
                        },
                    );
                    "fit_partial"
                } else {
                    self.unlink_free_node(cursor, node);
                    self.pool_release(cursor);
                    self.free_fragments -= 1;
                    "fit_exact"
                };
                self.available_bytes -= request;
                self.record_lifecycle(
                    AllocatorLogLevel::Trace,
                    "allocate",
                    event,
                    Some(result),
                    Some(request_len),
                    "success",
                );
                #[cfg(debug_assertions)]
                self.validate();
                return Ok(result);
            }
            cursor = node.next;
        }

        self.record_lifecycle(
            AllocatorLogLevel::Warn,
            "allocate",
            "no_fit",
            None,
            Some(request_len),
            "oom",
        );
        Err(AllocError::OutOfMemory {
            requested: request,
            available: self.available_bytes,
        })
    }

    /// Returns a region to the free list, coalescing with address-adjacent
    /// free fragments.
    ///
    /// `size` must equal the size originally passed to [`allocate`] for
    /// this displacement; the allocator stores no per-allocation record,
    /// so a mismatched size is undetectable corruption (caught, at best,
    /// by the debug validator on a later call). Only a displacement that
    /// obviously cannot belong to a live allocation is rejected up front.
    ///
    /// [`allocate`]: ArenaAllocator::allocate
    pub fn deallocate(&mut self, displacement: u64, size: usize) -> Result<(), AllocError> {
        // Subtraction-form bounds check: no intermediate sum can overflow,
        // and a displacement below an absolute-mode base converts to None.
        let checked = match (self.align_request(size), self.addressing.checked_offset(displacement)) {
            (Some(freed), Some(offset))
                if offset >= self.table_size()
                    && freed <= self.arena.len()
                    && offset <= self.arena.len() - freed =>
            {
                Some(freed)
            }
            _ => None,
        };
        let Some(freed) = checked else {
            self.record_lifecycle(
                AllocatorLogLevel::Warn,
                "deallocate",
                "foreign_displacement",
                Some(displacement),
                Some(size as u64),
                "rejected",
            );
            return Err(AllocError::ForeignDisplacement { displacement });
        };
        let freed_len = freed as u64;

        // Bracket the freed region: first free node with a higher base.
        let mut previous = SENTINEL;
        let mut current = self.free_head;
        while current != SENTINEL {
            let node = self.node_at(current);
            if node.base > displacement {
                break;
            }
            previous = current;
            current = node.next;
        }

        let inserted = if previous == SENTINEL {
            self.free_at_head(displacement, freed_len)
        } else if current == SENTINEL {
            self.free_at_tail(previous, displacement, freed_len)
        } else {
            self.free_between(previous, current, displacement, freed_len)
        };
        let event = match inserted {
            Ok(event) => event,
            Err(err) => {
                self.record_lifecycle(
                    AllocatorLogLevel::Warn,
                    "deallocate",
                    "pool_exhausted",
                    Some(displacement),
                    Some(freed_len),
                    "out_of_fragments",
                );
                return Err(err);
            }
        };

        self.available_bytes += freed;
        self.record_lifecycle(
            AllocatorLogLevel::Trace,
            "deallocate",
            event,
            Some(displacement),
            Some(freed_len),
            "success",
        );
        #[cfg(debug_assertions)]
        self.validate();
        Ok(())
    }

    /// Bytes currently free across all fragments.
    #[must_use]
    pub fn available_bytes(&self) -> usize {
        self.available_bytes
    }

    /// Number of live free-list fragments.
    #[must_use]
    pub fn free_fragment_count(&self) -> usize {
        self.free_fragments
    }

    /// Number of pooled (unused) table nodes.
    #[must_use]
    pub fn pool_free_count(&self) -> usize {
        self.pool_free
    }

    /// The configured fragment capacity.
    #[must_use]
    pub fn max_fragments(&self) -> usize {
        self.max_fragments
    }

    /// The configured request alignment.
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// The configured addressing policy.
    #[must_use]
    pub fn addressing(&self) -> AddressingMode {
        self.addressing
    }

    /// Total arena size, table included.
    #[must_use]
    pub fn total_size(&self) -> usize {
        self.arena.len()
    }

    /// Byte size of the node table at the front of the arena.
    #[must_use]
    pub fn table_size(&self) -> usize {
        (self.max_fragments + 1) * NODE_SIZE
    }

    /// Bytes past the node table available for allocation when empty.
    #[must_use]
    pub fn usable_size(&self) -> usize {
        self.arena.len() - self.table_size()
    }

    /// Reports every free fragment in address order.
    #[must_use]
    pub fn dump_free_list(&self) -> Vec<FragmentInfo> {
        let mut fragments = Vec::with_capacity(self.free_fragments);
        let mut cursor = self.free_head;
        while cursor != SENTINEL {
            let node = self.node_at(cursor);
            fragments.push(FragmentInfo {
                node: cursor,
                base: node.base,
                size: node.size,
            });
            cursor = node.next;
        }
        fragments
    }

    /// Returns a view of allocator lifecycle log records.
    #[must_use]
    pub fn lifecycle_logs(&self) -> &[AllocatorLogRecord] {
        &self.lifecycle_logs
    }

    /// Drains allocator lifecycle log records.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<AllocatorLogRecord> {
        std::mem::take(&mut self.lifecycle_logs)
    }

    /// Rounds a request up to the configured alignment. `None` when the
    /// rounding itself overflows; no arena can hold such a request.
    fn align_request(&self, size: usize) -> Option<usize> {
        size.max(1).div_ceil(self.alignment).checked_mul(self.alignment)
    }

    pub(crate) fn slot_displacement(&self, slot: usize) -> u64 {
        self.addressing.to_displacement(slot * NODE_SIZE)
    }

    pub(crate) fn node_at(&self, displacement: u64) -> Node {
        Node::read(self.arena, self.addressing.to_offset(displacement))
    }

    pub(crate) fn put_node(&mut self, displacement: u64, node: Node) {
        let offset = self.addressing.to_offset(displacement);
        node.write(self.arena, offset);
    }

    /// Removes `node` (living at `displacement`) from the free list,
    /// re-linking its neighbors. The list head is the special case: it has
    /// no predecessor link to update, only the head scalar.
    fn unlink_free_node(&mut self, displacement: u64, node: Node) {
        debug_assert_ne!(displacement, SENTINEL);
        if node.previous == SENTINEL {
            self.free_head = node.next;
        } else {
            let mut prev = self.node_at(node.previous);
            prev.next = node.next;
            self.put_node(node.previous, prev);
        }
        if node.next != SENTINEL {
            let mut next = self.node_at(node.next);
            next.previous = node.previous;
            self.put_node(node.next, next);
        }
    }

    /// Unlinks and returns the pool head, links reset to sentinel.
    fn pool_acquire(&mut self) -> Result<u64, AllocError> {
        if self.pool_head == SENTINEL {
            return Err(AllocError::OutOfFragments {
                max_fragments: self.max_fragments,
            });
        }
        let displacement = self.pool_head;
        let node = self.node_at(displacement);
        self.pool_head = node.next;
        if self.pool_head != SENTINEL {
            let mut head = self.node_at(self.pool_head);
            head.previous = SENTINEL;
            self.put_node(self.pool_head, head);
        }
        self.put_node(displacement, Node::pooled(SENTINEL, SENTINEL));
        self.pool_free -= 1;
        Ok(displacement)
    }

    /// Resets a node to pool shape and pushes it onto the pool head.
    fn pool_release(&mut self, displacement: u64) {
        let old_head = self.pool_head;
        self.put_node(displacement, Node::pooled(old_head, SENTINEL));
        if old_head != SENTINEL {
            let mut head = self.node_at(old_head);
            head.previous = displacement;
            self.put_node(old_head, head);
        }
        self.pool_head = displacement;
        self.pool_free += 1;
    }

    /// Freed region sits before every free fragment (or the list is
    /// empty): extend the head backward when contiguous, otherwise insert
    /// a fresh node as the new head.
    fn free_at_head(&mut self, freed_base: u64, freed_len: u64) -> Result<&'static str, AllocError> {
        if self.free_head != SENTINEL {
            let mut head = self.node_at(self.free_head);
            if head.base == freed_base + freed_len {
                head.base = freed_base;
                head.size += freed_len;
                self.put_node(self.free_head, head);
                return Ok("extend_head_backward");
            }
        }

        let fresh = self.pool_acquire()?;
        self.put_node(
            fresh,
            Node {
                base: freed_base,
                size: freed_len,
                next: self.free_head,
                previous: SENTINEL,
            },
        );
        if self.free_head != SENTINEL {
            let mut head = self.node_at(self.free_head);
            head.previous = fresh;
            self.put_node(self.free_head, head);
        }
        self.free_head = fresh;
        self.free_fragments += 1;
        Ok("insert_head")
    }

    /// Freed region sits after the last free fragment: extend the tail
    /// forward when contiguous, otherwise append a fresh node.
    fn free_at_tail(
        &mut self,
        tail: u64,
        freed_base: u64,
        freed_len: u64,
    ) -> Result<&'static str, AllocError> {
        let mut tail_node = self.node_at(tail);
        if tail_node.base + tail_node.size == freed_base {
            tail_node.size += freed_len;
            self.put_node(tail, tail_node);
            return Ok("extend_tail_forward");
        }

        let fresh = self.pool_acquire()?;
        self.put_node(
            fresh,
            Node {
                base: freed_base,
                size: freed_len,
                next: SENTINEL,
                previous: tail,
            },
        );
        let mut tail_node = self.node_at(tail);
        tail_node.next = fresh;
        self.put_node(tail, tail_node);
        self.free_fragments += 1;
        Ok("append_tail")
    }

    /// Freed region is bracketed by `previous` and `next`. Merging with
    /// both bridges the neighbors into one fragment and is the only path
    /// that shrinks the live node count.
    fn free_between(
        &mut self,
        previous: u64,
        next: u64,
        freed_base: u64,
        freed_len: u64,
    ) -> Result<&'static str, AllocError> {
        let mut prev_node = self.node_at(previous);
        let mut next_node = self.node_at(next);

        if prev_node.base + prev_node.size == freed_base {
            if freed_base + freed_len == next_node.base {
                prev_node.size += freed_len + next_node.size;
                prev_node.next = next_node.next;
                self.put_node(previous, prev_node);
                if next_node.next != SENTINEL {
                    let mut after = self.node_at(next_node.next);
                    after.previous = previous;
                    self.put_node(next_node.next, after);
                }
                self.pool_release(next);
                self.free_fragments -= 1;
                return Ok("merge_both");
            }
            prev_node.size += freed_len;
            self.put_node(previous, prev_node);
            return Ok("merge_previous");
        }

        if freed_base + freed_len == next_node.base {
            // A region merged leftward grows: both fields move.
            next_node.base = freed_base;
            next_node.size += freed_len;
            self.put_node(next, next_node);
            return Ok("merge_next");
        }

        let fresh = self.pool_acquire()?;
        self.put_node(
            fresh,
            Node {
                base: freed_base,
                size: freed_len,
                next,
                previous,
            },
        );
        let mut prev_node = self.node_at(previous);
        prev_node.next = fresh;
        self.put_node(previous, prev_node);
        let mut next_node = self.node_at(next);
        next_node.previous = fresh;
        self.put_node(next, next_node);
        self.free_fragments += 1;
        Ok("splice_between")
    }

    fn record_lifecycle(
        &mut self,
        level: AllocatorLogLevel,
        op: &'static str,
        event: &'static str,
        displacement: Option<u64>,
        size: Option<u64>,
        outcome: &'static str,
    ) {
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        let trace_id = format!("core::arena::{op}::{decision_id:016x}");
        self.lifecycle_logs.push(AllocatorLogRecord {
            decision_id,
            trace_id,
            level,
            op,
            event,
            displacement,
            size,
            outcome,
            available_bytes: self.available_bytes,
            free_fragments: self.free_fragments,
            pool_free: self.pool_free,
        });
    }
}

impl fmt::Debug for ArenaAllocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaAllocator")
            .field("total_size", &self.arena.len())
            .field("addressing", &self.addressing)
            .field("alignment", &self.alignment)
            .field("max_fragments", &self.max_fragments)
            .field("available_bytes", &self.available_bytes)
            .field("free_fragments", &self.free_fragments)
            .field("pool_free", &self.pool_free)
            .finish_non_exhaustive()
    }
}
