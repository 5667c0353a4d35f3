//! Invariant validator.
//!
//! Walks the free list and the node pool checking the structural
//! invariants the allocator maintains: strict address ordering with an
//! unmerged gap between free neighbors, table/arena bounds, doubly-linked
//! consistency, byte accounting, pooled-node shape, and total node
//! conservation. Violations panic: they indicate a caller contract breach
//! (wrong deallocate size, double free) or an internal bug, and neither
//! is recoverable.
//!
//! The allocator invokes [`ArenaAllocator::validate`] after every
//! mutating call in debug builds only; release builds pay nothing. The
//! entry points stay public so test harnesses can call them directly
//! between operations.

use crate::allocator::ArenaAllocator;
use crate::displacement::SENTINEL;
use crate::node::{NODE_SIZE, Node};

impl ArenaAllocator<'_> {
    /// Walks both lists and checks every maintained invariant.
    ///
    /// Panics on the first violation found.
    pub fn validate(&self) {
        let free_nodes = self.validate_free_list();
        let pooled_nodes = self.validate_node_pool();
        assert_eq!(
            free_nodes + pooled_nodes,
            self.max_fragments,
            "every table slot must be in exactly one list"
        );
    }

    /// Walks the free list checking ordering, bounds, link consistency,
    /// and the byte accounting identity. Returns the node count.
    pub fn validate_free_list(&self) -> usize {
        let mut count = 0usize;
        let mut total = 0u64;
        let mut cursor = self.free_head;
        while cursor != SENTINEL {
            let node = self.node_at(cursor);
            self.assert_free_node_correct(cursor, &node);
            count += 1;
            total += node.size;
            cursor = node.next;
        }
        assert_eq!(
            total as usize, self.available_bytes,
            "sum of free fragment sizes must equal the running available total"
        );
        assert_eq!(
            count, self.free_fragments,
            "free fragment counter diverged from the list walk"
        );
        count
    }

    /// Walks the node pool checking pooled-node shape and link
    /// consistency. Returns the node count.
    pub fn validate_node_pool(&self) -> usize {
        let mut count = 0usize;
        let mut cursor = self.pool_head;
        while cursor != SENTINEL {
            let node = self.node_at(cursor);
            self.assert_pooled_node_correct(cursor, &node);
            count += 1;
            cursor = node.next;
        }
        assert_eq!(
            count, self.pool_free,
            "pooled node counter diverged from the pool walk"
        );
        count
    }

    /// Asserts the allocator is byte-for-byte back in its freshly
    /// constructed state: a full pool and a single free fragment spanning
    /// the whole usable region. Intended for round-trip tests after every
    /// allocation has been freed.
    pub fn assert_is_in_initial_state(&self) {
        assert_eq!(
            self.validate_node_pool(),
            self.max_fragments - 1,
            "pool must hold every node but the free-list seed"
        );

        assert_ne!(self.free_head, SENTINEL, "free list must not be empty");
        let first = self.node_at(self.free_head);
        assert_eq!(first.next, SENTINEL, "free list must hold a single node");
        assert_eq!(first.previous, SENTINEL);
        assert_eq!(
            self.addressing.to_offset(first.base),
            self.table_size(),
            "sole fragment must start directly after the node table"
        );
        assert_eq!(
            first.size as usize,
            self.usable_size(),
            "sole fragment must span the whole usable region"
        );
        assert_eq!(self.available_bytes, self.usable_size());
    }

    fn assert_node_slot_in_table(&self, displacement: u64) {
        let offset = self.addressing.to_offset(displacement);
        assert!(
            offset >= NODE_SIZE,
            "node displacement {displacement:#x} points at the reserved slot"
        );
        assert!(
            offset + NODE_SIZE <= self.table_size(),
            "node displacement {displacement:#x} lies outside the node table"
        );
        assert_eq!(
            offset % NODE_SIZE,
            0,
            "node displacement {displacement:#x} is not slot-aligned"
        );
    }

    fn assert_free_node_correct(&self, displacement: u64, node: &Node) {
        self.assert_node_slot_in_table(displacement);

        if node.previous == SENTINEL {
            assert_eq!(
                self.free_head, displacement,
                "node without predecessor must be the free-list head"
            );
        } else {
            let prev = self.node_at(node.previous);
            assert_eq!(prev.next, displacement, "free-list back link broken");
            assert!(
                prev.base + prev.size < node.base,
                "free neighbors must be strictly ordered with a gap; adjacency is never left unmerged"
            );
        }
        if node.next != SENTINEL {
            let next = self.node_at(node.next);
            assert_eq!(next.previous, displacement, "free-list forward link broken");
        }

        let base_offset = self.addressing.to_offset(node.base);
        assert!(
            base_offset >= self.table_size(),
            "free fragment overlaps the node table"
        );
        assert!(
            base_offset + node.size as usize <= self.total_size(),
            "free fragment extends past the arena end"
        );
    }

    fn assert_pooled_node_correct(&self, displacement: u64, node: &Node) {
        self.assert_node_slot_in_table(displacement);

        assert_eq!(node.base, SENTINEL, "pooled node must carry no region");
        assert_eq!(node.size, 0, "pooled node must carry no size");
        if node.previous == SENTINEL {
            assert_eq!(
                self.pool_head, displacement,
                "node without predecessor must be the pool head"
            );
        } else {
            let prev = self.node_at(node.previous);
            assert_eq!(prev.next, displacement, "pool back link broken");
        }
        if node.next != SENTINEL {
            let next = self.node_at(node.next);
            assert_eq!(next.previous, displacement, "pool forward link broken");
        }
    }
}
