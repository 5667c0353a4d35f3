//! Node-table slot codec.
//!
//! A node is four little-endian 64-bit words living inside the arena:
//! `{ base, size, next, previous }`. Nodes are read and written through
//! byte slices, never through pointer reinterpretation, so the metadata
//! is plain arena content and survives a bulk copy of the buffer.

use crate::displacement::SENTINEL;

/// Byte width of one node-table slot.
pub const NODE_SIZE: usize = 32;

const WORD: usize = 8;

/// Decoded copy of a node-table slot.
///
/// A node is in exactly one of two lists at any time: the free list
/// (where `base`/`size` describe a real region) or the node pool (where
/// `base == SENTINEL` and `size == 0`).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Node {
    /// Displacement of the free region this node represents.
    pub base: u64,
    /// Region length in bytes.
    pub size: u64,
    /// Displacement of the following node, `SENTINEL` at list end.
    pub next: u64,
    /// Displacement of the preceding node, `SENTINEL` at list head.
    pub previous: u64,
}

impl Node {
    /// The shape every pooled (unused) slot must hold.
    pub fn pooled(next: u64, previous: u64) -> Self {
        Self {
            base: SENTINEL,
            size: 0,
            next,
            previous,
        }
    }

    /// Decodes the slot starting at `offset`.
    pub fn read(bytes: &[u8], offset: usize) -> Self {
        Self {
            base: read_word(bytes, offset),
            size: read_word(bytes, offset + WORD),
            next: read_word(bytes, offset + 2 * WORD),
            previous: read_word(bytes, offset + 3 * WORD),
        }
    }

    /// Encodes this node into the slot starting at `offset`.
    pub fn write(self, bytes: &mut [u8], offset: usize) {
        write_word(bytes, offset, self.base);
        write_word(bytes, offset + WORD, self.size);
        write_word(bytes, offset + 2 * WORD, self.next);
        write_word(bytes, offset + 3 * WORD, self.previous);
    }
}

fn read_word(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; WORD];
    buf.copy_from_slice(&bytes[at..at + WORD]);
    u64::from_le_bytes(buf)
}

fn write_word(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + WORD].copy_from_slice(&value.to_le_bytes());
}
