//! Displacement addressing.
//!
//! Every reference stored inside the arena (free-list links, fragment
//! bases) is a displacement rather than a native pointer. In relative
//! mode a displacement is a byte offset from the arena start, so the
//! whole arena can be copied to a new location or persisted and every
//! internal reference remains valid. In absolute mode a displacement
//! carries a caller-chosen base address, for embeddings that never
//! relocate and want handed-out values to be directly meaningful as
//! addresses.

/// Reserved displacement meaning "no node" / "no link".
///
/// Numerically this is the offset of the permanently reserved node-table
/// slot 0 in relative mode, and the null address in absolute mode (an
/// absolute-mode arena must therefore never be based at address 0).
pub const SENTINEL: u64 = 0;

/// Addressing policy, fixed for the lifetime of an allocator.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Displacements are byte offsets from the arena start. The arena is
    /// relocatable: a bulk copy of its bytes preserves all metadata.
    #[default]
    Relative,
    /// Displacements are `base + offset`. Not relocatable; `base` must be
    /// non-zero so the sentinel never collides with a real displacement.
    Absolute { base: u64 },
}

impl AddressingMode {
    /// Converts a displacement back to a byte offset into the arena.
    ///
    /// The displacement must have come from this allocator; callers
    /// handling untrusted values go through
    /// [`checked_offset`](Self::checked_offset) instead.
    #[must_use]
    pub const fn to_offset(self, displacement: u64) -> usize {
        match self {
            Self::Relative => displacement as usize,
            Self::Absolute { base } => (displacement - base) as usize,
        }
    }

    /// Fallible [`to_offset`](Self::to_offset): returns `None` for a
    /// displacement that lies below an absolute-mode base and so cannot
    /// name any position inside the arena.
    #[must_use]
    pub const fn checked_offset(self, displacement: u64) -> Option<usize> {
        match self {
            Self::Relative => Some(displacement as usize),
            Self::Absolute { base } => match displacement.checked_sub(base) {
                Some(offset) => Some(offset as usize),
                None => None,
            },
        }
    }

    /// Converts a byte offset into the arena to a displacement.
    #[must_use]
    pub const fn to_displacement(self, offset: usize) -> u64 {
        match self {
            Self::Relative => offset as u64,
            Self::Absolute { base } => base + offset as u64,
        }
    }

    /// Returns true if arena bytes can be moved without invalidating the
    /// metadata stored in them.
    #[must_use]
    pub const fn is_relocatable(self) -> bool {
        matches!(self, Self::Relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_round_trip() {
        let mode = AddressingMode::Relative;
        for offset in [0usize, 32, 4096, 1 << 20] {
            assert_eq!(mode.to_offset(mode.to_displacement(offset)), offset);
        }
    }

    #[test]
    fn absolute_round_trip() {
        let mode = AddressingMode::Absolute { base: 0x7f00_0000 };
        for offset in [0usize, 32, 4096] {
            let displacement = mode.to_displacement(offset);
            assert_eq!(displacement, 0x7f00_0000 + offset as u64);
            assert_eq!(mode.to_offset(displacement), offset);
        }
    }

    #[test]
    fn sentinel_is_offset_zero_in_relative_mode() {
        assert_eq!(AddressingMode::Relative.to_displacement(0), SENTINEL);
    }

    #[test]
    fn absolute_displacements_never_hit_sentinel_for_nonzero_base() {
        let mode = AddressingMode::Absolute { base: 0x1000 };
        assert_ne!(mode.to_displacement(0), SENTINEL);
    }

    #[test]
    fn checked_offset_rejects_displacements_below_absolute_base() {
        let mode = AddressingMode::Absolute { base: 0x4000 };
        assert_eq!(mode.checked_offset(0x3fff), None);
        assert_eq!(mode.checked_offset(0), None);
        assert_eq!(mode.checked_offset(0x4000), Some(0));
        assert_eq!(mode.checked_offset(0x4020), Some(0x20));
        assert_eq!(AddressingMode::Relative.checked_offset(0x20), Some(0x20));
    }

    #[test]
    fn only_relative_mode_is_relocatable() {
        assert!(AddressingMode::Relative.is_relocatable());
        assert!(!AddressingMode::Absolute { base: 0x1000 }.is_relocatable());
    }

    #[test]
    fn default_mode_is_relative() {
        assert_eq!(AddressingMode::default(), AddressingMode::Relative);
    }
}
