//! Arena configuration.
//!
//! All allocator parameters are fixed at construction: the maximum number
//! of concurrent free fragments (which sizes the node table), the request
//! alignment, and the addressing policy. Validation happens once, up
//! front; no further configuration is possible after allocation begins.

use crate::displacement::AddressingMode;
use crate::error::ConfigError;
use crate::node::NODE_SIZE;

/// Default request alignment in bytes.
pub const DEFAULT_ALIGNMENT: usize = 8;

/// Construction parameters for an [`crate::ArenaAllocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Design-time bound on concurrent free fragments. The node table
    /// reserves `max_fragments + 1` slots (slot 0 is the sentinel slot).
    pub max_fragments: usize,
    /// Every request size is rounded up to a multiple of this. Must be a
    /// power of two dividing [`NODE_SIZE`].
    pub alignment: usize,
    /// Displacement addressing policy.
    pub addressing: AddressingMode,
}

impl ArenaConfig {
    /// Configuration with the default alignment and relative addressing.
    #[must_use]
    pub fn new(max_fragments: usize) -> Self {
        Self {
            max_fragments,
            alignment: DEFAULT_ALIGNMENT,
            addressing: AddressingMode::Relative,
        }
    }

    #[must_use]
    pub fn with_alignment(mut self, alignment: usize) -> Self {
        self.alignment = alignment;
        self
    }

    #[must_use]
    pub fn with_addressing(mut self, addressing: AddressingMode) -> Self {
        self.addressing = addressing;
        self
    }

    /// Byte size of the node table this configuration reserves at the
    /// front of the arena.
    #[must_use]
    pub const fn table_size(&self) -> usize {
        (self.max_fragments + 1) * NODE_SIZE
    }

    pub(crate) fn validate(&self, total_size: usize) -> Result<(), ConfigError> {
        if self.max_fragments == 0 {
            return Err(ConfigError::ZeroFragmentCapacity);
        }
        if self.alignment == 0
            || !self.alignment.is_power_of_two()
            || NODE_SIZE % self.alignment != 0
        {
            return Err(ConfigError::BadAlignment {
                alignment: self.alignment,
            });
        }
        if let AddressingMode::Absolute { base } = self.addressing {
            if base == 0 {
                return Err(ConfigError::NullBaseAddress);
            }
            if base % self.alignment as u64 != 0 {
                return Err(ConfigError::MisalignedBase {
                    base,
                    alignment: self.alignment,
                });
            }
        }
        if total_size <= self.table_size() {
            return Err(ConfigError::ArenaTooSmall {
                total_size,
                table_size: self.table_size(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_relative_word_aligned() {
        let config = ArenaConfig::new(16);
        assert_eq!(config.alignment, DEFAULT_ALIGNMENT);
        assert_eq!(config.addressing, AddressingMode::Relative);
        assert_eq!(config.table_size(), 17 * NODE_SIZE);
    }

    #[test]
    fn accepts_reasonable_configuration() {
        assert!(ArenaConfig::new(4).validate(4096).is_ok());
    }

    #[test]
    fn rejects_zero_fragment_capacity() {
        assert_eq!(
            ArenaConfig::new(0).validate(4096),
            Err(ConfigError::ZeroFragmentCapacity)
        );
    }

    #[test]
    fn rejects_arena_smaller_than_table() {
        let config = ArenaConfig::new(4);
        // Exactly table-sized leaves no usable region, also rejected.
        assert_eq!(
            config.validate(config.table_size()),
            Err(ConfigError::ArenaTooSmall {
                total_size: config.table_size(),
                table_size: config.table_size(),
            })
        );
    }

    #[test]
    fn rejects_bad_alignments() {
        for alignment in [0usize, 3, 12, 64] {
            assert_eq!(
                ArenaConfig::new(4).with_alignment(alignment).validate(4096),
                Err(ConfigError::BadAlignment { alignment }),
                "alignment {alignment} must be rejected"
            );
        }
        for alignment in [1usize, 2, 4, 8, 16, 32] {
            assert!(
                ArenaConfig::new(4)
                    .with_alignment(alignment)
                    .validate(4096)
                    .is_ok(),
                "alignment {alignment} must be accepted"
            );
        }
    }

    #[test]
    fn rejects_null_absolute_base() {
        assert_eq!(
            ArenaConfig::new(4)
                .with_addressing(AddressingMode::Absolute { base: 0 })
                .validate(4096),
            Err(ConfigError::NullBaseAddress)
        );
    }

    #[test]
    fn rejects_misaligned_absolute_base() {
        assert_eq!(
            ArenaConfig::new(4)
                .with_addressing(AddressingMode::Absolute { base: 0x1001 })
                .validate(4096),
            Err(ConfigError::MisalignedBase {
                base: 0x1001,
                alignment: DEFAULT_ALIGNMENT,
            })
        );
    }
}
