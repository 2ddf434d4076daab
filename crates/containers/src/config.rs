//! Configuration for arena storage and the block deque
//!
//! Both configs follow the same shape: a `Default` tuned by build profile,
//! named presets, and a `validate` pass run by the constructors that accept
//! them.

use crate::error::{ContainerError, ContainerResult};

/// Configuration for [`StackStorage`](crate::allocator::StackStorage)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    /// Count allocations and track the peak cursor position
    pub track_stats: bool,

    /// Fill pattern byte for newly allocated memory (for debugging)
    pub alloc_pattern: Option<u8>,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            track_stats: cfg!(debug_assertions),
            alloc_pattern: if cfg!(debug_assertions) {
                Some(0xCC)
            } else {
                None
            },
        }
    }
}

impl StackConfig {
    /// Production configuration - optimized for performance
    #[must_use]
    pub fn production() -> Self {
        Self {
            track_stats: false,
            alloc_pattern: None,
        }
    }

    /// Debug configuration - optimized for debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            track_stats: true,
            alloc_pattern: Some(0xCC),
        }
    }
}

/// Configuration for [`Deque`](crate::deque::Deque)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DequeConfig {
    /// Number of slots in the initial block map.
    ///
    /// Blocks themselves are allocated on first use; this only sizes the
    /// indirection array so that the first pushes at either end do not
    /// trigger a map reallocation.
    pub initial_blocks: usize,
}

impl Default for DequeConfig {
    fn default() -> Self {
        Self {
            initial_blocks: Self::DEFAULT_BLOCKS,
        }
    }
}

impl DequeConfig {
    /// Map size used by [`Deque::new`](crate::deque::Deque::new)
    pub const DEFAULT_BLOCKS: usize = 8;

    /// Smallest map the deque can work with (one block each side of center)
    pub const MIN_BLOCKS: usize = 2;

    /// Minimal map for short-lived or tiny deques
    #[must_use]
    pub fn small() -> Self {
        Self {
            initial_blocks: Self::MIN_BLOCKS,
        }
    }

    /// Larger map for deques expected to grow to thousands of elements
    #[must_use]
    pub fn large() -> Self {
        Self { initial_blocks: 64 }
    }

    /// Map large enough to hold `len` elements centered, with the same
    /// headroom on both sides
    #[must_use]
    pub fn for_len(len: usize, block_size: usize) -> Self {
        let blocks = len / block_size + 1;
        Self {
            initial_blocks: (3 * blocks).max(Self::DEFAULT_BLOCKS),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ContainerResult<()> {
        if self.initial_blocks < Self::MIN_BLOCKS {
            return Err(ContainerError::invalid_config(&format!(
                "deque needs at least {} initial blocks, got {}",
                Self::MIN_BLOCKS,
                self.initial_blocks
            )));
        }
        if self.initial_blocks > isize::MAX as usize / core::mem::size_of::<usize>() {
            return Err(ContainerError::size_overflow("deque block map"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_differ_in_tracking() {
        assert!(StackConfig::debug().track_stats);
        assert!(!StackConfig::production().track_stats);
        assert_eq!(StackConfig::production().alloc_pattern, None);
    }

    #[test]
    fn deque_config_validation() {
        assert!(DequeConfig::default().validate().is_ok());
        assert!(DequeConfig::small().validate().is_ok());
        assert!(DequeConfig::large().validate().is_ok());

        let err = DequeConfig { initial_blocks: 1 }.validate().unwrap_err();
        assert_eq!(err.code(), "CONTAINER:CONFIG:INVALID");

        let err = DequeConfig {
            initial_blocks: usize::MAX,
        }
        .validate()
        .unwrap_err();
        assert_eq!(err.code(), "CONTAINER:ALLOC:OVERFLOW");
    }

    #[test]
    fn for_len_centers_with_headroom() {
        let config = DequeConfig::for_len(1000, 32);
        assert!(config.initial_blocks >= 3 * (1000 / 32));
        assert!(config.validate().is_ok());
    }
}
