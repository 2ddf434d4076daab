//! Standalone error types for nebula-containers
//!
//! Uses thiserror for clean, idiomatic Rust error definitions.

use core::alloc::Layout;
use thiserror::Error;

#[cfg(feature = "logging")]
use tracing::warn;

// ============================================================================
// Main Error Type
// ============================================================================

/// Container and allocator errors
#[must_use = "errors should be handled"]
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    // --- Allocation Errors ---
    #[error("Memory allocation failed: {size} bytes with {align} byte alignment")]
    AllocationFailed { size: usize, align: usize },

    #[error(
        "Arena exhausted: requested {requested} bytes, available {available} (capacity: {capacity})"
    )]
    ArenaExhausted {
        requested: usize,
        available: usize,
        capacity: usize,
    },

    #[error("Invalid memory layout: {reason}")]
    InvalidLayout { reason: String },

    #[error("Size overflow during operation: {operation}")]
    SizeOverflow { operation: String },

    // --- Access Errors ---
    #[error("Index {index} out of range for length {len}")]
    OutOfRange { index: usize, len: usize },

    // --- Configuration Errors ---
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl ContainerError {
    /// Get error code for categorization
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AllocationFailed { .. } => "CONTAINER:ALLOC:FAILED",
            Self::ArenaExhausted { .. } => "CONTAINER:ARENA:EXHAUSTED",
            Self::InvalidLayout { .. } => "CONTAINER:ALLOC:LAYOUT",
            Self::SizeOverflow { .. } => "CONTAINER:ALLOC:OVERFLOW",
            Self::OutOfRange { .. } => "CONTAINER:ACCESS:RANGE",
            Self::InvalidConfig { .. } => "CONTAINER:CONFIG:INVALID",
        }
    }

    /// Whether the error is an allocation failure of any kind
    #[must_use]
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailed { .. } | Self::ArenaExhausted { .. }
        )
    }

    /// Check if this is an out-of-range access error
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }

    // ============================================================================
    // Convenience Constructors
    // ============================================================================

    /// Create allocation failed error
    pub fn allocation_failed(size: usize, align: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(size, align, "memory allocation failed");

        Self::AllocationFailed { size, align }
    }

    /// Create allocation failed error from layout
    pub fn allocation_failed_with_layout(layout: Layout) -> Self {
        Self::allocation_failed(layout.size(), layout.align())
    }

    /// Create arena exhausted error
    pub fn arena_exhausted(requested: usize, available: usize, capacity: usize) -> Self {
        #[cfg(feature = "logging")]
        warn!(requested, available, capacity, "arena exhausted");

        Self::ArenaExhausted {
            requested,
            available,
            capacity,
        }
    }

    /// Create invalid layout error
    pub fn invalid_layout(reason: &str) -> Self {
        Self::InvalidLayout {
            reason: reason.to_string(),
        }
    }

    /// Create size overflow error
    pub fn size_overflow(operation: &str) -> Self {
        Self::SizeOverflow {
            operation: operation.to_string(),
        }
    }

    /// Create out-of-range error
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::OutOfRange { index, len }
    }

    /// Create invalid config error
    pub fn invalid_config(reason: &str) -> Self {
        Self::InvalidConfig {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// Result Types
// ============================================================================

/// Result type for container operations
pub type ContainerResult<T> = core::result::Result<T, ContainerError>;

/// Generic result type alias
pub type Result<T> = ContainerResult<T>;

/// Type aliases for the allocator module
pub type AllocError = ContainerError;
pub type AllocResult<T> = ContainerResult<T>;

/// Panics with the error of a failed infallible-API allocation.
///
/// Infallible container operations (`push_back`, `new_in`, ...) treat an
/// exhausted allocator as a fatal precondition violation.
#[cold]
#[track_caller]
pub(crate) fn alloc_failure(error: ContainerError) -> ! {
    panic!("{error}")
}

// ============================================================================
// Tests
// ============================================================================
