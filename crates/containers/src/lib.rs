//! # nebula-containers
//!
//! Allocator-aware containers and reference-counted pointers.
//!
//! This crate provides:
//! - A fixed-capacity arena ([`allocator::StackStorage`]) and the allocator
//!   handle that borrows it ([`allocator::StackAllocator`])
//! - A circular doubly-linked list with cursors ([`list::List`])
//! - A block-based double-ended queue with random access ([`deque::Deque`])
//! - Shared and weak pointers over a type-erased control block
//!   ([`shared::SharedPtr`], [`shared::WeakPtr`])
//! - A NUL-terminated byte string ([`string::ByteString`])
//!
//! Every container takes its allocator as a type parameter and routes all of
//! its storage through it, so the same list or deque can live on the heap or
//! entirely inside a stack buffer.
//!
//! ## Quick Start
//!
//! ```rust
//! use nebula_containers::prelude::*;
//!
//! let storage = StackStorage::<4096>::new();
//! let mut list = List::new_in(StackAllocator::new(&storage));
//! list.push_back(3);
//! list.push_front(1);
//!
//! let mut cursor = list.cursor_back_mut();
//! cursor.insert(2);
//! assert_eq!(list.iter().copied().collect::<Vec<_>>(), [1, 2, 3]);
//! assert!(storage.used() > 0);
//! ```
//!
//! ## Features
//!
//! - `logging` (default): `tracing` events for allocator selection, deque
//!   growth, control block lifecycle and allocation failures
//!
//! ## Error handling
//!
//! Operations that can run out of memory come in pairs: the plain form
//! panics (an exhausted arena is a fatal precondition violation) and the
//! `try_*` form returns [`ContainerError`].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::all)]
#![warn(clippy::perf)]
#![warn(clippy::pedantic)]
#![warn(rust_2018_idioms)]
// containers are built on raw storage; every unsafe block carries a SAFETY note
#![allow(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
// Signed cursor arithmetic converts between isize and usize on purpose
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::return_self_not_must_use)]

pub mod allocator;
pub mod config;
pub mod deque;
pub mod error;
pub mod list;
pub mod shared;
pub mod string;

pub use crate::config::{DequeConfig, StackConfig};
pub use crate::error::{ContainerError, ContainerResult, Result};

/// Crate version, as recorded in `Cargo.toml`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::config::{DequeConfig, StackConfig};
    pub use crate::error::{ContainerError, ContainerResult};

    pub use crate::allocator::{
        Allocator, AllocatorStats, Propagation, StackAllocator, StackStorage, SystemAllocator,
        TrackedAllocator, TypedAllocator,
    };

    pub use crate::deque::Deque;
    pub use crate::list::List;
    pub use crate::shared::{SharedPtr, WeakPtr};
    pub use crate::string::ByteString;
}
