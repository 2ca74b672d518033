//! Collision-checked identifier allocation.
//!
//! # Responsibility
//! - Draw random candidates over the full 63-bit identifier space.
//! - Retry candidates against a caller-supplied uniqueness oracle.
//!
//! # Invariants
//! - An allocator never returns a candidate the oracle reported as taken.
//! - Allocation does not reserve anything; callers persist the entity.

pub mod allocator;
pub mod generator;

pub use allocator::{AllocError, AllocationPolicy, IdAllocator};
pub use generator::{IntegerIdGenerator, RandomIdGenerator};
