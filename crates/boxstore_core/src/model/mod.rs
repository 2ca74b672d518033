//! Box/Item aggregate domain model.
//!
//! # Responsibility
//! - Define the aggregate root (`BoxAggregate`) and its child entity (`Item`).
//! - Define identifier newtypes that keep box and item namespaces apart.
//!
//! # Invariants
//! - Identifiers are non-negative 63-bit integers.
//! - A box owns its items exclusively; items never move between boxes.

pub mod aggregate;
pub mod ids;
