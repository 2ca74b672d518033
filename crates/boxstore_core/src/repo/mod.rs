//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the box aggregate data access contract.
//! - Isolate SQLite query details from service/business orchestration.
//! - Offer an explicit unit of work for multi-step writes.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`BoxNotFound`, `ItemNotFound`)
//!   in addition to DB transport errors.
//! - Store failures are returned to the caller, never asserted on.

pub mod box_repo;
pub mod unit_of_work;
