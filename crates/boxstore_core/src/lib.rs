//! Core domain logic for boxstore.
//! Boxes own items; both are stored in one SQLite file and identified by
//! collision-checked random 63-bit integers.

pub mod config;
pub mod db;
pub mod id;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use id::{AllocError, AllocationPolicy, IdAllocator, IntegerIdGenerator, RandomIdGenerator};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::aggregate::{BoxAggregate, Item, DEFAULT_BOX_TITLE, DEFAULT_ITEM_TITLE};
pub use model::ids::{BoxId, IdError, Identifier, ItemId};
pub use repo::box_repo::{BoxRepository, RepoError, RepoResult, SqliteBoxRepository};
pub use repo::unit_of_work::UnitOfWork;
pub use service::box_service::{
    provision_box_atomically, provision_item_atomically, BoxAndItemService, BoxServiceError,
    BoxServiceResult,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
