//! Explicit write transaction for repository work.
//!
//! # Responsibility
//! - Group allocate-then-insert sequences into one IMMEDIATE transaction.
//! - Make commit and rollback explicit caller decisions.
//!
//! # Invariants
//! - Dropping an uncommitted unit rolls it back.
//! - The write lock is taken at `begin`, so no other connection can insert
//!   between an id check and the insert that uses the id.

use crate::id::{IdAllocator, IntegerIdGenerator};
use crate::repo::box_repo::{RepoResult, SqliteBoxRepository};
use log::{debug, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// One open write transaction over the box store.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    /// Starts an IMMEDIATE transaction on `conn`.
    pub fn begin(conn: &'conn mut Connection) -> RepoResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        debug!("event=uow_begin module=repo status=ok");
        Ok(Self { tx })
    }

    /// Returns a repository whose reads and writes belong to this unit.
    pub fn repository(&self) -> RepoResult<SqliteBoxRepository<'_>> {
        SqliteBoxRepository::try_new(&self.tx)
    }

    /// Returns a repository bound to this unit using `allocator` for ids.
    pub fn repository_with<G: IntegerIdGenerator>(
        &self,
        allocator: IdAllocator<G>,
    ) -> RepoResult<SqliteBoxRepository<'_, G>> {
        SqliteBoxRepository::with_allocator(&self.tx, allocator)
    }

    pub fn commit(self) -> RepoResult<()> {
        self.tx.commit()?;
        info!("event=uow_commit module=repo status=ok");
        Ok(())
    }

    pub fn rollback(self) -> RepoResult<()> {
        self.tx.rollback()?;
        info!("event=uow_rollback module=repo status=ok");
        Ok(())
    }
}
