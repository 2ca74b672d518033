//! Box store schema steps.
//!
//! # Responsibility
//! - List the `boxes`/`items` schema steps in strictly increasing order.
//! - Apply every pending step in one transaction.
//!
//! # Invariants
//! - Step versions are monotonic; the last one is the latest schema.
//! - The applied version is mirrored to `PRAGMA user_version`.
//! - A failing step leaves the store at its previous version.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct SchemaStep {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const SCHEMA_STEPS: &[SchemaStep] = &[SchemaStep {
    version: 1,
    name: "boxes_and_items",
    sql: include_str!("0001_init.sql"),
}];

/// Returns the box store schema version this build writes.
pub fn latest_version() -> u32 {
    latest_of(SCHEMA_STEPS)
}

/// Brings the connection's schema up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    apply_steps(conn, SCHEMA_STEPS)
}

fn latest_of(steps: &[SchemaStep]) -> u32 {
    steps.last().map_or(0, |step| step.version)
}

fn apply_steps(conn: &mut Connection, steps: &[SchemaStep]) -> DbResult<()> {
    let from_version = current_user_version(conn)?;
    let to_version = latest_of(steps);

    if from_version > to_version {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: to_version,
        });
    }
    if from_version == to_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in steps.iter().filter(|step| step.version > from_version) {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.execute_batch(&format!("PRAGMA user_version = {};", step.version)))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
        debug!(
            "event=db_schema_step module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!(
        "event=db_migrate module=db status=ok from_version={} to_version={}",
        from_version, to_version
    );
    Ok(())
}

fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, apply_steps, current_user_version, latest_version, SchemaStep};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn apply_migrations_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(current_user_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn failing_step_reports_its_name_and_keeps_previous_version() {
        let steps = [
            SchemaStep {
                version: 1,
                name: "boxes",
                sql: "CREATE TABLE boxes (id INTEGER PRIMARY KEY);",
            },
            SchemaStep {
                version: 2,
                name: "broken",
                sql: "CREATE TABLE boxes (id INTEGER PRIMARY KEY);",
            },
        ];
        let mut conn = Connection::open_in_memory().unwrap();

        let err = apply_steps(&mut conn, &steps).unwrap_err();
        assert!(matches!(
            err,
            DbError::Migration {
                version: 2,
                name: "broken",
                ..
            }
        ));
        assert!(err.to_string().contains("`broken`"));
        assert_eq!(current_user_version(&conn).unwrap(), 0);
    }
}
