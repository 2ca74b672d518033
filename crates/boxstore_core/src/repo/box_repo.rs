//! Box repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Be the only gateway between box/item aggregates and the `boxes`/`items`
//!   tables.
//! - Allocate collision-free box and item identifiers.
//!
//! # Invariants
//! - Box ids and item ids are separate global namespaces.
//! - Lookups by id report absence as `Ok(None)`, never as an error.
//! - Removing a box removes all of its items.
//! - `boxes()` and `count()` cover the same rows.
//! - `boxes.seq` grows with every insert, so `boxes()` follows insertion
//!   order regardless of clock resolution or id values.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::id::{AllocError, IdAllocator, IntegerIdGenerator, RandomIdGenerator};
use crate::model::aggregate::{BoxAggregate, Item};
use crate::model::ids::{BoxId, Identifier, ItemId};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const BOX_BY_ID_SQL: &str = "SELECT id, title FROM boxes WHERE id = ?1;";
const BOX_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM boxes WHERE id = ?1);";
const ITEM_EXISTS_SQL: &str = "SELECT EXISTS(SELECT 1 FROM items WHERE id = ?1);";
const ITEMS_OF_BOX_SQL: &str = "SELECT id, box_id, title
FROM items
WHERE box_id = ?1
ORDER BY sort_order ASC, id ASC;";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from box repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target box does not exist.
    BoxNotFound(BoxId),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Bounded id allocation ran out of attempts.
    AllocationExhausted {
        namespace: &'static str,
        attempts: u32,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid aggregate.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::BoxNotFound(id) => write!(f, "box not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::AllocationExhausted {
                namespace,
                attempts,
            } => write!(
                f,
                "no free {namespace} identifier found after {attempts} attempts"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "box repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "box repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "box repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted box data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    fn from_alloc(namespace: &'static str, err: AllocError<RepoError>) -> Self {
        match err {
            AllocError::Exhausted { attempts } => Self::AllocationExhausted {
                namespace,
                attempts,
            },
            AllocError::Oracle(inner) => inner,
        }
    }
}

/// Repository interface for box aggregates.
pub trait BoxRepository {
    /// Inserts a new box together with its items.
    ///
    /// The box id must come from `next_id`; a duplicate id is rejected by the
    /// store and surfaces as `RepoError::Db`.
    fn add_box(&self, aggregate: &BoxAggregate) -> RepoResult<()>;
    /// Loads one box with its items.
    fn box_with_id(&self, id: BoxId) -> RepoResult<Option<BoxAggregate>>;
    /// Lists every box in insertion order.
    fn boxes(&self) -> RepoResult<Vec<BoxAggregate>>;
    /// Counts every box.
    fn count(&self) -> RepoResult<u64>;
    /// Returns a box id not used by any persisted box.
    fn next_id(&self) -> RepoResult<BoxId>;
    /// Returns an item id not used by any persisted item in any box.
    fn next_item_id(&self) -> RepoResult<ItemId>;
    /// Replaces the title of one box.
    fn rename_box(&self, id: BoxId, title: &str) -> RepoResult<()>;
    /// Deletes one box and every item it owns.
    fn remove_box(&self, id: BoxId) -> RepoResult<()>;
    /// Appends one item to an existing box.
    fn add_item(&self, box_id: BoxId, item: &Item) -> RepoResult<()>;
    /// Loads one item together with the id of its owning box.
    fn item_with_id(&self, id: ItemId) -> RepoResult<Option<(BoxId, Item)>>;
    /// Replaces the title of one item.
    fn rename_item(&self, id: ItemId, title: &str) -> RepoResult<()>;
    /// Deletes one item.
    fn remove_item(&self, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed box repository.
pub struct SqliteBoxRepository<'conn, G = RandomIdGenerator> {
    conn: &'conn Connection,
    allocator: IdAllocator<G>,
}

impl<'conn> SqliteBoxRepository<'conn> {
    /// Creates repository from a migrated connection, drawing random ids.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        Self::with_allocator(conn, IdAllocator::default())
    }
}

impl<'conn, G: IntegerIdGenerator> SqliteBoxRepository<'conn, G> {
    /// Creates repository with a caller-provided allocator.
    pub fn with_allocator(conn: &'conn Connection, allocator: IdAllocator<G>) -> RepoResult<Self> {
        ensure_box_connection_ready(conn)?;
        Ok(Self { conn, allocator })
    }

    fn has_box(&self, identifier: Identifier) -> RepoResult<bool> {
        exists(self.conn, BOX_EXISTS_SQL, identifier)
    }

    fn has_item(&self, identifier: Identifier) -> RepoResult<bool> {
        exists(self.conn, ITEM_EXISTS_SQL, identifier)
    }
}

impl<G: IntegerIdGenerator> BoxRepository for SqliteBoxRepository<'_, G> {
    fn add_box(&self, aggregate: &BoxAggregate) -> RepoResult<()> {
        with_savepoint(self.conn, "add_box", || {
            self.conn.execute(
                "INSERT INTO boxes (id, title, seq)
                 SELECT ?1, ?2, COALESCE(MAX(seq) + 1, 0) FROM boxes;",
                params![aggregate.id.get(), aggregate.title.as_str()],
            )?;
            for (index, item) in aggregate.items.iter().enumerate() {
                insert_item(self.conn, aggregate.id, item, index as i64)?;
            }
            Ok(())
        })?;

        info!(
            "event=box_added module=repo status=ok box_id={} items={}",
            aggregate.id,
            aggregate.items.len()
        );
        Ok(())
    }

    fn box_with_id(&self, id: BoxId) -> RepoResult<Option<BoxAggregate>> {
        let row = self
            .conn
            .query_row(BOX_BY_ID_SQL, [id.get()], |row| {
                Ok((row.get::<_, i64>("id")?, row.get::<_, String>("title")?))
            })
            .optional()?;

        let Some((raw_id, title)) = row else {
            return Ok(None);
        };

        let mut aggregate = BoxAggregate::new(parse_box_id(raw_id)?, title);
        let mut stmt = self.conn.prepare(ITEMS_OF_BOX_SQL)?;
        let mut rows = stmt.query([id.get()])?;
        while let Some(row) = rows.next()? {
            let (_, item) = parse_item_row(row)?;
            aggregate.items.push(item);
        }
        Ok(Some(aggregate))
    }

    fn boxes(&self) -> RepoResult<Vec<BoxAggregate>> {
        let mut items_by_box: HashMap<BoxId, Vec<Item>> = HashMap::new();
        let mut item_stmt = self.conn.prepare(
            "SELECT id, box_id, title
             FROM items
             ORDER BY box_id ASC, sort_order ASC, id ASC;",
        )?;
        let mut item_rows = item_stmt.query([])?;
        while let Some(row) = item_rows.next()? {
            let (box_id, item) = parse_item_row(row)?;
            items_by_box.entry(box_id).or_default().push(item);
        }

        let mut box_stmt = self.conn.prepare(
            "SELECT id, title
             FROM boxes
             ORDER BY seq ASC;",
        )?;
        let mut box_rows = box_stmt.query([])?;
        let mut boxes = Vec::new();
        while let Some(row) = box_rows.next()? {
            let id = parse_box_id(row.get("id")?)?;
            let mut aggregate = BoxAggregate::new(id, row.get::<_, String>("title")?);
            aggregate.items = items_by_box.remove(&id).unwrap_or_default();
            boxes.push(aggregate);
        }
        Ok(boxes)
    }

    fn count(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM boxes;", [], |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative box count `{count}`")))
    }

    fn next_id(&self) -> RepoResult<BoxId> {
        self.allocator
            .next_id(|candidate| self.has_box(candidate))
            .map_err(|err| RepoError::from_alloc("box", err))
    }

    fn next_item_id(&self) -> RepoResult<ItemId> {
        self.allocator
            .next_id(|candidate| self.has_item(candidate))
            .map_err(|err| RepoError::from_alloc("item", err))
    }

    fn rename_box(&self, id: BoxId, title: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE boxes SET title = ?2 WHERE id = ?1;",
            params![id.get(), title],
        )?;
        if changed == 0 {
            return Err(RepoError::BoxNotFound(id));
        }
        Ok(())
    }

    fn remove_box(&self, id: BoxId) -> RepoResult<()> {
        // Items are deleted explicitly so the cascade holds even on
        // connections opened without `foreign_keys=ON`.
        let items_removed = with_savepoint(self.conn, "remove_box", || {
            let items_removed = self
                .conn
                .execute("DELETE FROM items WHERE box_id = ?1;", [id.get()])?;
            let changed = self
                .conn
                .execute("DELETE FROM boxes WHERE id = ?1;", [id.get()])?;
            if changed == 0 {
                return Err(RepoError::BoxNotFound(id));
            }
            Ok(items_removed)
        })?;

        info!(
            "event=box_removed module=repo status=ok box_id={} items_removed={}",
            id, items_removed
        );
        Ok(())
    }

    fn add_item(&self, box_id: BoxId, item: &Item) -> RepoResult<()> {
        with_savepoint(self.conn, "add_item", || {
            if !self.has_box(box_id.identifier())? {
                return Err(RepoError::BoxNotFound(box_id));
            }
            let sort_order: i64 = self.conn.query_row(
                "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM items WHERE box_id = ?1;",
                [box_id.get()],
                |row| row.get(0),
            )?;
            insert_item(self.conn, box_id, item, sort_order)
        })?;

        debug!(
            "event=item_added module=repo status=ok box_id={} item_id={}",
            box_id, item.id
        );
        Ok(())
    }

    fn item_with_id(&self, id: ItemId) -> RepoResult<Option<(BoxId, Item)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, box_id, title FROM items WHERE id = ?1;")?;
        let mut rows = stmt.query([id.get()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn rename_item(&self, id: ItemId, title: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items SET title = ?2 WHERE id = ?1;",
            params![id.get(), title],
        )?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(id));
        }
        Ok(())
    }

    fn remove_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM items WHERE id = ?1;", [id.get()])?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(id));
        }
        Ok(())
    }
}

fn insert_item(conn: &Connection, box_id: BoxId, item: &Item, sort_order: i64) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO items (id, box_id, title, sort_order) VALUES (?1, ?2, ?3, ?4);",
        params![item.id.get(), box_id.get(), item.title.as_str(), sort_order],
    )?;
    Ok(())
}

fn exists(conn: &Connection, sql: &str, identifier: Identifier) -> RepoResult<bool> {
    let found: i64 = conn.query_row(sql, [identifier.get()], |row| row.get(0))?;
    Ok(found == 1)
}

/// Runs `body` inside a named savepoint so it nests under an outer
/// transaction as well as running standalone.
fn with_savepoint<T>(
    conn: &Connection,
    name: &str,
    body: impl FnOnce() -> RepoResult<T>,
) -> RepoResult<T> {
    conn.execute_batch(&format!("SAVEPOINT {name};"))?;
    match body() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {name};"))?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) =
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name};"))
            {
                error!(
                    "event=savepoint_rollback module=repo status=error savepoint={} error={}",
                    name,
                    rollback_err
                );
            }
            Err(err)
        }
    }
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<(BoxId, Item)> {
    let raw_id: i64 = row.get("id")?;
    let id = ItemId::new(raw_id)
        .map_err(|_| RepoError::InvalidData(format!("invalid item id `{raw_id}` in items.id")))?;
    let box_id = parse_box_id(row.get("box_id")?)?;
    Ok((box_id, Item::new(id, row.get::<_, String>("title")?)))
}

fn parse_box_id(raw_id: i64) -> RepoResult<BoxId> {
    BoxId::new(raw_id)
        .map_err(|_| RepoError::InvalidData(format!("invalid box id `{raw_id}` in boxes.id")))
}

fn ensure_box_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 2] = [
        ("boxes", &["id", "title", "seq", "created_at"]),
        ("items", &["id", "box_id", "title", "sort_order", "created_at"]),
    ];
    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
