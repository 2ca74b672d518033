//! Box/item use-case service.
//!
//! # Responsibility
//! - Provision boxes and items with fresh identifiers and default titles.
//! - Apply title changes and removals on behalf of UI/CLI callers.
//!
//! # Invariants
//! - The repository is injected at construction; there is no global lookup.
//! - Titles are trimmed and must not be blank.
//! - Item operations verify the item belongs to the named box.

use crate::id::{AllocationPolicy, IdAllocator};
use crate::model::aggregate::{BoxAggregate, Item, DEFAULT_BOX_TITLE, DEFAULT_ITEM_TITLE};
use crate::model::ids::{BoxId, ItemId};
use crate::repo::box_repo::{BoxRepository, RepoError};
use crate::repo::unit_of_work::UnitOfWork;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from box service operations.
#[derive(Debug)]
pub enum BoxServiceError {
    /// Title is blank after trim.
    InvalidTitle,
    /// Target box does not exist.
    BoxNotFound(BoxId),
    /// Target item does not exist in the given box.
    ItemNotFound { item_id: ItemId, box_id: BoxId },
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for BoxServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTitle => write!(f, "title must not be blank"),
            Self::BoxNotFound(id) => write!(f, "box not found: {id}"),
            Self::ItemNotFound { item_id, box_id } => {
                write!(f, "item {item_id} not found in box {box_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoxServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BoxServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::BoxNotFound(id) => Self::BoxNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub type BoxServiceResult<T> = Result<T, BoxServiceError>;

/// Use-case service over an injected box repository.
pub struct BoxAndItemService<R: BoxRepository> {
    repo: R,
}

impl<R: BoxRepository> BoxAndItemService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Creates and persists an empty box titled `DEFAULT_BOX_TITLE`.
    pub fn provision_box(&self) -> BoxServiceResult<BoxId> {
        let box_id = self.repo.next_id()?;
        self.repo.add_box(&BoxAggregate::new(box_id, DEFAULT_BOX_TITLE))?;
        Ok(box_id)
    }

    /// Creates and persists an item titled `DEFAULT_ITEM_TITLE` in `box_id`.
    ///
    /// # Errors
    /// - `BoxNotFound` when the box does not exist; nothing is persisted.
    pub fn provision_item(&self, box_id: BoxId) -> BoxServiceResult<ItemId> {
        let item_id = self.repo.next_item_id()?;
        self.repo
            .add_item(box_id, &Item::new(item_id, DEFAULT_ITEM_TITLE))?;
        Ok(item_id)
    }

    pub fn change_box_title(&self, box_id: BoxId, title: &str) -> BoxServiceResult<()> {
        let title = normalize_title(title)?;
        self.repo.rename_box(box_id, title)?;
        Ok(())
    }

    pub fn change_item_title(
        &self,
        item_id: ItemId,
        title: &str,
        box_id: BoxId,
    ) -> BoxServiceResult<()> {
        let title = normalize_title(title)?;
        self.ensure_item_in_box(item_id, box_id)?;
        self.repo
            .rename_item(item_id, title)
            .map_err(|err| item_error(err, box_id))
    }

    /// Removes a box together with all of its items.
    pub fn remove_box(&self, box_id: BoxId) -> BoxServiceResult<()> {
        self.repo.remove_box(box_id)?;
        Ok(())
    }

    pub fn remove_item(&self, item_id: ItemId, box_id: BoxId) -> BoxServiceResult<()> {
        self.ensure_item_in_box(item_id, box_id)?;
        self.repo
            .remove_item(item_id)
            .map_err(|err| item_error(err, box_id))
    }

    pub fn box_with_id(&self, box_id: BoxId) -> BoxServiceResult<Option<BoxAggregate>> {
        Ok(self.repo.box_with_id(box_id)?)
    }

    pub fn boxes(&self) -> BoxServiceResult<Vec<BoxAggregate>> {
        Ok(self.repo.boxes()?)
    }

    pub fn count(&self) -> BoxServiceResult<u64> {
        Ok(self.repo.count()?)
    }

    fn ensure_item_in_box(&self, item_id: ItemId, box_id: BoxId) -> BoxServiceResult<()> {
        match self.repo.item_with_id(item_id)? {
            Some((owner, _)) if owner == box_id => Ok(()),
            Some(_) => Err(BoxServiceError::ItemNotFound { item_id, box_id }),
            None => {
                if self.repo.box_with_id(box_id)?.is_none() {
                    return Err(BoxServiceError::BoxNotFound(box_id));
                }
                Err(BoxServiceError::ItemNotFound { item_id, box_id })
            }
        }
    }
}

/// Provisions a box inside one write transaction on `conn`.
pub fn provision_box_atomically(
    conn: &mut Connection,
    policy: AllocationPolicy,
) -> BoxServiceResult<BoxId> {
    let uow = UnitOfWork::begin(conn)?;
    let box_id = BoxAndItemService::new(uow.repository_with(allocator_for(policy))?)
        .provision_box()?;
    uow.commit()?;
    Ok(box_id)
}

/// Provisions an item in `box_id` inside one write transaction on `conn`.
pub fn provision_item_atomically(
    conn: &mut Connection,
    box_id: BoxId,
    policy: AllocationPolicy,
) -> BoxServiceResult<ItemId> {
    let uow = UnitOfWork::begin(conn)?;
    let item_id = BoxAndItemService::new(uow.repository_with(allocator_for(policy))?)
        .provision_item(box_id)?;
    uow.commit()?;
    Ok(item_id)
}

/// Maps a missing item onto the box the caller named.
fn item_error(err: RepoError, box_id: BoxId) -> BoxServiceError {
    match err {
        RepoError::ItemNotFound(item_id) => BoxServiceError::ItemNotFound { item_id, box_id },
        other => other.into(),
    }
}

fn allocator_for(policy: AllocationPolicy) -> IdAllocator {
    IdAllocator::with_policy(Default::default(), policy)
}

fn normalize_title(title: &str) -> BoxServiceResult<&str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(BoxServiceError::InvalidTitle);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{normalize_title, BoxAndItemService, BoxServiceError};
    use crate::model::aggregate::{BoxAggregate, Item};
    use crate::model::ids::{BoxId, ItemId};
    use crate::repo::box_repo::{BoxRepository, RepoError, RepoResult};

    /// Reports one item as present in box 1, but every write to it finds
    /// the row already gone.
    struct VanishingItemRepo;

    const OWNER: i64 = 1;
    const ITEM: i64 = 9;

    impl BoxRepository for VanishingItemRepo {
        fn add_box(&self, _: &BoxAggregate) -> RepoResult<()> {
            Ok(())
        }
        fn box_with_id(&self, id: BoxId) -> RepoResult<Option<BoxAggregate>> {
            Ok((id.get() == OWNER).then(|| BoxAggregate::new(id, "owner")))
        }
        fn boxes(&self) -> RepoResult<Vec<BoxAggregate>> {
            Ok(Vec::new())
        }
        fn count(&self) -> RepoResult<u64> {
            Ok(0)
        }
        fn next_id(&self) -> RepoResult<BoxId> {
            Ok(BoxId::new(OWNER).unwrap())
        }
        fn next_item_id(&self) -> RepoResult<ItemId> {
            Ok(ItemId::new(ITEM).unwrap())
        }
        fn rename_box(&self, _: BoxId, _: &str) -> RepoResult<()> {
            Ok(())
        }
        fn remove_box(&self, _: BoxId) -> RepoResult<()> {
            Ok(())
        }
        fn add_item(&self, _: BoxId, _: &Item) -> RepoResult<()> {
            Ok(())
        }
        fn item_with_id(&self, id: ItemId) -> RepoResult<Option<(BoxId, Item)>> {
            Ok(Some((BoxId::new(OWNER).unwrap(), Item::new(id, "ghost"))))
        }
        fn rename_item(&self, id: ItemId, _: &str) -> RepoResult<()> {
            Err(RepoError::ItemNotFound(id))
        }
        fn remove_item(&self, id: ItemId) -> RepoResult<()> {
            Err(RepoError::ItemNotFound(id))
        }
    }

    #[test]
    fn normalize_title_trims_and_rejects_blank() {
        assert_eq!(normalize_title("  Tools ").unwrap(), "Tools");
        assert!(normalize_title(" \t\n").is_err());
    }

    #[test]
    fn item_vanishing_before_write_reports_item_not_found_in_box() {
        let service = BoxAndItemService::new(VanishingItemRepo);
        let owner = BoxId::new(OWNER).unwrap();
        let item = ItemId::new(ITEM).unwrap();

        let removed = service.remove_item(item, owner).unwrap_err();
        assert!(matches!(
            removed,
            BoxServiceError::ItemNotFound { item_id, box_id } if item_id == item && box_id == owner
        ));

        let renamed = service.change_item_title(item, "late", owner).unwrap_err();
        assert!(matches!(
            renamed,
            BoxServiceError::ItemNotFound { item_id, box_id } if item_id == item && box_id == owner
        ));
    }
}
