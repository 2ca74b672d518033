//! Box aggregate and its item entities.
//!
//! # Responsibility
//! - Hold the in-memory shape of one box and the items it owns.
//! - Provide rename and add/remove helpers used by services.
//!
//! # Invariants
//! - `items` keeps insertion order.
//! - Item ids are unique inside one box; global uniqueness is enforced by
//!   the repository through id allocation.

use super::ids::{BoxId, ItemId};
use serde::{Deserialize, Serialize};

/// Title assigned to freshly provisioned boxes.
pub const DEFAULT_BOX_TITLE: &str = "New Box";
/// Title assigned to freshly provisioned items.
pub const DEFAULT_ITEM_TITLE: &str = "New Item";

/// Child entity owned by exactly one box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }

    /// Creates an item carrying `DEFAULT_ITEM_TITLE`.
    pub fn with_default_title(id: ItemId) -> Self {
        Self::new(id, DEFAULT_ITEM_TITLE)
    }
}

/// Aggregate root: a titled box of items.
///
/// Named `BoxAggregate` so it never shadows `std::boxed::Box`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxAggregate {
    pub id: BoxId,
    pub title: String,
    pub items: Vec<Item>,
}

impl BoxAggregate {
    /// Creates an empty box.
    pub fn new(id: BoxId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            items: Vec::new(),
        }
    }

    /// Creates an empty box carrying `DEFAULT_BOX_TITLE`.
    pub fn with_default_title(id: BoxId) -> Self {
        Self::new(id, DEFAULT_BOX_TITLE)
    }

    pub fn rename(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Appends an item.
    ///
    /// Returns `false` and leaves the box untouched when an item with the same
    /// id is already present.
    pub fn add_item(&mut self, item: Item) -> bool {
        if self.item(item.id).is_some() {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn item_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Removes and returns the item with `id`, keeping the order of the rest.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxAggregate, Item, DEFAULT_BOX_TITLE, DEFAULT_ITEM_TITLE};
    use crate::model::ids::{BoxId, ItemId};

    fn item(raw: i64, title: &str) -> Item {
        Item::new(ItemId::new(raw).unwrap(), title)
    }

    #[test]
    fn defaults_use_placeholder_titles() {
        let id = BoxId::new(1).unwrap();
        let aggregate = BoxAggregate::with_default_title(id);
        assert_eq!(aggregate.title, DEFAULT_BOX_TITLE);
        assert!(aggregate.items.is_empty());

        let child = Item::with_default_title(ItemId::new(2).unwrap());
        assert_eq!(child.title, DEFAULT_ITEM_TITLE);
    }

    #[test]
    fn add_item_keeps_insertion_order_and_rejects_duplicates() {
        let mut aggregate = BoxAggregate::new(BoxId::new(1).unwrap(), "tools");
        assert!(aggregate.add_item(item(30, "hammer")));
        assert!(aggregate.add_item(item(10, "saw")));
        assert!(!aggregate.add_item(item(30, "other hammer")));

        let titles: Vec<_> = aggregate.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, ["hammer", "saw"]);
    }

    #[test]
    fn remove_item_returns_removed_entity() {
        let mut aggregate = BoxAggregate::new(BoxId::new(1).unwrap(), "tools");
        aggregate.add_item(item(1, "a"));
        aggregate.add_item(item(2, "b"));
        aggregate.add_item(item(3, "c"));

        let removed = aggregate.remove_item(ItemId::new(2).unwrap()).unwrap();
        assert_eq!(removed.title, "b");
        assert!(aggregate.remove_item(ItemId::new(2).unwrap()).is_none());
        assert_eq!(aggregate.items.len(), 2);
        assert_eq!(aggregate.items[1].title, "c");
    }

    #[test]
    fn item_mut_allows_in_place_rename() {
        let mut aggregate = BoxAggregate::new(BoxId::new(1).unwrap(), "tools");
        aggregate.add_item(item(5, "draft"));
        aggregate.item_mut(ItemId::new(5).unwrap()).unwrap().title = "final".to_string();
        assert_eq!(aggregate.item(ItemId::new(5).unwrap()).unwrap().title, "final");
    }
}
