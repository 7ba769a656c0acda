//! Bounded player inventory.
//!
//! The inventory is only ever mutated by the interaction processor of the room
//! its owner occupies; everyone else reads snapshots.
use super::object::{normalize_handle, Item};
use super::types::ObjectId;

/// Fixed-capacity container of items exclusively owned by one player.
#[derive(Debug, Clone)]
pub struct Inventory {
    slots: Vec<Item>,
    capacity: usize,
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.slots.iter().any(|item| item.id == id)
    }

    /// Store an item; hands it back if every slot is taken.
    pub fn insert(&mut self, item: Item) -> Result<(), Item> {
        if self.is_full() {
            return Err(item);
        }
        self.slots.push(item);
        Ok(())
    }

    /// Slot index of the first visible carried item answering to `token`.
    pub fn position_of(&self, token: &str) -> Option<usize> {
        let token = normalize_handle(token);
        if token.is_empty() {
            return None;
        }
        self.slots
            .iter()
            .position(|item| item.visible && item.handles.iter().any(|h| *h == token))
    }

    pub fn find(&self, token: &str) -> Option<&Item> {
        self.position_of(token).map(|idx| &self.slots[idx])
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Item> {
        if index < self.slots.len() {
            Some(self.slots.remove(index))
        } else {
            None
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u64, name: &str) -> Item {
        Item::new(ObjectId(id), name, &format!("A {}.", name), &[])
    }

    #[test]
    fn test_insert_until_full() {
        let mut inv = Inventory::with_capacity(2);
        assert!(inv.insert(item(1, "ball")).is_ok());
        assert!(inv.insert(item(2, "key")).is_ok());
        assert!(inv.is_full());
        let rejected = inv.insert(item(3, "lamp")).unwrap_err();
        assert_eq!(rejected.id, ObjectId(3));
        assert_eq!(inv.len(), 2);
    }

    #[test]
    fn test_find_is_case_insensitive_and_ordered() {
        let mut inv = Inventory::with_capacity(10);
        inv.insert(item(1, "ball")).unwrap();
        inv.insert(item(2, "ball")).unwrap();
        assert_eq!(inv.find("BALL").map(|i| i.id), Some(ObjectId(1)));
        assert!(inv.find("sword").is_none());
        assert!(inv.find("   ").is_none());
    }

    #[test]
    fn test_remove_at() {
        let mut inv = Inventory::with_capacity(10);
        inv.insert(item(5, "coin")).unwrap();
        let idx = inv.position_of("coin").unwrap();
        let removed = inv.remove_at(idx).unwrap();
        assert_eq!(removed.id, ObjectId(5));
        assert!(inv.is_empty());
        assert!(inv.remove_at(0).is_none());
    }

    #[test]
    fn test_hidden_items_do_not_answer_to_their_names() {
        let mut inv = Inventory::with_capacity(10);
        inv.insert(item(1, "key").hidden()).unwrap();
        assert!(inv.find("key").is_none());
        assert!(inv.position_of("key").is_none());

        inv.insert(item(2, "key")).unwrap();
        assert_eq!(inv.position_of("key"), Some(1));
        assert_eq!(inv.len(), 2);
    }
}
