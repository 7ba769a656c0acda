//! Physical objects: things that can be seen, described, named and sometimes carried.
//!
//! Items and people share one capability surface so that "who or what is here"
//! queries treat them uniformly. A person is never carryable.

use super::types::{ObjectId, PlayerId};

/// Normalize a typed target or handle for comparison.
///
/// - Convert to lowercase
/// - Trim whitespace
/// - Collapse multiple spaces to single space
pub fn normalize_handle(raw: &str) -> String {
    raw.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// An inert object that lives either in a room or in one player's inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ObjectId,
    pub name: String,
    pub description: String,
    /// Lowercase tokens a command argument may use to name this item.
    pub handles: Vec<String>,
    pub visible: bool,
    pub carryable: bool,
}

impl Item {
    /// A visible, carryable item. Handles are normalized; the name is always one of them.
    pub fn new(id: ObjectId, name: &str, description: &str, handles: &[&str]) -> Self {
        let mut all = vec![normalize_handle(name)];
        for handle in handles {
            let handle = normalize_handle(handle);
            if !handle.is_empty() && !all.contains(&handle) {
                all.push(handle);
            }
        }
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            handles: all,
            visible: true,
            carryable: true,
        }
    }

    /// The red ball every fresh world starts with.
    pub fn ball(id: ObjectId) -> Self {
        Self::new(id, "ball", "A red ball.", &["ball"])
    }

    pub fn fixed(mut self) -> Self {
        self.carryable = false;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }
}

/// A player seen as an object in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalObject {
    Item(Item),
    Person(Person),
}

impl PhysicalObject {
    pub fn visible(&self) -> bool {
        match self {
            PhysicalObject::Item(item) => item.visible,
            PhysicalObject::Person(_) => true,
        }
    }

    pub fn carryable(&self) -> bool {
        match self {
            PhysicalObject::Item(item) => item.carryable,
            PhysicalObject::Person(_) => false,
        }
    }

    pub fn description(&self) -> String {
        match self {
            PhysicalObject::Item(item) => item.description.clone(),
            PhysicalObject::Person(person) => format!("A person: {}", person.name),
        }
    }

    pub fn text_handles(&self) -> Vec<String> {
        match self {
            PhysicalObject::Item(item) => item.handles.clone(),
            PhysicalObject::Person(person) => vec![person.name.to_lowercase()],
        }
    }

    /// Case-insensitive match of a typed token against the handles.
    pub fn answers_to(&self, token: &str) -> bool {
        let token = normalize_handle(token);
        !token.is_empty() && self.text_handles().iter().any(|h| *h == token)
    }
}

/// First visible candidate, in iteration order, that answers to `token`.
pub fn resolve_target<'a, I>(candidates: I, token: &str) -> Option<&'a PhysicalObject>
where
    I: IntoIterator<Item = &'a PhysicalObject>,
{
    candidates
        .into_iter()
        .find(|obj| obj.visible() && obj.answers_to(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_handle() {
        assert_eq!(normalize_handle("Red  Ball "), "red ball");
        assert_eq!(normalize_handle("BALL"), "ball");
    }

    #[test]
    fn test_item_handles_include_name() {
        let lamp = Item::new(ObjectId(7), "Brass Lamp", "A dented lamp.", &["lamp", "LAMP"]);
        assert_eq!(lamp.handles, vec!["brass lamp".to_string(), "lamp".to_string()]);
    }

    #[test]
    fn test_person_is_visible_but_not_carryable() {
        let person = PhysicalObject::Person(Person {
            id: PlayerId(3),
            name: "RedFox".to_string(),
        });
        assert!(person.visible());
        assert!(!person.carryable());
        assert_eq!(person.description(), "A person: RedFox");
        assert!(person.answers_to("redfox"));
        assert!(person.answers_to("REDFOX"));
    }

    #[test]
    fn test_resolve_target_first_match_wins() {
        let first = PhysicalObject::Item(Item::new(ObjectId(1), "ball", "A red ball.", &[]));
        let second = PhysicalObject::Item(Item::new(ObjectId(2), "ball", "A blue ball.", &[]));
        let hidden = PhysicalObject::Item(Item::new(ObjectId(3), "key", "A key.", &[]).hidden());
        let candidates = vec![first.clone(), second, hidden];
        assert_eq!(resolve_target(&candidates, "Ball"), Some(&first));
        assert_eq!(resolve_target(&candidates, "key"), None);
        assert_eq!(resolve_target(&candidates, ""), None);
    }
}
