//! Take and drop: the serialized interaction queue.
//!
//! Requests are resolved one at a time by the owner task of the room they were
//! queued on, so resolution and mutation of the room's objects and the actor's
//! inventory happen in one uninterrupted step. Two players racing for the same
//! object are simply processed in queue order: the first moves it, the second
//! no longer finds it.
//!
//! Rejections are ordinary outcomes carrying the text for the actor. An
//! [`MudError::Invariant`] means an object would have ended up in two places
//! at once; the request is aborted with nothing moved.

use std::fmt;

use super::errors::MudError;
use super::object::{resolve_target, PhysicalObject};
use super::player::PlayerHandle;
use super::room::RoomState;
use super::stimulus::Stimulus;

/// A queued take or drop. Targets are matched case-insensitively.
#[derive(Debug, Clone)]
pub enum Action {
    Take { actor: PlayerHandle, target: String },
    Drop { actor: PlayerHandle, target: String },
}

impl Action {
    pub fn actor(&self) -> &PlayerHandle {
        match self {
            Action::Take { actor, .. } | Action::Drop { actor, .. } => actor,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Action::Take { target, .. } | Action::Drop { target, .. } => target,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            Action::Take { .. } => "take",
            Action::Drop { .. } => "drop",
        };
        write!(f, "{} '{}' by {}", verb, self.target(), self.actor().name)
    }
}

/// Result of resolving one [`Action`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Took { object: String },
    Dropped { object: String },
    NothingHere,
    CannotCarry,
    NotCarryable,
    NotCarrying,
    /// The actor left the room between queuing the request and its resolution.
    NotPresent,
}

impl Interaction {
    pub fn succeeded(&self) -> bool {
        matches!(self, Interaction::Took { .. } | Interaction::Dropped { .. })
    }

    /// Reply for the actor on rejection. Successes are reported through the
    /// room's stimulus instead.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Interaction::Took { .. } | Interaction::Dropped { .. } => None,
            Interaction::NothingHere => Some("There is nothing here by that name.\n"),
            Interaction::CannotCarry => Some("You can't carry any more.\n"),
            Interaction::NotCarryable => Some("You can't take that.\n"),
            Interaction::NotCarrying => Some("You aren't carrying that.\n"),
            Interaction::NotPresent => Some("You aren't there anymore.\n"),
        }
    }

    /// The stimulus a successful outcome emits to the room.
    pub fn stimulus(&self, actor: &PlayerHandle) -> Option<Stimulus> {
        match self {
            Interaction::Took { object } => Some(Stimulus::Took {
                actor: actor.actor(),
                object: object.clone(),
            }),
            Interaction::Dropped { object } => Some(Stimulus::Dropped {
                actor: actor.actor(),
                object: object.clone(),
            }),
            _ => None,
        }
    }
}

/// Resolve `action` against `room` and, on success, move the object.
pub fn resolve(action: &Action, room: &mut RoomState) -> Result<Interaction, MudError> {
    if !room.has_occupant(action.actor().id) {
        return Ok(Interaction::NotPresent);
    }
    match action {
        Action::Take { actor, target } => take_object(actor, target, room),
        Action::Drop { actor, target } => drop_object(actor, target, room),
    }
}

fn take_object(
    actor: &PlayerHandle,
    target: &str,
    room: &mut RoomState,
) -> Result<Interaction, MudError> {
    let candidates = room.physical_objects();
    let item = match resolve_target(&candidates, target) {
        None => return Ok(Interaction::NothingHere),
        Some(PhysicalObject::Person(_)) => return Ok(Interaction::NotCarryable),
        Some(PhysicalObject::Item(item)) if !item.carryable => {
            return Ok(Interaction::NotCarryable)
        }
        Some(PhysicalObject::Item(item)) => item,
    };

    let mut inventory = actor.lock_inventory();
    if inventory.contains(item.id) {
        return Err(MudError::Invariant(format!(
            "object {} is in room {} and carried by {}",
            item.id,
            room.id(),
            actor.name
        )));
    }
    if inventory.is_full() {
        return Ok(Interaction::CannotCarry);
    }
    let moved = room.remove_object(item.id).ok_or_else(|| {
        MudError::Invariant(format!("object {} vanished from room {}", item.id, room.id()))
    })?;
    let object = moved.name.clone();
    if let Err(moved) = inventory.insert(moved) {
        room.add_object(moved);
        return Err(MudError::Invariant(format!(
            "inventory of {} filled during take",
            actor.name
        )));
    }
    Ok(Interaction::Took { object })
}

fn drop_object(
    actor: &PlayerHandle,
    target: &str,
    room: &mut RoomState,
) -> Result<Interaction, MudError> {
    let mut inventory = actor.lock_inventory();
    let Some(idx) = inventory.position_of(target) else {
        return Ok(Interaction::NotCarrying);
    };
    let id = inventory.items()[idx].id;
    if room.holds_object(id) {
        return Err(MudError::Invariant(format!(
            "object {} is carried by {} and lies in room {}",
            id,
            actor.name,
            room.id()
        )));
    }
    let item = inventory
        .remove_at(idx)
        .ok_or_else(|| MudError::Invariant(format!("inventory slot {} emptied", idx)))?;
    let object = item.name.clone();
    room.add_object(item);
    Ok(Interaction::Dropped { object })
}
