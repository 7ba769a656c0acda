//! Stimuli: the events a room fans out to its occupants.
//!
//! A stimulus is created, queued on one room, delivered to the occupants that
//! perceive it, and then discarded. Who perceives what is decided by a
//! [`PerceptionTable`] keyed by the stimulus kind, built once at startup and
//! shared by every room.

use std::collections::HashMap;
use std::fmt;

use super::errors::MudError;
use super::types::PlayerId;

/// Identity of the player a stimulus is about, captured when it was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: PlayerId,
    pub name: String,
}

impl Actor {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stimulus {
    PlayerEntered { actor: Actor },
    PlayerLeft { actor: Actor },
    Said { actor: Actor, text: String },
    Took { actor: Actor, object: String },
    Dropped { actor: Actor, object: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StimulusKind {
    Enter,
    Leave,
    Say,
    Take,
    Drop,
}

impl fmt::Display for StimulusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            StimulusKind::Enter => "enter",
            StimulusKind::Leave => "leave",
            StimulusKind::Say => "say",
            StimulusKind::Take => "take",
            StimulusKind::Drop => "drop",
        };
        f.write_str(tag)
    }
}

impl Stimulus {
    pub fn kind(&self) -> StimulusKind {
        match self {
            Stimulus::PlayerEntered { .. } => StimulusKind::Enter,
            Stimulus::PlayerLeft { .. } => StimulusKind::Leave,
            Stimulus::Said { .. } => StimulusKind::Say,
            Stimulus::Took { .. } => StimulusKind::Take,
            Stimulus::Dropped { .. } => StimulusKind::Drop,
        }
    }

    pub fn actor(&self) -> &Actor {
        match self {
            Stimulus::PlayerEntered { actor }
            | Stimulus::PlayerLeft { actor }
            | Stimulus::Said { actor, .. }
            | Stimulus::Took { actor, .. }
            | Stimulus::Dropped { actor, .. } => actor,
        }
    }

    /// Text shown to `viewer`, worded from their point of view.
    pub fn describe(&self, viewer: PlayerId) -> String {
        let own = self.actor().id == viewer;
        let name = &self.actor().name;
        match self {
            Stimulus::PlayerEntered { .. } => format!("{} has entered the room.\n", name),
            Stimulus::PlayerLeft { .. } => format!("{} has left the room.\n", name),
            Stimulus::Said { text, .. } if own => format!("You say, \"{}\"\n", text),
            Stimulus::Said { text, .. } => format!("{} says, \"{}\"\n", name, text),
            Stimulus::Took { object, .. } if own => format!("You take the {}.\n", object),
            Stimulus::Took { object, .. } => format!("{} takes the {}.\n", name, object),
            Stimulus::Dropped { object, .. } if own => format!("You drop the {}.\n", object),
            Stimulus::Dropped { object, .. } => format!("{} drops the {}.\n", name, object),
        }
    }
}

/// Decides whether `viewer` perceives a stimulus of the kind the test is registered for.
///
/// Invoking a test with a stimulus of another kind is a bug and yields
/// [`MudError::Invariant`].
pub type PerceiveTest = fn(PlayerId, &Stimulus) -> Result<bool, MudError>;

fn mismatch(test: &str, stimulus: &Stimulus) -> MudError {
    MudError::Invariant(format!(
        "{} perception test invoked with a {} stimulus",
        test,
        stimulus.kind()
    ))
}

pub fn perceives_enter(viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
    match stimulus {
        Stimulus::PlayerEntered { actor } => Ok(actor.id != viewer),
        other => Err(mismatch("enter", other)),
    }
}

pub fn perceives_leave(viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
    match stimulus {
        Stimulus::PlayerLeft { actor } => Ok(actor.id != viewer),
        other => Err(mismatch("leave", other)),
    }
}

pub fn perceives_say(_viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
    match stimulus {
        Stimulus::Said { .. } => Ok(true),
        other => Err(mismatch("say", other)),
    }
}

pub fn perceives_take(_viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
    match stimulus {
        Stimulus::Took { .. } => Ok(true),
        other => Err(mismatch("take", other)),
    }
}

pub fn perceives_drop(_viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
    match stimulus {
        Stimulus::Dropped { .. } => Ok(true),
        other => Err(mismatch("drop", other)),
    }
}

/// Perception tests keyed by stimulus kind.
#[derive(Clone)]
pub struct PerceptionTable {
    tests: HashMap<StimulusKind, PerceiveTest>,
}

impl fmt::Debug for PerceptionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.tests.keys()).finish()
    }
}

impl Default for PerceptionTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl PerceptionTable {
    pub fn empty() -> Self {
        Self {
            tests: HashMap::new(),
        }
    }

    /// Arrivals and departures are hidden from the player making them;
    /// speech, takes and drops reach everyone present, the actor included.
    pub fn standard() -> Self {
        Self::empty()
            .with(StimulusKind::Enter, perceives_enter)
            .with(StimulusKind::Leave, perceives_leave)
            .with(StimulusKind::Say, perceives_say)
            .with(StimulusKind::Take, perceives_take)
            .with(StimulusKind::Drop, perceives_drop)
    }

    pub fn with(mut self, kind: StimulusKind, test: PerceiveTest) -> Self {
        self.tests.insert(kind, test);
        self
    }

    pub fn perceives(&self, viewer: PlayerId, stimulus: &Stimulus) -> Result<bool, MudError> {
        let kind = stimulus.kind();
        let test = self.tests.get(&kind).ok_or_else(|| {
            MudError::Invariant(format!("no perception test registered for {}", kind))
        })?;
        test(viewer, stimulus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fox() -> Actor {
        Actor::new(PlayerId(1), "RedFox")
    }

    #[test]
    fn test_actor_does_not_perceive_own_arrival_or_departure() {
        let table = PerceptionTable::standard();
        let entered = Stimulus::PlayerEntered { actor: fox() };
        let left = Stimulus::PlayerLeft { actor: fox() };
        assert!(!table.perceives(PlayerId(1), &entered).unwrap());
        assert!(table.perceives(PlayerId(2), &entered).unwrap());
        assert!(!table.perceives(PlayerId(1), &left).unwrap());
        assert!(table.perceives(PlayerId(2), &left).unwrap());
    }

    #[test]
    fn test_actions_reach_everyone_including_actor() {
        let table = PerceptionTable::standard();
        let said = Stimulus::Said {
            actor: fox(),
            text: "hi".into(),
        };
        let took = Stimulus::Took {
            actor: fox(),
            object: "ball".into(),
        };
        for viewer in [PlayerId(1), PlayerId(2)] {
            assert!(table.perceives(viewer, &said).unwrap());
            assert!(table.perceives(viewer, &took).unwrap());
        }
    }

    #[test]
    fn test_mismatched_variant_is_invariant_violation() {
        let said = Stimulus::Said {
            actor: fox(),
            text: "hi".into(),
        };
        let err = perceives_enter(PlayerId(2), &said).unwrap_err();
        assert!(err.is_invariant());

        let table = PerceptionTable::empty().with(StimulusKind::Say, perceives_drop);
        assert!(table.perceives(PlayerId(2), &said).unwrap_err().is_invariant());
    }

    #[test]
    fn test_missing_entry_is_invariant_violation() {
        let table = PerceptionTable::empty();
        let left = Stimulus::PlayerLeft { actor: fox() };
        assert!(table.perceives(PlayerId(2), &left).unwrap_err().is_invariant());
    }

    #[test]
    fn test_describe_is_viewer_specific() {
        let took = Stimulus::Took {
            actor: fox(),
            object: "ball".into(),
        };
        assert_eq!(took.describe(PlayerId(1)), "You take the ball.\n");
        assert_eq!(took.describe(PlayerId(9)), "RedFox takes the ball.\n");
        let said = Stimulus::Said {
            actor: fox(),
            text: "hello".into(),
        };
        assert_eq!(said.describe(PlayerId(9)), "RedFox says, \"hello\"\n");
    }
}
