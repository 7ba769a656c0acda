use thiserror::Error;

use super::types::{Direction, RoomId};

/// Errors raised by the world core.
///
/// Input mistakes a player can make (unknown verb, missing target, full inventory)
/// are not errors: commands answer them with text. What lands here is either a
/// collaborator failure the caller has to decide about, or an invariant violation.
#[derive(Debug, Error)]
pub enum MudError {
    /// The direction already has an exit; exits are never overwritten.
    #[error("exit {0} already exists")]
    ExitConflict(Direction),

    /// No exit leads in the requested direction.
    #[error("no exit {0}")]
    NoSuchExit(String),

    /// The word does not name a direction.
    #[error("unknown direction: {0}")]
    UnknownDirection(String),

    /// A room id that the registry does not know.
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    /// The task that owns a mailbox has stopped.
    #[error("{0} mailbox closed")]
    MailboxClosed(&'static str),

    /// The connection went away.
    #[error("connection closed")]
    Disconnected,

    /// A state the serialization protocol should make impossible.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, sockets).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MudError {
    /// True for errors that mean a programming bug rather than a runtime condition.
    pub fn is_invariant(&self) -> bool {
        matches!(self, MudError::Invariant(_))
    }
}
