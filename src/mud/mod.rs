//! The live-session core of the world: rooms, players, stimuli, the take/drop
//! interaction queue and the registry that ties them together.

pub mod commands;
pub mod errors;
pub mod interaction;
pub mod inventory;
pub mod object;
pub mod player;
pub mod room;
pub mod stimulus;
pub mod storage;
pub mod types;
pub mod world;

pub use commands::{tokenize, CommandTable, Effect};
pub use errors::MudError;
pub use interaction::{Action, Interaction};
pub use object::{Item, PhysicalObject};
pub use player::{ClientEnd, Connection, Outbox, OutboxReceiver, Outgoing, PlayerHandle};
pub use room::{spawn_room, DeliveryPolicy, RoomHandle, RoomOptions, RoomState};
pub use stimulus::{PerceptionTable, Stimulus, StimulusKind};
pub use storage::{PlayerRecord, PlayerStore, SledPlayerStore};
pub use types::{Direction, ExitRecord, ObjectId, PlayerId, RoomId};
pub use world::World;
