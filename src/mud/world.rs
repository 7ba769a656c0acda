//! The world registry and session acceptance.
//!
//! [`World`] is the explicitly constructed root of a running server: it owns
//! the identifier allocator, the command and perception tables, the player
//! store and the configuration, and talks to a registry task that maps room
//! and player ids to their handles. Nothing here is global, so tests can build
//! as many independent worlds as they like.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use rand::seq::SliceRandom;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;
use crate::metrics;

use super::commands::CommandTable;
use super::errors::MudError;
use super::object::Item;
use super::player::{spawn_session, Connection, PlayerHandle, Session};
use super::room::{spawn_room, RoomHandle, RoomOptions};
use super::stimulus::PerceptionTable;
use super::storage::{create_or_load_player, PlayerRecord, PlayerStore};
use super::types::{Direction, IdAllocator, PlayerId, RoomId};

const NAME_COLORS: [&str; 3] = ["Red", "Blue", "Yellow"];
const NAME_ANIMALS: [&str; 3] = ["Pony", "Fox", "Jackal"];

/// A display name like `BlueJackal`.
pub fn random_name() -> String {
    let mut rng = rand::thread_rng();
    let color = NAME_COLORS.choose(&mut rng).copied().unwrap_or("Red");
    let animal = NAME_ANIMALS.choose(&mut rng).copied().unwrap_or("Fox");
    format!("{}{}", color, animal)
}

#[derive(Debug)]
enum RegistryCommand {
    AddRoom {
        room: RoomHandle,
    },
    Room {
        id: RoomId,
        reply: oneshot::Sender<Option<RoomHandle>>,
    },
    RoomIds {
        reply: oneshot::Sender<Vec<RoomId>>,
    },
    SetStartRoom {
        id: RoomId,
    },
    StartRoom {
        reply: oneshot::Sender<Option<RoomHandle>>,
    },
    AddPlayer {
        player: PlayerHandle,
        reply: oneshot::Sender<()>,
    },
    RemovePlayer {
        id: PlayerId,
        reply: oneshot::Sender<Option<PlayerHandle>>,
    },
    Players {
        reply: oneshot::Sender<Vec<PlayerHandle>>,
    },
}

/// Cloneable handle to the registry task.
#[derive(Debug, Clone)]
struct RegistryHandle {
    tx: mpsc::UnboundedSender<RegistryCommand>,
}

impl RegistryHandle {
    fn send(&self, cmd: RegistryCommand) -> Result<(), MudError> {
        self.tx
            .send(cmd)
            .map_err(|_| MudError::MailboxClosed("registry"))
    }

    async fn ask<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, MudError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| MudError::MailboxClosed("registry"))
    }
}

#[derive(Default)]
struct Registry {
    rooms: HashMap<RoomId, RoomHandle>,
    players: HashMap<PlayerId, PlayerHandle>,
    start: Option<RoomId>,
}

fn start_registry() -> RegistryHandle {
    let (tx, mut rx) = mpsc::unbounded_channel::<RegistryCommand>();
    tokio::spawn(async move {
        let mut registry = Registry::default();
        while let Some(cmd) = rx.recv().await {
            match cmd {
                RegistryCommand::AddRoom { room } => {
                    registry.rooms.insert(room.id(), room);
                }
                RegistryCommand::Room { id, reply } => {
                    let _ = reply.send(registry.rooms.get(&id).cloned());
                }
                RegistryCommand::RoomIds { reply } => {
                    let mut ids: Vec<RoomId> = registry.rooms.keys().copied().collect();
                    ids.sort();
                    let _ = reply.send(ids);
                }
                RegistryCommand::SetStartRoom { id } => registry.start = Some(id),
                RegistryCommand::StartRoom { reply } => {
                    let room = registry.start.and_then(|id| registry.rooms.get(&id).cloned());
                    let _ = reply.send(room);
                }
                RegistryCommand::AddPlayer { player, reply } => {
                    registry.players.insert(player.id, player);
                    let _ = reply.send(());
                }
                RegistryCommand::RemovePlayer { id, reply } => {
                    let _ = reply.send(registry.players.remove(&id));
                }
                RegistryCommand::Players { reply } => {
                    let mut players: Vec<PlayerHandle> =
                        registry.players.values().cloned().collect();
                    players.sort_by_key(|p| p.id);
                    let _ = reply.send(players);
                }
            }
        }
        debug!("world registry stopped");
    });
    RegistryHandle { tx }
}

struct WorldInner {
    registry: RegistryHandle,
    ids: IdAllocator,
    store: Arc<dyn PlayerStore>,
    config: Arc<Config>,
    commands: Arc<CommandTable>,
    perception: Arc<PerceptionTable>,
}

/// Root of a running world. Cheap to clone.
#[derive(Clone)]
pub struct World {
    inner: Arc<WorldInner>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("commands", &self.inner.commands)
            .field("perception", &self.inner.perception)
            .finish()
    }
}

impl World {
    /// A world with the standard command and perception tables.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, store: Arc<dyn PlayerStore>) -> Self {
        Self::with_tables(
            config,
            store,
            CommandTable::standard(),
            PerceptionTable::standard(),
        )
    }

    pub fn with_tables(
        config: Config,
        store: Arc<dyn PlayerStore>,
        commands: CommandTable,
        perception: PerceptionTable,
    ) -> Self {
        Self {
            inner: Arc::new(WorldInner {
                registry: start_registry(),
                ids: IdAllocator::new(),
                store,
                config: Arc::new(config),
                commands: Arc::new(commands),
                perception: Arc::new(perception),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn commands(&self) -> &CommandTable {
        &self.inner.commands
    }

    pub fn store(&self) -> &dyn PlayerStore {
        self.inner.store.as_ref()
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.inner.ids
    }

    /// Options for a new room, built from this world's config and tables.
    pub fn room_options(&self) -> RoomOptions {
        RoomOptions::from_config(&self.inner.config, self.inner.perception.clone())
    }

    /// Create the start room holding a red ball and mark it as the arrival point.
    pub async fn build_default(&self) -> Result<RoomHandle, MudError> {
        let text = self.inner.config.world.start_room_text.clone();
        let room = self.create_room(&text).await?;
        room.add_object(Item::ball(self.inner.ids.object())).await?;
        self.set_start_room(room.id())?;
        info!("built start room {}", room.id());
        Ok(room)
    }

    pub async fn create_room(&self, text: &str) -> Result<RoomHandle, MudError> {
        self.create_room_with(text, self.room_options()).await
    }

    /// Create a room with its own local verbs.
    pub async fn create_room_with_commands(
        &self,
        text: &str,
        commands: CommandTable,
    ) -> Result<RoomHandle, MudError> {
        self.create_room_with(text, self.room_options().with_commands(commands)).await
    }

    pub async fn create_room_with(
        &self,
        text: &str,
        options: RoomOptions,
    ) -> Result<RoomHandle, MudError> {
        let id = self.inner.ids.room();
        let room = spawn_room(id, text, options);
        self.inner
            .registry
            .send(RegistryCommand::AddRoom { room: room.clone() })?;
        debug!("created room {}", id);
        Ok(room)
    }

    pub fn set_start_room(&self, id: RoomId) -> Result<(), MudError> {
        self.inner
            .registry
            .send(RegistryCommand::SetStartRoom { id })
    }

    pub async fn start_room(&self) -> Result<RoomHandle, MudError> {
        self.inner
            .registry
            .ask(|reply| RegistryCommand::StartRoom { reply })
            .await?
            .ok_or_else(|| MudError::NotFound("start room".to_string()))
    }

    pub async fn room(&self, id: RoomId) -> Result<Option<RoomHandle>, MudError> {
        self.inner
            .registry
            .ask(|reply| RegistryCommand::Room { id, reply })
            .await
    }

    pub async fn room_ids(&self) -> Result<Vec<RoomId>, MudError> {
        self.inner
            .registry
            .ask(|reply| RegistryCommand::RoomIds { reply })
            .await
    }

    /// Connect two registered rooms; see [`RoomHandle::connect`].
    pub async fn connect(
        &self,
        from: RoomId,
        direction: Direction,
        to: RoomId,
        two_way: bool,
    ) -> Result<(), MudError> {
        let a = self.room(from).await?.ok_or(MudError::RoomNotFound(from))?;
        let b = self.room(to).await?.ok_or(MudError::RoomNotFound(to))?;
        a.connect(direction, &b, two_way).await
    }

    /// Every connected player, ordered by id.
    pub async fn players(&self) -> Result<Vec<PlayerHandle>, MudError> {
        self.inner
            .registry
            .ask(|reply| RegistryCommand::Players { reply })
            .await
    }

    pub async fn remove_player(&self, id: PlayerId) -> Result<Option<PlayerHandle>, MudError> {
        self.inner
            .registry
            .ask(|reply| RegistryCommand::RemovePlayer { id, reply })
            .await
    }

    /// Undo a half-finished accept: leave `room` if given, then unregister.
    async fn abandon(&self, room: Option<&RoomHandle>, id: PlayerId) {
        if let Some(room) = room {
            if let Err(e) = room.leave(id).await {
                warn!("{} could not leave {} after a failed accept: {}", id, room.id(), e);
            }
        }
        if let Err(e) = self.remove_player(id).await {
            warn!("{} left registered after a failed accept: {}", id, e);
        }
    }

    /// Turn a new connection into a live session in the start room.
    ///
    /// A storage failure is not fatal: the player gets a record that lives
    /// only as long as the session.
    pub async fn accept(&self, conn: Connection) -> Result<PlayerHandle, MudError> {
        let name = random_name();
        let starting_money = self.inner.config.world.starting_money;
        let record = match create_or_load_player(self.store(), &name, starting_money) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "player store unavailable for {}: {}; using a transient record",
                    name, e
                );
                PlayerRecord::new(&name, starting_money)
            }
        };
        let room = self.start_room().await?;

        let limits = &self.inner.config.limits;
        let id = self.inner.ids.player();
        let Connection { lines, outbox } = conn;
        let (player, inbox) = PlayerHandle::new(
            id,
            &name,
            limits.inventory_slots,
            limits.stimulus_inbox,
            outbox,
        );

        self.inner
            .registry
            .ask(|reply| RegistryCommand::AddPlayer {
                player: player.clone(),
                reply,
            })
            .await?;
        if let Err(e) = room.enter(player.clone()).await {
            self.abandon(None, id).await;
            return Err(e);
        }
        let view = match room.describe(id).await {
            Ok(view) => view,
            Err(e) => {
                self.abandon(Some(&room), id).await;
                return Err(e);
            }
        };

        player.write(format!("Welcome, {}!\n", name));
        player.write(view + "\n");
        player.write("> ");
        metrics::inc_sessions_opened();
        info!("{} connected as {} in {}", name, id, room.id());

        let session = Session {
            player: player.clone(),
            room,
            record,
        };
        spawn_session(self.clone(), session, lines, inbox);
        Ok(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::player::Outbox;
    use crate::mud::storage::SledPlayerStore;
    use tempfile::TempDir;

    fn world(dir: &TempDir) -> World {
        let store = SledPlayerStore::open(dir.path()).expect("store");
        World::new(Config::default(), Arc::new(store))
    }

    #[test]
    fn test_random_name_shape() {
        for _ in 0..20 {
            let name = random_name();
            assert!(NAME_COLORS.iter().any(|c| name.starts_with(c)));
            assert!(NAME_ANIMALS.iter().any(|a| name.ends_with(a)));
        }
    }

    #[tokio::test]
    async fn test_build_default_places_ball_in_first_room() {
        let dir = TempDir::new().expect("tempdir");
        let world = world(&dir);
        let start = world.build_default().await.unwrap();
        assert_eq!(start.id(), RoomId(1));
        let snap = start.snapshot().await.unwrap();
        assert_eq!(snap.text, "You are in a bedroom.");
        assert_eq!(snap.objects.len(), 1);
        assert_eq!(snap.objects[0].handles, vec!["ball".to_string()]);
        assert_eq!(world.start_room().await.unwrap().id(), start.id());
    }

    #[tokio::test]
    async fn test_start_room_missing_before_build() {
        let dir = TempDir::new().expect("tempdir");
        let world = world(&dir);
        assert!(matches!(
            world.start_room().await,
            Err(MudError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_unknown_room() {
        let dir = TempDir::new().expect("tempdir");
        let world = world(&dir);
        let start = world.build_default().await.unwrap();
        let err = world
            .connect(start.id(), Direction::North, RoomId(999), true)
            .await
            .unwrap_err();
        assert!(matches!(err, MudError::RoomNotFound(RoomId(999))));
        assert_eq!(world.room_ids().await.unwrap(), vec![start.id()]);
    }

    #[tokio::test]
    async fn test_abandon_undoes_a_half_finished_accept() {
        let dir = TempDir::new().expect("tempdir");
        let world = world(&dir);
        let start = world.build_default().await.unwrap();
        let (outbox, _output) = Outbox::detached();
        let (player, _inbox) = PlayerHandle::new(PlayerId(7), "RedFox", 10, 5, outbox);
        world
            .inner
            .registry
            .ask(|reply| RegistryCommand::AddPlayer {
                player: player.clone(),
                reply,
            })
            .await
            .unwrap();
        start.enter(player.clone()).await.unwrap();

        world.abandon(Some(&start), player.id).await;
        assert!(!start.snapshot().await.unwrap().occupants.contains(&player.id));
        assert!(world.players().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_without_start_room_registers_nobody() {
        let dir = TempDir::new().expect("tempdir");
        let world = world(&dir);
        let (conn, _client) = Connection::channel(4, 8);
        assert!(world.accept(conn).await.is_err());
        assert!(world.players().await.unwrap().is_empty());
    }
}
