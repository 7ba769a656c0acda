//! Rooms: membership, topology and the two tasks every room runs.
//!
//! A room's state is owned by a single task (the *owner*). Membership changes,
//! exits, text edits and the take/drop interaction queue are all requests on
//! the owner's bounded mailbox, answered over oneshot channels. A second task
//! (the *fan-out*) drains the room's bounded event queue and hands each
//! stimulus to the occupants that perceive it. The owner publishes the
//! occupant roster to the fan-out through a watch channel, so the fan-out never
//! has to ask the owner for anything.
//!
//! Rooms never wait on each other: operations that span two rooms, such as a
//! two-way [`RoomHandle::connect`], are orchestrated from the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, trace, warn};
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::{Config, DeliveryConfig, DeliveryMode};
use crate::metrics;

use super::commands::{CommandTable, RewriteMode};
use super::errors::MudError;
use super::interaction::{self, Action, Interaction};
use super::object::{resolve_target, Item, PhysicalObject};
use super::player::PlayerHandle;
use super::stimulus::{PerceptionTable, Stimulus};
use super::types::{Direction, ExitRecord, ObjectId, PlayerId, RoomId};

/// Separator between the sections of a room description.
pub const DIVIDER: &str = "\n-----------------------------------------------------------\n";

/// Authoritative state of one room. Only the room's owner task holds one.
#[derive(Debug)]
pub struct RoomState {
    id: RoomId,
    text: String,
    occupants: Vec<PlayerHandle>,
    objects: Vec<Item>,
    exits: BTreeMap<Direction, ExitRecord>,
}

impl RoomState {
    pub fn new(id: RoomId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            occupants: Vec::new(),
            objects: Vec::new(),
            exits: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rewrite(&mut self, mode: RewriteMode, line: &str) {
        self.text = match mode {
            RewriteMode::All => line.to_string(),
            RewriteMode::Append => format!("{}\n{}", self.text, line),
            RewriteMode::Prepend => format!("{}\n{}", line, self.text),
        };
    }

    /// Returns false if the player was already present.
    pub fn add_occupant(&mut self, player: PlayerHandle) -> bool {
        if self.has_occupant(player.id) {
            return false;
        }
        self.occupants.push(player);
        true
    }

    pub fn remove_occupant(&mut self, id: PlayerId) -> Option<PlayerHandle> {
        let idx = self.occupants.iter().position(|p| p.id == id)?;
        Some(self.occupants.remove(idx))
    }

    pub fn has_occupant(&self, id: PlayerId) -> bool {
        self.occupants.iter().any(|p| p.id == id)
    }

    pub fn occupants(&self) -> &[PlayerHandle] {
        &self.occupants
    }

    /// Insert an exit. An existing exit in that direction is left untouched.
    pub fn add_exit(&mut self, direction: Direction, exit: ExitRecord) -> Result<(), MudError> {
        if self.exits.contains_key(&direction) {
            return Err(MudError::ExitConflict(direction));
        }
        self.exits.insert(direction, exit);
        Ok(())
    }

    pub fn remove_exit(&mut self, direction: Direction) -> Option<ExitRecord> {
        self.exits.remove(&direction)
    }

    pub fn resolve_exit(&self, direction: Direction) -> Result<ExitRecord, MudError> {
        self.exits
            .get(&direction)
            .copied()
            .ok_or_else(|| MudError::NoSuchExit(direction.to_string()))
    }

    pub fn exits(&self) -> &BTreeMap<Direction, ExitRecord> {
        &self.exits
    }

    pub fn add_object(&mut self, item: Item) {
        self.objects.push(item);
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Item> {
        let idx = self.objects.iter().position(|item| item.id == id)?;
        Some(self.objects.remove(idx))
    }

    pub fn holds_object(&self, id: ObjectId) -> bool {
        self.objects.iter().any(|item| item.id == id)
    }

    pub fn objects(&self) -> &[Item] {
        &self.objects
    }

    /// Everything a command may name here: items in insertion order, then occupants.
    pub fn physical_objects(&self) -> Vec<PhysicalObject> {
        self.objects
            .iter()
            .cloned()
            .map(PhysicalObject::Item)
            .chain(self.occupants.iter().map(PlayerHandle::person))
            .collect()
    }

    /// Room text, visible objects, then everyone present except `viewer`.
    pub fn describe(&self, viewer: PlayerId) -> String {
        let mut out = String::with_capacity(self.text.len() + 128);
        out.push_str(&self.text);
        out.push_str(DIVIDER);
        out.push_str("Sitting here is/are:\n");
        for item in self.objects.iter().filter(|item| item.visible) {
            out.push_str(&item.description);
            out.push('\n');
        }
        out.push_str(DIVIDER);
        out.push_str("Other people present:\n");
        for player in self.occupants.iter().filter(|p| p.id != viewer) {
            out.push_str(&player.name);
            out.push('\n');
        }
        out
    }

    /// Description of a named thing in the room or carried by `viewer`.
    pub fn examine(&self, viewer: &PlayerHandle, target: &str) -> Option<String> {
        let here = self.physical_objects();
        if let Some(found) = resolve_target(&here, target) {
            return Some(found.description());
        }
        let carried: Vec<PhysicalObject> = viewer
            .inventory_snapshot()
            .into_iter()
            .map(PhysicalObject::Item)
            .collect();
        resolve_target(&carried, target).map(PhysicalObject::description)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id,
            text: self.text.clone(),
            occupants: self.occupants.iter().map(|p| p.id).collect(),
            objects: self.objects.clone(),
            exits: self.exits.iter().map(|(d, e)| (*d, *e)).collect(),
        }
    }
}

/// Committed state of a room at one point in its request sequence.
#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub text: String,
    pub occupants: Vec<PlayerId>,
    pub objects: Vec<Item>,
    pub exits: Vec<(Direction, ExitRecord)>,
}

/// What the fan-out does when an occupant's inbox is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Wait for space. Nothing is dropped; a stalled occupant stalls the room.
    Block,
    /// Wait at most this long, then disconnect the occupant and move on.
    Timeout(Duration),
    /// Drop speech for a full inbox; block for every other stimulus.
    DropChatter,
}

impl DeliveryPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        match config.policy {
            DeliveryMode::Block => DeliveryPolicy::Block,
            DeliveryMode::Timeout => {
                DeliveryPolicy::Timeout(Duration::from_millis(config.timeout_ms))
            }
            DeliveryMode::DropChatter => DeliveryPolicy::DropChatter,
        }
    }
}

/// Everything a room task needs besides its own state.
#[derive(Debug, Clone)]
pub struct RoomOptions {
    pub action_capacity: usize,
    pub event_capacity: usize,
    pub delivery: DeliveryPolicy,
    pub perception: Arc<PerceptionTable>,
    pub commands: Arc<CommandTable>,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), Arc::new(PerceptionTable::standard()))
    }
}

impl RoomOptions {
    pub fn from_config(config: &Config, perception: Arc<PerceptionTable>) -> Self {
        Self {
            action_capacity: config.limits.room_actions,
            event_capacity: config.limits.room_events,
            delivery: DeliveryPolicy::from_config(&config.delivery),
            perception,
            commands: Arc::new(CommandTable::new()),
        }
    }

    /// Room-local verbs, consulted after the process-wide table.
    pub fn with_commands(mut self, commands: CommandTable) -> Self {
        self.commands = Arc::new(commands);
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryPolicy) -> Self {
        self.delivery = delivery;
        self
    }
}

enum RoomRequest {
    Enter {
        player: PlayerHandle,
        reply: oneshot::Sender<bool>,
    },
    Leave {
        player: PlayerId,
        reply: oneshot::Sender<bool>,
    },
    Act {
        action: Action,
        reply: oneshot::Sender<Result<Interaction, MudError>>,
    },
    AddExit {
        direction: Direction,
        exit: ExitRecord,
        reply: oneshot::Sender<Result<(), MudError>>,
    },
    RemoveExit {
        direction: Direction,
        reply: oneshot::Sender<Option<ExitRecord>>,
    },
    ResolveExit {
        direction: Direction,
        reply: oneshot::Sender<Result<ExitRecord, MudError>>,
    },
    Describe {
        viewer: PlayerId,
        reply: oneshot::Sender<String>,
    },
    Examine {
        viewer: PlayerHandle,
        target: String,
        reply: oneshot::Sender<Option<String>>,
    },
    Rewrite {
        mode: RewriteMode,
        text: String,
        reply: oneshot::Sender<()>,
    },
    AddObject {
        item: Item,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// Cloneable address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: RoomId,
    actions: mpsc::Sender<RoomRequest>,
    events: mpsc::Sender<Stimulus>,
    commands: Arc<CommandTable>,
}

impl std::fmt::Debug for RoomRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            RoomRequest::Enter { .. } => "Enter",
            RoomRequest::Leave { .. } => "Leave",
            RoomRequest::Act { .. } => "Act",
            RoomRequest::AddExit { .. } => "AddExit",
            RoomRequest::RemoveExit { .. } => "RemoveExit",
            RoomRequest::ResolveExit { .. } => "ResolveExit",
            RoomRequest::Describe { .. } => "Describe",
            RoomRequest::Examine { .. } => "Examine",
            RoomRequest::Rewrite { .. } => "Rewrite",
            RoomRequest::AddObject { .. } => "AddObject",
            RoomRequest::Snapshot { .. } => "Snapshot",
        };
        f.write_str(tag)
    }
}

/// Start the owner and fan-out tasks for a new room and return its handle.
///
/// Both tasks stop once every handle to the room has been dropped.
pub fn spawn_room(id: RoomId, text: impl Into<String>, options: RoomOptions) -> RoomHandle {
    let (actions_tx, actions_rx) = mpsc::channel(options.action_capacity);
    let (events_tx, events_rx) = mpsc::channel(options.event_capacity);
    let (roster_tx, roster_rx) = watch::channel(Arc::new(Vec::new()));

    let state = RoomState::new(id, text);
    tokio::spawn(run_owner(state, actions_rx, events_tx.clone(), roster_tx));
    tokio::spawn(run_fanout(
        id,
        events_rx,
        roster_rx,
        options.perception.clone(),
        options.delivery,
    ));

    RoomHandle {
        id,
        actions: actions_tx,
        events: events_tx,
        commands: options.commands,
    }
}

impl RoomHandle {
    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn local_commands(&self) -> &CommandTable {
        &self.commands
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomRequest,
    ) -> Result<T, MudError> {
        let (tx, rx) = oneshot::channel();
        self.actions
            .send(make(tx))
            .await
            .map_err(|_| MudError::MailboxClosed("room"))?;
        rx.await.map_err(|_| MudError::MailboxClosed("room"))
    }

    /// Add `player` to the occupants and announce the arrival. False if already present.
    pub async fn enter(&self, player: PlayerHandle) -> Result<bool, MudError> {
        self.request(|reply| RoomRequest::Enter { player, reply }).await
    }

    /// Announce the departure, then remove the occupant. False if absent.
    pub async fn leave(&self, player: PlayerId) -> Result<bool, MudError> {
        self.request(|reply| RoomRequest::Leave { player, reply }).await
    }

    /// Queue a take or drop and wait for this room to resolve it.
    pub async fn act(&self, action: Action) -> Result<Interaction, MudError> {
        self.request(|reply| RoomRequest::Act { action, reply }).await?
    }

    pub async fn take(&self, actor: &PlayerHandle, target: &str) -> Result<Interaction, MudError> {
        self.act(Action::Take {
            actor: actor.clone(),
            target: target.to_string(),
        })
        .await
    }

    pub async fn drop_item(
        &self,
        actor: &PlayerHandle,
        target: &str,
    ) -> Result<Interaction, MudError> {
        self.act(Action::Drop {
            actor: actor.clone(),
            target: target.to_string(),
        })
        .await
    }

    pub async fn add_exit(&self, direction: Direction, exit: ExitRecord) -> Result<(), MudError> {
        self.request(|reply| RoomRequest::AddExit {
            direction,
            exit,
            reply,
        })
        .await?
    }

    pub async fn remove_exit(&self, direction: Direction) -> Result<Option<ExitRecord>, MudError> {
        self.request(|reply| RoomRequest::RemoveExit { direction, reply }).await
    }

    pub async fn resolve_exit(&self, direction: Direction) -> Result<ExitRecord, MudError> {
        self.request(|reply| RoomRequest::ResolveExit { direction, reply }).await?
    }

    /// Add an exit from this room to `other`; with `two_way`, also the reverse exit.
    ///
    /// Fails with [`MudError::ExitConflict`] if either direction is taken, in
    /// which case neither room is changed.
    pub async fn connect(
        &self,
        direction: Direction,
        other: &RoomHandle,
        two_way: bool,
    ) -> Result<(), MudError> {
        self.add_exit(direction, ExitRecord::new(other.id, two_way)).await?;
        if two_way {
            let back = ExitRecord::new(self.id, true);
            if let Err(e) = other.add_exit(direction.opposite(), back).await {
                self.remove_exit(direction).await?;
                return Err(e);
            }
        }
        debug!(
            "connected {} {} to {} (two_way={})",
            self.id, direction, other.id, two_way
        );
        Ok(())
    }

    pub async fn describe(&self, viewer: PlayerId) -> Result<String, MudError> {
        self.request(|reply| RoomRequest::Describe { viewer, reply }).await
    }

    pub async fn examine(
        &self,
        viewer: &PlayerHandle,
        target: &str,
    ) -> Result<Option<String>, MudError> {
        let viewer = viewer.clone();
        let target = target.to_string();
        self.request(|reply| RoomRequest::Examine {
            viewer,
            target,
            reply,
        })
        .await
    }

    pub async fn rewrite(&self, mode: RewriteMode, text: &str) -> Result<(), MudError> {
        let text = text.to_string();
        self.request(|reply| RoomRequest::Rewrite { mode, text, reply }).await
    }

    pub async fn add_object(&self, item: Item) -> Result<(), MudError> {
        self.request(|reply| RoomRequest::AddObject { item, reply }).await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, MudError> {
        self.request(|reply| RoomRequest::Snapshot { reply }).await
    }

    /// Put a stimulus on the room's event queue, waiting while it is full.
    pub async fn emit(&self, stimulus: Stimulus) -> Result<(), MudError> {
        self.events
            .send(stimulus)
            .await
            .map_err(|_| MudError::MailboxClosed("room events"))
    }
}

async fn emit(room: RoomId, events: &mpsc::Sender<Stimulus>, stimulus: Stimulus) {
    if events.send(stimulus).await.is_err() {
        warn!("room {} event queue closed; stimulus discarded", room);
    }
}

fn publish(roster: &watch::Sender<Arc<Vec<PlayerHandle>>>, state: &RoomState) {
    roster.send_replace(Arc::new(state.occupants().to_vec()));
}

async fn run_owner(
    mut state: RoomState,
    mut requests: mpsc::Receiver<RoomRequest>,
    events: mpsc::Sender<Stimulus>,
    roster: watch::Sender<Arc<Vec<PlayerHandle>>>,
) {
    let id = state.id();
    while let Some(request) = requests.recv().await {
        trace!("room {} request {:?}", id, request);
        match request {
            RoomRequest::Enter { player, reply } => {
                let actor = player.actor();
                let added = state.add_occupant(player);
                if added {
                    publish(&roster, &state);
                    emit(id, &events, Stimulus::PlayerEntered { actor }).await;
                }
                let _ = reply.send(added);
            }
            RoomRequest::Leave { player, reply } => {
                let present = state
                    .occupants()
                    .iter()
                    .find(|p| p.id == player)
                    .map(PlayerHandle::actor);
                let was_present = present.is_some();
                if let Some(actor) = present {
                    emit(id, &events, Stimulus::PlayerLeft { actor }).await;
                    state.remove_occupant(player);
                    publish(&roster, &state);
                }
                let _ = reply.send(was_present);
            }
            RoomRequest::Act { action, reply } => {
                let result = interaction::resolve(&action, &mut state);
                match &result {
                    Ok(outcome) => match outcome.stimulus(action.actor()) {
                        Some(stimulus) => {
                            if matches!(stimulus, Stimulus::Took { .. }) {
                                metrics::inc_takes();
                            } else {
                                metrics::inc_drops();
                            }
                            emit(id, &events, stimulus).await;
                        }
                        None => metrics::inc_interactions_rejected(),
                    },
                    Err(e) => {
                        error!("room {}: {} aborted: {}", id, action, e);
                        metrics::inc_invariant_violations();
                    }
                }
                let _ = reply.send(result);
            }
            RoomRequest::AddExit {
                direction,
                exit,
                reply,
            } => {
                let _ = reply.send(state.add_exit(direction, exit));
            }
            RoomRequest::RemoveExit { direction, reply } => {
                let _ = reply.send(state.remove_exit(direction));
            }
            RoomRequest::ResolveExit { direction, reply } => {
                let _ = reply.send(state.resolve_exit(direction));
            }
            RoomRequest::Describe { viewer, reply } => {
                let _ = reply.send(state.describe(viewer));
            }
            RoomRequest::Examine {
                viewer,
                target,
                reply,
            } => {
                let _ = reply.send(state.examine(&viewer, &target));
            }
            RoomRequest::Rewrite { mode, text, reply } => {
                state.rewrite(mode, &text);
                let _ = reply.send(());
            }
            RoomRequest::AddObject { item, reply } => {
                state.add_object(item);
                let _ = reply.send(());
            }
            RoomRequest::Snapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
        }
    }
    debug!("room {} owner stopped", id);
}

async fn run_fanout(
    id: RoomId,
    mut events: mpsc::Receiver<Stimulus>,
    roster: watch::Receiver<Arc<Vec<PlayerHandle>>>,
    perception: Arc<PerceptionTable>,
    policy: DeliveryPolicy,
) {
    while let Some(stimulus) = events.recv().await {
        let occupants = roster.borrow().clone();
        for occupant in occupants.iter() {
            match perception.perceives(occupant.id, &stimulus) {
                Ok(true) => deliver(id, occupant, &stimulus, policy).await,
                Ok(false) => {}
                Err(e) => {
                    error!("room {}: fan-out of {} aborted: {}", id, stimulus.kind(), e);
                    metrics::inc_invariant_violations();
                    break;
                }
            }
        }
    }
    debug!("room {} fan-out stopped", id);
}

async fn deliver(
    room: RoomId,
    occupant: &PlayerHandle,
    stimulus: &Stimulus,
    policy: DeliveryPolicy,
) {
    let result = match policy {
        DeliveryPolicy::Block => occupant.deliver(stimulus.clone()).await,
        DeliveryPolicy::Timeout(limit) => {
            match tokio::time::timeout(limit, occupant.deliver(stimulus.clone())).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(
                        "room {}: {} did not drain its inbox within {:?}; disconnecting",
                        room, occupant.name, limit
                    );
                    metrics::inc_stimuli_dropped();
                    occupant.request_quit();
                    return;
                }
            }
        }
        DeliveryPolicy::DropChatter if matches!(stimulus, Stimulus::Said { .. }) => {
            match occupant.try_deliver(stimulus.clone()) {
                Ok(true) => Ok(()),
                Ok(false) => {
                    debug!("room {}: inbox of {} full; dropped say", room, occupant.name);
                    metrics::inc_stimuli_dropped();
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        DeliveryPolicy::DropChatter => occupant.deliver(stimulus.clone()).await,
    };
    if let Err(e) = result {
        debug!(
            "room {}: {} for {} not delivered: {}",
            room,
            stimulus.kind(),
            occupant.name,
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mud::player::Outbox;

    fn player(id: u64, name: &str) -> PlayerHandle {
        let (outbox, _rx) = Outbox::detached();
        PlayerHandle::new(PlayerId(id), name, 10, 5, outbox).0
    }

    #[test]
    fn test_add_occupant_is_idempotent() {
        let mut room = RoomState::new(RoomId(1), "A bedroom.");
        let fox = player(2, "RedFox");
        assert!(room.add_occupant(fox.clone()));
        assert!(!room.add_occupant(fox));
        assert_eq!(room.occupants().len(), 1);
        assert!(room.remove_occupant(PlayerId(2)).is_some());
        assert!(room.remove_occupant(PlayerId(2)).is_none());
    }

    #[test]
    fn test_add_exit_never_overwrites() {
        let mut room = RoomState::new(RoomId(1), "A bedroom.");
        room.add_exit(Direction::East, ExitRecord::new(RoomId(2), true))
            .unwrap();
        let err = room
            .add_exit(Direction::East, ExitRecord::new(RoomId(3), false))
            .unwrap_err();
        assert!(matches!(err, MudError::ExitConflict(Direction::East)));
        assert_eq!(
            room.resolve_exit(Direction::East).unwrap(),
            ExitRecord::new(RoomId(2), true)
        );
        assert!(matches!(
            room.resolve_exit(Direction::West),
            Err(MudError::NoSuchExit(_))
        ));
    }

    #[test]
    fn test_describe_sections_exclude_viewer() {
        let mut room = RoomState::new(RoomId(1), "You are in a bedroom.");
        room.add_object(Item::ball(ObjectId(9)));
        room.add_object(Item::new(ObjectId(10), "key", "A key.", &[]).hidden());
        room.add_occupant(player(2, "RedFox"));
        room.add_occupant(player(3, "BluePony"));

        let text = room.describe(PlayerId(2));
        let expected = format!(
            "You are in a bedroom.{d}Sitting here is/are:\nA red ball.\n{d}Other people present:\nBluePony\n",
            d = DIVIDER
        );
        assert_eq!(text, expected);
        assert_eq!(text, room.describe(PlayerId(2)));
    }

    #[test]
    fn test_rewrite_modes() {
        let mut room = RoomState::new(RoomId(1), "middle");
        room.rewrite(RewriteMode::Append, "end");
        room.rewrite(RewriteMode::Prepend, "start");
        assert_eq!(room.text(), "start\nmiddle\nend");
        room.rewrite(RewriteMode::All, "fresh");
        assert_eq!(room.text(), "fresh");
    }

    #[test]
    fn test_examine_covers_people_and_carried_items() {
        let mut room = RoomState::new(RoomId(1), "A bedroom.");
        let fox = player(2, "RedFox");
        room.add_occupant(fox.clone());
        room.add_occupant(player(3, "BluePony"));
        assert_eq!(
            room.examine(&fox, "bluepony").as_deref(),
            Some("A person: BluePony")
        );
        assert!(room.examine(&fox, "lamp").is_none());
    }

    #[tokio::test]
    async fn test_handle_connect_two_way_and_rollback() {
        let a = spawn_room(RoomId(1), "A", RoomOptions::default());
        let b = spawn_room(RoomId(2), "B", RoomOptions::default());
        let c = spawn_room(RoomId(3), "C", RoomOptions::default());

        a.connect(Direction::East, &b, true).await.unwrap();
        assert_eq!(
            b.resolve_exit(Direction::West).await.unwrap().other_room,
            RoomId(1)
        );

        // b already has a west exit, so c's new east exit is rolled back
        let err = c.connect(Direction::East, &b, true).await.unwrap_err();
        assert!(matches!(err, MudError::ExitConflict(Direction::West)));
        assert!(c.resolve_exit(Direction::East).await.is_err());
        assert_eq!(
            b.resolve_exit(Direction::West).await.unwrap().other_room,
            RoomId(1)
        );
    }

    #[test]
    fn test_delivery_policy_from_config() {
        let mut cfg = DeliveryConfig::default();
        assert_eq!(DeliveryPolicy::from_config(&cfg), DeliveryPolicy::Block);
        cfg.policy = DeliveryMode::Timeout;
        cfg.timeout_ms = 250;
        assert_eq!(
            DeliveryPolicy::from_config(&cfg),
            DeliveryPolicy::Timeout(Duration::from_millis(250))
        );
    }
}
