//! Player sessions.
//!
//! A session runs three tasks:
//!
//! - **intake** reads lines from the [`Connection`] and submits them to the
//!   bounded command queue, watching the quit signal. It owns teardown.
//! - **exec** takes one command at a time, performs its effects, writes the
//!   prompt and reports "ready for next" back to intake.
//! - **delivery** drains the stimulus inbox and writes each stimulus, worded
//!   for this player, to the connection.
//!
//! Teardown waits until exec has finished its last command, so leaving the
//! room never overlaps a command in flight.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::logutil::escape_log;
use crate::metrics;

use super::commands::{dispatch, tokenize, CommandContext, Effect};
use super::errors::MudError;
use super::interaction::Action;
use super::inventory::Inventory;
use super::object::{Item, Person, PhysicalObject};
use super::room::{RoomHandle, DIVIDER};
use super::stimulus::{Actor, Stimulus};
use super::storage::PlayerRecord;
use super::types::{Direction, PlayerId};
use super::world::World;

/// Text headed for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Text(String),
    Close,
}

/// Outboxes not attached to a real connection get this many slots.
pub const DETACHED_OUTBOX_CAPACITY: usize = 64;

/// Sending half of a connection, bounded by `limits.outbox`.
///
/// [`write`](Outbox::write) never waits: when the client has stopped reading
/// and the outbox is full, the text is dropped. Stimulus delivery uses
/// [`send`](Outbox::send) instead, so a stalled client backs up into its inbox.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::Sender<String>,
    closed: QuitSignal,
}

/// Receiving half of an [`Outbox`].
#[derive(Debug)]
pub struct OutboxReceiver {
    rx: mpsc::Receiver<String>,
    closed: QuitSignal,
}

impl Outbox {
    pub fn bounded(capacity: usize) -> (Self, OutboxReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let closed = QuitSignal::new();
        (
            Self {
                tx,
                closed: closed.clone(),
            },
            OutboxReceiver { rx, closed },
        )
    }

    /// An outbox with [`DETACHED_OUTBOX_CAPACITY`] slots and its receiver.
    pub fn detached() -> (Self, OutboxReceiver) {
        Self::bounded(DETACHED_OUTBOX_CAPACITY)
    }

    pub fn write(&self, text: impl Into<String>) {
        match self.tx.try_send(text.into()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(text)) => {
                metrics::inc_writes_dropped();
                debug!("outbox full; dropped {} bytes", text.len());
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    /// Queue text, waiting while the outbox is full.
    pub async fn send(&self, text: String) -> Result<(), MudError> {
        self.tx.send(text).await.map_err(|_| MudError::Disconnected)
    }

    /// Ask the connection to shut down once everything already queued is written.
    pub fn close(&self) {
        self.closed.fire();
    }
}

impl OutboxReceiver {
    /// Next item for the connection. Queued text always comes before `Close`.
    pub async fn recv(&mut self) -> Outgoing {
        tokio::select! {
            biased;
            text = self.rx.recv() => match text {
                Some(text) => Outgoing::Text(text),
                None => Outgoing::Close,
            },
            _ = self.closed.fired() => Outgoing::Close,
        }
    }
}

/// Duplex text channel for one session, as seen by the world core.
///
/// A closed `lines` channel means the client disconnected.
#[derive(Debug)]
pub struct Connection {
    pub lines: mpsc::Receiver<String>,
    pub outbox: Outbox,
}

/// The far side of a [`Connection`], driven by the network adapter or a test.
#[derive(Debug)]
pub struct ClientEnd {
    pub lines: mpsc::Sender<String>,
    pub output: OutboxReceiver,
}

impl Connection {
    pub fn channel(line_buffer: usize, outbox_capacity: usize) -> (Connection, ClientEnd) {
        let (line_tx, line_rx) = mpsc::channel(line_buffer.max(1));
        let (outbox, output) = Outbox::bounded(outbox_capacity);
        (
            Connection {
                lines: line_rx,
                outbox,
            },
            ClientEnd {
                lines: line_tx,
                output,
            },
        )
    }
}

impl ClientEnd {
    pub async fn send_line(&self, line: &str) -> Result<(), MudError> {
        self.lines
            .send(line.to_string())
            .await
            .map_err(|_| MudError::Disconnected)
    }

    /// Next piece of text, or `None` once the connection was closed.
    pub async fn recv_text(&mut self) -> Option<String> {
        match self.output.recv().await {
            Outgoing::Text(text) => Some(text),
            Outgoing::Close => None,
        }
    }

    /// Collect text until it contains `needle`. `None` if the connection
    /// closes first.
    pub async fn read_until(&mut self, needle: &str) -> Option<String> {
        let mut seen = String::new();
        while !seen.contains(needle) {
            seen.push_str(&self.recv_text().await?);
        }
        Some(seen)
    }
}

/// Single-shot quit flag shared by a session's tasks.
#[derive(Debug, Clone)]
pub struct QuitSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for QuitSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl QuitSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn fire(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once the signal has fired; immediately if it already has.
    pub async fn fired(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|set| *set).await;
    }
}

/// Producer side of a session's bounded command queue.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: mpsc::Sender<String>,
}

impl CommandSender {
    /// Queue a raw line, waiting while the queue is full.
    pub async fn submit(&self, line: String) -> Result<(), MudError> {
        self.tx
            .send(line)
            .await
            .map_err(|_| MudError::MailboxClosed("command queue"))
    }
}

pub fn command_queue(capacity: usize) -> (CommandSender, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(capacity);
    (CommandSender { tx }, rx)
}

/// Cloneable reference to a live player, held by rooms and the registry.
///
/// The inventory behind it is mutated only by the interaction processor of
/// the room the player occupies.
#[derive(Clone)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub name: String,
    inbox: mpsc::Sender<Stimulus>,
    outbox: Outbox,
    inventory: Arc<Mutex<Inventory>>,
    quit: QuitSignal,
}

impl fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

impl PlayerHandle {
    /// Build a handle and the receiving end of its stimulus inbox.
    pub fn new(
        id: PlayerId,
        name: &str,
        inventory_slots: usize,
        inbox_capacity: usize,
        outbox: Outbox,
    ) -> (Self, mpsc::Receiver<Stimulus>) {
        let (inbox, inbox_rx) = mpsc::channel(inbox_capacity);
        let handle = Self {
            id,
            name: name.to_string(),
            inbox,
            outbox,
            inventory: Arc::new(Mutex::new(Inventory::with_capacity(inventory_slots))),
            quit: QuitSignal::new(),
        };
        (handle, inbox_rx)
    }

    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.name.clone())
    }

    /// This player as a thing others can see and name.
    pub fn person(&self) -> PhysicalObject {
        PhysicalObject::Person(Person {
            id: self.id,
            name: self.name.clone(),
        })
    }

    pub fn write(&self, text: impl Into<String>) {
        self.outbox.write(text);
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn quit_signal(&self) -> &QuitSignal {
        &self.quit
    }

    pub fn request_quit(&self) {
        self.quit.fire();
    }

    pub fn inventory_snapshot(&self) -> Vec<Item> {
        self.lock_inventory().items().to_vec()
    }

    pub(crate) fn lock_inventory(&self) -> MutexGuard<'_, Inventory> {
        self.inventory.lock().expect("inventory mutex poisoned")
    }

    /// Put a stimulus in the inbox, waiting while it is full.
    pub async fn deliver(&self, stimulus: Stimulus) -> Result<(), MudError> {
        self.inbox
            .send(stimulus)
            .await
            .map_err(|_| MudError::MailboxClosed("stimulus inbox"))
    }

    /// Offer a stimulus without waiting. `Ok(false)` if the inbox is full.
    pub fn try_deliver(&self, stimulus: Stimulus) -> Result<bool, MudError> {
        match self.inbox.try_send(stimulus) {
            Ok(()) => Ok(true),
            Err(mpsc::error::TrySendError::Full(_)) => Ok(false),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(MudError::MailboxClosed("stimulus inbox"))
            }
        }
    }
}

/// State owned by a session's command loop.
#[derive(Debug)]
pub struct Session {
    pub player: PlayerHandle,
    /// Lookup handle for the current room; the room owns the membership.
    pub room: RoomHandle,
    pub record: PlayerRecord,
}

/// Start the intake, exec and delivery tasks for an accepted session.
pub(crate) fn spawn_session(
    world: World,
    session: Session,
    lines: mpsc::Receiver<String>,
    inbox: mpsc::Receiver<Stimulus>,
) {
    let (commands, command_rx) = command_queue(world.config().limits.command_queue);
    let (ready_tx, ready_rx) = mpsc::unbounded_channel();
    let player = session.player.clone();

    tokio::spawn(run_delivery(player.clone(), inbox));
    let exec = tokio::spawn(run_exec(world.clone(), session, command_rx, ready_tx));
    tokio::spawn(run_intake(world, player, lines, commands, ready_rx, exec));
}

async fn run_intake(
    world: World,
    player: PlayerHandle,
    mut lines: mpsc::Receiver<String>,
    commands: CommandSender,
    mut ready: mpsc::UnboundedReceiver<()>,
    exec: JoinHandle<Session>,
) {
    let quit = player.quit_signal().clone();
    let mut in_flight: usize = 0;
    loop {
        tokio::select! {
            biased;
            _ = quit.fired() => break,
            Some(()) = ready.recv() => in_flight = in_flight.saturating_sub(1),
            line = lines.recv() => match line {
                Some(line) => {
                    tokio::select! {
                        biased;
                        _ = quit.fired() => break,
                        sent = commands.submit(line) => {
                            if sent.is_err() {
                                break;
                            }
                            in_flight += 1;
                        }
                    }
                }
                None => {
                    info!("{} disconnected", player.name);
                    quit.fire();
                    break;
                }
            },
        }
    }

    debug!(
        "{} leaving with {} command(s) queued or running",
        player.name, in_flight
    );
    drop(commands);
    while ready.recv().await.is_some() {}
    teardown(&world, &player, exec).await;
}

async fn teardown(world: &World, player: &PlayerHandle, exec: JoinHandle<Session>) {
    match exec.await {
        Ok(mut session) => {
            if let Err(e) = session.room.leave(player.id).await {
                warn!("{} could not leave {}: {}", player.name, session.room.id(), e);
            }
            session.record.touch();
            if let Err(e) = world.store().save(&mut session.record) {
                warn!("failed to save player {}: {}", player.name, e);
            }
        }
        Err(e) => error!("command loop for {} failed: {}", player.name, e),
    }
    if let Err(e) = world.remove_player(player.id).await {
        warn!("failed to unregister {}: {}", player.name, e);
    }
    player.write("Goodbye!");
    player.outbox().close();
    metrics::inc_sessions_closed();
    info!("session {} ({}) closed", player.id, player.name);
}

async fn run_exec(
    world: World,
    mut session: Session,
    mut commands: mpsc::Receiver<String>,
    ready: mpsc::UnboundedSender<()>,
) -> Session {
    while let Some(line) = commands.recv().await {
        if session.player.quit_signal().is_set() {
            break;
        }
        let tokens = tokenize(&line);
        if !tokens.is_empty() {
            debug!("{}> {}", session.player.name, escape_log(&line));
            let ctx = CommandContext {
                player: session.player.id,
                name: session.player.name.clone(),
                room: session.room.id(),
            };
            let effects = dispatch(
                world.commands(),
                session.room.local_commands(),
                &ctx,
                &tokens,
            );
            for effect in effects {
                if let Err(e) = perform(&world, &mut session, effect).await {
                    warn!("{}: command '{}' failed: {}", session.player.name, tokens[0], e);
                }
            }
        }
        if !session.player.quit_signal().is_set() {
            session.player.write("> ");
        }
        let _ = ready.send(());
    }
    session
}

async fn run_delivery(player: PlayerHandle, mut inbox: mpsc::Receiver<Stimulus>) {
    let quit = player.quit_signal().clone();
    loop {
        tokio::select! {
            biased;
            _ = quit.fired() => break,
            next = inbox.recv() => match next {
                Some(stimulus) => {
                    trace!("{} receiving {}", player.name, stimulus.kind());
                    let text = stimulus.describe(player.id);
                    // a client that stops reading stalls here, and then its inbox fills
                    tokio::select! {
                        biased;
                        _ = quit.fired() => break,
                        sent = player.outbox().send(text) => {
                            if sent.is_err() {
                                debug!("{} connection gone; delivery stopped", player.name);
                                break;
                            }
                        }
                    }
                    metrics::inc_stimuli_delivered();
                }
                None => break,
            },
        }
    }
}

async fn perform(world: &World, session: &mut Session, effect: Effect) -> Result<(), MudError> {
    let player = session.player.clone();
    match effect {
        Effect::Write(text) => player.write(text),
        Effect::Look(None) => {
            let text = session.room.describe(player.id).await?;
            player.write(text + "\n");
        }
        Effect::Look(Some(target)) => match session.room.examine(&player, &target).await? {
            Some(text) => player.write(text + "\n"),
            None => player.write("You don't see that here.\n"),
        },
        Effect::Who => {
            let others: Vec<PlayerHandle> = world
                .players()
                .await?
                .into_iter()
                .filter(|p| p.id != player.id)
                .collect();
            if others.is_empty() {
                player.write("You are all alone in the world.\n");
            }
            for other in others {
                player.write(format!("[WHO] {}\n", other.name));
            }
        }
        Effect::Say(text) => {
            session
                .room
                .emit(Stimulus::Said {
                    actor: player.actor(),
                    text,
                })
                .await?;
        }
        Effect::Take(target) => {
            let outcome = session
                .room
                .act(Action::Take {
                    actor: player.clone(),
                    target,
                })
                .await?;
            if let Some(text) = outcome.message() {
                player.write(text);
            }
        }
        Effect::Drop(target) => {
            let outcome = session
                .room
                .act(Action::Drop {
                    actor: player.clone(),
                    target,
                })
                .await?;
            if let Some(text) = outcome.message() {
                player.write(text);
            }
        }
        Effect::Go(word) => go(world, session, &word).await?,
        Effect::Inventory => {
            let mut text = String::from(DIVIDER);
            text.push_str("Inventory: \n");
            for item in player.inventory_snapshot() {
                text.push_str(&item.description);
                text.push('\n');
            }
            text.push_str(&format!("You have {} bitbux.\n", session.record.money));
            text.push_str(DIVIDER);
            player.write(text);
        }
        Effect::Quit => player.request_quit(),
        Effect::Pioneer(word) => pioneer(world, session, &word).await?,
        Effect::Rewrite(mode, text) => {
            session.room.rewrite(mode, &text).await?;
            player.write("Room text updated.\n");
        }
    }
    Ok(())
}

async fn go(world: &World, session: &mut Session, word: &str) -> Result<(), MudError> {
    let player = session.player.clone();
    let no_exit = format!("No visible exit {}.\n", word);
    let Ok(direction) = word.parse::<Direction>() else {
        player.write(no_exit);
        return Ok(());
    };
    let exit = match session.room.resolve_exit(direction).await {
        Ok(exit) => exit,
        Err(MudError::NoSuchExit(_)) => {
            player.write(no_exit);
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    let Some(next) = world.room(exit.other_room).await? else {
        warn!(
            "exit {} of {} leads to unknown room {}",
            direction,
            session.room.id(),
            exit.other_room
        );
        player.write(no_exit);
        return Ok(());
    };

    session.room.leave(player.id).await?;
    next.enter(player.clone()).await?;
    debug!("{} moved {} to {}", player.name, direction, next.id());
    session.room = next;
    let text = session.room.describe(player.id).await?;
    player.write(text + "\n");
    Ok(())
}

async fn pioneer(world: &World, session: &mut Session, word: &str) -> Result<(), MudError> {
    let player = session.player.clone();
    let Ok(direction) = word.parse::<Direction>() else {
        player.write(format!("'{}' is not a direction.\n", word));
        return Ok(());
    };
    if session.room.resolve_exit(direction).await.is_ok() {
        player.write("That exit already exists.\n");
        return Ok(());
    }
    let text = world.config().world.pioneer_room_text.clone();
    let room = world.create_room(&text).await?;
    match session.room.connect(direction, &room, true).await {
        Ok(()) => {
            info!(
                "{} pioneered {} {} of {}",
                player.name,
                room.id(),
                direction,
                session.room.id()
            );
            player.write(format!("You pioneer a new room to the {}.\n", direction));
            Ok(())
        }
        Err(MudError::ExitConflict(_)) => {
            player.write("That exit already exists.\n");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test]
    async fn test_quit_signal_is_sticky() {
        let quit = QuitSignal::new();
        assert!(!quit.is_set());
        let clone = quit.clone();
        let waiter = tokio::spawn(async move { clone.fired().await });
        quit.fire();
        waiter.await.unwrap();
        assert!(quit.is_set());
        // already fired: resolves at once
        quit.fired().await;
    }

    #[tokio::test]
    async fn test_submit_blocks_when_queue_full() {
        let (sender, mut rx) = command_queue(2);
        sender.submit("look".into()).await.unwrap();
        sender.submit("who".into()).await.unwrap();

        let mut third = task::spawn(sender.submit("inv".into()));
        assert_pending!(third.poll());

        assert_eq!(rx.recv().await.as_deref(), Some("look"));
        assert!(third.is_woken());
        assert_ready!(third.poll()).unwrap();
    }

    #[tokio::test]
    async fn test_try_deliver_reports_full_inbox() {
        let (outbox, _out) = Outbox::detached();
        let (fox, mut inbox) = PlayerHandle::new(PlayerId(1), "RedFox", 10, 1, outbox);
        let said = Stimulus::Said {
            actor: fox.actor(),
            text: "hi".into(),
        };
        assert!(fox.try_deliver(said.clone()).unwrap());
        assert!(!fox.try_deliver(said.clone()).unwrap());
        inbox.recv().await.unwrap();
        drop(inbox);
        assert!(fox.try_deliver(said).is_err());
    }

    #[tokio::test]
    async fn test_client_end_read_until_and_close() {
        let (conn, mut client) = Connection::channel(1, 4);
        conn.outbox.write("Welcome, ");
        conn.outbox.write("RedFox!\n");
        conn.outbox.close();
        let text = client.read_until("RedFox!").await.unwrap();
        assert_eq!(text, "Welcome, RedFox!\n");
        assert!(client.recv_text().await.is_none());
    }

    #[tokio::test]
    async fn test_full_outbox_drops_writes_but_still_closes() {
        let (outbox, mut output) = Outbox::bounded(2);
        outbox.write("one");
        outbox.write("two");
        outbox.write("three");
        outbox.close();
        assert_eq!(output.recv().await, Outgoing::Text("one".into()));
        assert_eq!(output.recv().await, Outgoing::Text("two".into()));
        assert_eq!(output.recv().await, Outgoing::Close);
    }

    #[tokio::test]
    async fn test_outbox_send_waits_for_space() {
        let (outbox, mut output) = Outbox::bounded(1);
        outbox.send("first".into()).await.unwrap();

        let mut second = task::spawn(outbox.send("second".into()));
        assert_pending!(second.poll());
        assert_eq!(output.recv().await, Outgoing::Text("first".into()));
        assert!(second.is_woken());
        assert_ready!(second.poll()).unwrap();

        drop(output);
        assert!(outbox.send("gone".into()).await.is_err());
    }

    #[test]
    fn test_person_answers_to_lowercase_name() {
        let (outbox, _out) = Outbox::detached();
        let (fox, _inbox) = PlayerHandle::new(PlayerId(1), "RedFox", 10, 5, outbox);
        assert!(fox.person().answers_to("redfox"));
        assert!(!fox.person().carryable());
    }
}
