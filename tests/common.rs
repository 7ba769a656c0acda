//! Test utilities & fixtures.
//! Throwaway worlds backed by a temp-dir player store, in-memory clients and
//! detached players for driving rooms directly.
#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;
use std::time::Duration;

use mudcore::config::Config;
use mudcore::mud::player::Outbox;
use mudcore::mud::{ClientEnd, Connection, PlayerHandle, PlayerId, SledPlayerStore, Stimulus, World};
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// A world plus the temp dir holding its store; the dir lives as long as this.
pub struct TestWorld {
    pub world: World,
    pub dir: TempDir,
}

pub async fn test_world_with(config: Config) -> TestWorld {
    let dir = TempDir::new().expect("tempdir");
    let store = SledPlayerStore::open(dir.path()).expect("store");
    let world = World::new(config, Arc::new(store));
    world.build_default().await.expect("default world");
    TestWorld { world, dir }
}

pub async fn test_world() -> TestWorld {
    test_world_with(Config::default()).await
}

/// Accept a new in-memory client and consume its greeting.
pub async fn connect(world: &World) -> (PlayerHandle, ClientEnd) {
    let (conn, mut client) = Connection::channel(4, world.config().limits.outbox);
    let player = world.accept(conn).await.expect("accept");
    expect_text(&mut client, "> ").await;
    (player, client)
}

/// Read until `needle` shows up; panics on close or timeout.
pub async fn expect_text(client: &mut ClientEnd, needle: &str) -> String {
    match tokio::time::timeout(WAIT, client.read_until(needle)).await {
        Ok(Some(text)) => text,
        Ok(None) => panic!("connection closed before {:?}", needle),
        Err(_) => panic!("timed out waiting for {:?}", needle),
    }
}

/// Send a line and read until `needle`.
pub async fn command(client: &mut ClientEnd, line: &str, needle: &str) -> String {
    client.send_line(line).await.expect("send line");
    expect_text(client, needle).await
}

/// Wait for the client's connection to be closed by the server.
pub async fn expect_closed(client: &mut ClientEnd) {
    let closed = tokio::time::timeout(WAIT, async {
        while client.recv_text().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "connection was not closed");
}

/// A player not attached to any connection, for driving rooms directly.
pub fn detached_player(
    id: u64,
    name: &str,
    slots: usize,
    inbox: usize,
) -> (PlayerHandle, mpsc::Receiver<Stimulus>) {
    let (outbox, _output) = Outbox::detached();
    PlayerHandle::new(PlayerId(id), name, slots, inbox, outbox)
}

/// Keep an inbox empty so the room's fan-out never stalls on it.
pub fn drain(mut inbox: mpsc::Receiver<Stimulus>) {
    tokio::spawn(async move { while inbox.recv().await.is_some() {} });
}

pub async fn next_stimulus(inbox: &mut mpsc::Receiver<Stimulus>) -> Stimulus {
    tokio::time::timeout(WAIT, inbox.recv())
        .await
        .expect("timed out waiting for stimulus")
        .expect("inbox closed")
}

/// Poll `check` until it holds or the wait bound passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
