//! A session from greeting to goodbye, driven through in-memory connections.

mod common;

use common::*;
use mudcore::metrics;
use mudcore::mud::commands::CommandContext;
use mudcore::mud::{CommandTable, Direction, Effect};

#[tokio::test]
async fn greeting_describes_the_start_room() {
    let tw = test_world().await;
    let (conn, mut client) = mudcore::mud::Connection::channel(4, 32);
    let player = tw.world.accept(conn).await.unwrap();
    let greeting = expect_text(&mut client, "> ").await;
    assert!(greeting.starts_with(&format!("Welcome, {}!\n", player.name)));
    assert!(greeting.contains("You are in a bedroom."));
    assert!(greeting.contains("A red ball."));
}

#[tokio::test]
async fn second_arrival_is_seen_by_the_first_only() {
    let tw = test_world().await;
    let (_p, mut p_client) = connect(&tw.world).await;
    command(&mut p_client, "who", "You are all alone in the world.").await;

    let (q, mut q_client) = connect(&tw.world).await;
    expect_text(&mut p_client, &format!("{} has entered the room.", q.name)).await;

    // anything Q had been sent would show up before its own speech
    let seen = command(&mut q_client, "say marker", "You say, \"marker\"").await;
    assert!(!seen.contains("has entered"), "got {:?}", seen);
    expect_text(&mut p_client, "says, \"marker\"").await;
}

#[tokio::test]
async fn who_lists_the_others() {
    let tw = test_world().await;
    let (_p, mut p_client) = connect(&tw.world).await;
    let (q, _q_client) = connect(&tw.world).await;
    command(&mut p_client, "who", &format!("[WHO] {}", q.name)).await;
}

#[tokio::test]
async fn quit_says_goodbye_and_closes() {
    let tw = test_world().await;
    let closed_before = metrics::snapshot().sessions_closed;
    let (_stay, mut stay_client) = connect(&tw.world).await;
    let (leaver, mut leaver_client) = connect(&tw.world).await;

    let farewell = command(&mut leaver_client, "quit", "Goodbye!").await;
    assert!(!farewell.contains("> "), "prompt after quit: {:?}", farewell);
    expect_closed(&mut leaver_client).await;
    expect_text(
        &mut stay_client,
        &format!("{} has left the room.", leaver.name),
    )
    .await;

    let world = tw.world.clone();
    let id = leaver.id;
    assert!(
        eventually(|| {
            let world = world.clone();
            async move {
                world
                    .players()
                    .await
                    .map(|ps| ps.iter().all(|p| p.id != id))
                    .unwrap_or(false)
            }
        })
        .await
    );
    let start = tw.world.start_room().await.unwrap();
    assert!(!start.snapshot().await.unwrap().occupants.contains(&id));
    assert!(metrics::snapshot().sessions_closed > closed_before);
}

#[tokio::test]
async fn dropped_connection_tears_the_session_down() {
    let tw = test_world().await;
    let (_stay, mut stay_client) = connect(&tw.world).await;
    let (gone, gone_client) = connect(&tw.world).await;

    drop(gone_client);
    expect_text(&mut stay_client, &format!("{} has left the room.", gone.name)).await;
    assert!(gone.quit_signal().is_set());
}

#[tokio::test]
async fn lines_after_quit_are_never_run() {
    let tw = test_world().await;
    let (_stay, mut stay_client) = connect(&tw.world).await;
    let (leaver, leaver_client) = connect(&tw.world).await;

    leaver_client.send_line("quit").await.unwrap();
    // the session may already be gone, in which case the send fails
    let _ = leaver_client.send_line("say too late").await;

    let seen = expect_text(
        &mut stay_client,
        &format!("{} has left the room.", leaver.name),
    )
    .await;
    assert!(!seen.contains("too late"), "got {:?}", seen);
}

#[tokio::test]
async fn unknown_verbs_are_reported() {
    let tw = test_world().await;
    let (_p, mut client) = connect(&tw.world).await;
    command(&mut client, "dance wildly", "Command 'dance' not recognized.").await;
    // blank lines just get a new prompt
    command(&mut client, "   ", "> ").await;
    command(&mut client, "take", "Take objects by typing 'take [object name]'.").await;
}

fn bounce(_ctx: &CommandContext, _args: &[String]) -> Vec<Effect> {
    vec![Effect::Write("Boing.\n".to_string())]
}

#[tokio::test]
async fn room_local_verbs_only_work_in_their_room() {
    let tw = test_world().await;
    let start = tw.world.start_room().await.unwrap();
    let gym = tw
        .world
        .create_room_with_commands("A gym.", CommandTable::new().with("bounce", bounce))
        .await
        .unwrap();
    tw.world
        .connect(start.id(), Direction::East, gym.id(), true)
        .await
        .unwrap();

    let (_p, mut client) = connect(&tw.world).await;
    command(&mut client, "bounce", "Command 'bounce' not recognized.").await;
    command(&mut client, "go east", "A gym.").await;
    command(&mut client, "bounce", "Boing.").await;
}

#[tokio::test]
async fn inventory_shows_items_and_money() {
    let tw = test_world().await;
    let (_p, mut client) = connect(&tw.world).await;
    let empty = command(&mut client, "inv", "You have 5000 bitbux.").await;
    assert!(!empty.contains("A red ball."));

    command(&mut client, "take ball", "You take the ball.").await;
    let full = command(&mut client, "inv", "You have 5000 bitbux.").await;
    assert!(full.contains("Inventory: \nA red ball.\n"), "got {:?}", full);

    command(&mut client, "drop ball", "You drop the ball.").await;
    command(&mut client, "drop ball", "You aren't carrying that.").await;
}

#[tokio::test]
async fn look_at_things_and_people() {
    let tw = test_world().await;
    let (_p, mut p_client) = connect(&tw.world).await;
    let (q, _q_client) = connect(&tw.world).await;

    command(&mut p_client, "look ball", "A red ball.").await;
    command(
        &mut p_client,
        &format!("look {}", q.name.to_lowercase()),
        &format!("A person: {}", q.name),
    )
    .await;
    command(&mut p_client, "look unicorn", "You don't see that here.").await;

    // carried things can still be examined
    command(&mut p_client, "take ball", "You take the ball.").await;
    command(&mut p_client, "look ball", "A red ball.").await;
}

#[tokio::test]
async fn taking_a_person_is_refused() {
    let tw = test_world().await;
    let (_p, mut p_client) = connect(&tw.world).await;
    let (q, _q_client) = connect(&tw.world).await;
    command(
        &mut p_client,
        &format!("take {}", q.name),
        "You can't take that.",
    )
    .await;
}

#[tokio::test]
async fn speech_reaches_the_room_with_quotes_preserved() {
    let tw = test_world().await;
    let (speaker, mut speaker_client) = connect(&tw.world).await;
    let (_listener, mut listener_client) = connect(&tw.world).await;
    command(
        &mut speaker_client,
        "say \"well met\" traveler",
        "You say, \"well met traveler\"",
    )
    .await;
    expect_text(
        &mut listener_client,
        &format!("{} says, \"well met traveler\"", speaker.name),
    )
    .await;
}
