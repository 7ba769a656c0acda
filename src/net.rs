//! TCP line adapter.
//!
//! Each accepted socket becomes a [`Connection`]: a reader task forwards
//! `\r\n`-trimmed lines into the session, a writer task copies outgoing text to
//! the socket and shuts it down when the session closes. End of stream on the
//! read side drops the line sender, which the session sees as a disconnect.

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::logutil::escape_log;
use crate::mud::{ClientEnd, Connection, OutboxReceiver, Outgoing, World};

/// Accept clients on `bind` forever, handing each one to `world`.
pub async fn serve(world: World, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("listening on {}", listener.local_addr()?);
    serve_listener(world, listener).await
}

/// Like [`serve`], for a listener the caller already bound (tests bind port 0).
pub async fn serve_listener(world: World, listener: TcpListener) -> Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("connection from {}", peer);
        let world = world.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_socket(world, stream).await {
                warn!("session for {} failed to start: {}", peer, e);
            }
        });
    }
}

async fn handle_socket(world: World, stream: TcpStream) -> Result<()> {
    let config = world.config();
    let (conn, client) = Connection::channel(config.server.line_buffer, config.limits.outbox);
    let ClientEnd { lines, output } = client;
    let (rd, wr) = stream.into_split();

    tokio::spawn(write_outgoing(wr, output));
    tokio::spawn(read_lines(rd, lines));

    world.accept(conn).await?;
    Ok(())
}

async fn read_lines(rd: tokio::net::tcp::OwnedReadHalf, lines: mpsc::Sender<String>) {
    let mut rd = BufReader::new(rd).lines();
    loop {
        match rd.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if lines.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("read error: {}", escape_log(&e.to_string()));
                break;
            }
        }
    }
}

async fn write_outgoing(mut wr: tokio::net::tcp::OwnedWriteHalf, mut output: OutboxReceiver) {
    while let Outgoing::Text(text) = output.recv().await {
        if wr.write_all(text.as_bytes()).await.is_err() {
            break;
        }
    }
    let _ = wr.shutdown().await;
}
