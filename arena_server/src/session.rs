//! Per-connection sessions.
//!
//! A session owns one client's character for as long as the connection
//! lives. Inbound lines are decoded and applied to the world as they arrive;
//! outbound frames flow through a bounded queue drained by a dedicated writer
//! task, so a slow socket only ever delays its own client.

use std::net::SocketAddr;

use anyhow::Context;
use arena_shared::{
    character::{CharacterClass, CharacterId},
    config::MovementModel,
    math::Position,
    net::{decode_command, encode_line, ClientCommand, FrameReader, FrameWriter},
};
use bytes::Bytes;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    sync::mpsc,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::server::ArenaHandle;

/// Server-side state of one connected client.
///
/// Dropping a session unregisters its outbound queue and removes its
/// character from the world.
pub struct Session {
    id: CharacterId,
    arena: ArenaHandle,
}

impl Session {
    /// Spawns a fresh character and registers the session.
    ///
    /// The returned receiver already holds the initial full snapshot, ahead
    /// of any tick broadcast.
    pub fn open(
        arena: ArenaHandle,
        class: CharacterClass,
    ) -> anyhow::Result<(Self, mpsc::Receiver<Bytes>)> {
        let id = Uuid::new_v4().to_string();
        arena.world.spawn_character(id.clone(), class);
        let session = Self { id, arena };

        let (tx, rx) = mpsc::channel(session.arena.outbound_queue.max(1));
        let initial = encode_line(&session.arena.world.snapshot()).context("encode snapshot")?;
        tx.try_send(initial).context("queue initial snapshot")?;
        session.arena.sessions.register(session.id.clone(), tx);

        Ok((session, rx))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Decodes and applies one inbound line. Malformed input, invalid UTF-8
    /// included, is dropped.
    pub fn handle_line(&self, line: impl AsRef<[u8]>) {
        match decode_command(line) {
            Ok(cmd) => self.dispatch(cmd),
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(character_id = %self.id, error = %reason, "Dropping malformed command");
            }
        }
    }

    pub fn dispatch(&self, cmd: ClientCommand) {
        match cmd {
            ClientCommand::Move { x, y } => {
                let Some(character) = self.arena.world.get_character(&self.id) else {
                    return;
                };
                let target = Position::new(x, y);
                match self.arena.movement {
                    MovementModel::Instant => character.set_position(target),
                    MovementModel::Interpolated => character.set_move_target(target),
                }
            }
            ClientCommand::Unknown => {
                debug!(character_id = %self.id, "Ignoring unknown command type");
            }
        }
    }

    /// Feeds inbound lines to the session until EOF or a read error. A line
    /// longer than the reader's limit is a read error.
    pub async fn read_commands<R: AsyncRead + Unpin>(
        &self,
        reader: &mut FrameReader<R>,
    ) -> anyhow::Result<()> {
        while let Some(line) = reader.next_frame().await? {
            self.handle_line(&line);
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.arena.sessions.unregister(&self.id);
        self.arena.world.remove_character(&self.id);
        info!(character_id = %self.id, "Player disconnected");
    }
}

/// Drains a session's outbound queue onto its socket.
pub async fn write_frames<W: AsyncWrite + Unpin>(
    mut writer: FrameWriter<W>,
    mut outbound: mpsc::Receiver<Bytes>,
) -> anyhow::Result<()> {
    while let Some(frame) = outbound.recv().await {
        writer.send_frame(&frame).await?;
    }
    Ok(())
}

/// Runs one client connection from accept to cleanup.
pub async fn serve(stream: TcpStream, peer: SocketAddr, arena: ArenaHandle) -> anyhow::Result<()> {
    stream.set_nodelay(true).context("set nodelay")?;
    let class = CharacterClass::random(&mut rand::thread_rng());
    let (session, outbound) = Session::open(arena, class)?;
    info!(character_id = %session.id(), %peer, ?class, "Player connected");

    let (read_half, write_half) = stream.into_split();
    let mut writer = tokio::spawn(write_frames(FrameWriter::new(write_half), outbound));
    let mut reader = FrameReader::new(read_half);

    let result = tokio::select! {
        res = session.read_commands(&mut reader) => res,
        res = &mut writer => res.context("writer task")?,
    };
    writer.abort();
    drop(session);
    result
}
