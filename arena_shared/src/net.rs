//! Networking primitives.
//!
//! Wire format: one JSON object per line over a TCP stream, in both
//! directions. Clients send `ClientCommand`s; the server sends a full
//! `WorldSnapshot` on connect and once per tick. There are no deltas and no
//! acknowledgements: a lost frame is superseded by the next one.

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::{
    character::{CharacterClass, CharacterId},
    math::Position,
};

/// Longest accepted line, newline excluded.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Client -> server command, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientCommand {
    /// Absolute target coordinates; the server clamps on apply.
    Move { x: f64, y: f64 },
    /// Any other `type`. Accepted by the decoder and ignored.
    #[serde(other)]
    Unknown,
}

impl ClientCommand {
    pub fn move_to(pos: Position) -> Self {
        ClientCommand::Move { x: pos.x, y: pos.y }
    }
}

/// Observable state of one character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterView {
    pub id: CharacterId,
    pub class: CharacterClass,
    pub position: Position,
    pub health: f64,
    #[serde(rename = "maxHealth")]
    pub max_health: f64,
}

/// Full world state, keyed by character id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorldSnapshot {
    pub characters: BTreeMap<CharacterId, CharacterView>,
}

impl WorldSnapshot {
    pub fn get(&self, id: &str) -> Option<&CharacterView> {
        self.characters.get(id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// Serializes a message into a newline-terminated frame.
pub fn encode_line<T: Serialize>(msg: &T) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(msg).context("serialize msg")?;
    let mut buf = BytesMut::with_capacity(payload.len() + 1);
    buf.extend_from_slice(&payload);
    buf.put_u8(b'\n');
    Ok(buf.freeze())
}

/// Decodes one inbound line. Bytes that are not UTF-8 fail like any other
/// malformed JSON.
pub fn decode_command(line: impl AsRef<[u8]>) -> anyhow::Result<ClientCommand> {
    serde_json::from_slice(line.as_ref()).context("deserialize command")
}

pub fn decode_snapshot(line: &str) -> anyhow::Result<WorldSnapshot> {
    serde_json::from_str(line.trim()).context("deserialize snapshot")
}

/// Reading half of a line-framed connection.
///
/// Lines are read as raw bytes, at most `max_line` long. A longer line is a
/// read error; what a line contains is left to the caller.
pub struct FrameReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
    max_line: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_line(inner, MAX_LINE_BYTES)
    }

    pub fn with_max_line(inner: R, max_line: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
            max_line,
        }
    }

    /// Next non-blank line without its terminator, or `None` at EOF.
    pub async fn next_frame(&mut self) -> anyhow::Result<Option<Vec<u8>>> {
        loop {
            self.buf.clear();
            // One extra byte leaves room for the newline of a full-length line.
            let limit = self.max_line as u64 + 1;
            let n = (&mut self.inner)
                .take(limit)
                .read_until(b'\n', &mut self.buf)
                .await
                .context("tcp read line")?;
            if n == 0 {
                return Ok(None);
            }
            if self.buf.last() == Some(&b'\n') {
                self.buf.pop();
                if self.buf.last() == Some(&b'\r') {
                    self.buf.pop();
                }
            } else if self.buf.len() > self.max_line {
                bail!("line exceeds {} bytes", self.max_line);
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(std::mem::take(&mut self.buf)));
        }
    }

    /// Next non-blank line as text, or `None` at EOF.
    pub async fn next_line(&mut self) -> anyhow::Result<Option<String>> {
        match self.next_frame().await? {
            Some(frame) => Ok(Some(String::from_utf8(frame).context("line is not utf-8")?)),
            None => Ok(None),
        }
    }

    /// Reads and decodes the next message, or `None` at EOF.
    pub async fn recv<T: DeserializeOwned>(&mut self) -> anyhow::Result<Option<T>> {
        match self.next_frame().await? {
            Some(frame) => {
                let msg = serde_json::from_slice(&frame).context("deserialize msg")?;
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }
}

/// Writing half of a line-framed connection.
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn send<T: Serialize>(&mut self, msg: &T) -> anyhow::Result<()> {
        let frame = encode_line(msg)?;
        self.send_frame(&frame).await
    }

    /// Writes an already-encoded frame.
    pub async fn send_frame(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        self.inner.write_all(frame).await.context("tcp write")?;
        self.inner.flush().await.context("tcp flush")?;
        Ok(())
    }
}
