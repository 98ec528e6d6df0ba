//! Full socket-based integration tests for client ↔ server communication.

use std::time::Duration;

use arena_client::GameClient;
use arena_shared::{
    config::ArenaConfig,
    math::Position,
    net::{decode_snapshot, FrameReader, MAX_LINE_BYTES},
};
use arena_tests::{init_tracing, TestServer, WAIT};
use tokio::{
    io::AsyncWriteExt,
    net::{tcp::OwnedReadHalf, TcpStream},
};

/// Full integration: a move past the arena edge lands on the edge.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn move_is_clamped_end_to_end() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;
    let mut client = GameClient::connect(&server.cfg).await?;

    let first = client.wait_for(WAIT, |s| s.len() == 1).await?;
    assert!(first.is_some(), "expected a snapshot with our character");

    client.send_move(Position::new(900.0, 700.0)).await?;
    let edge = Position::new(800.0, 600.0);
    let moved = client
        .wait_for(WAIT, |s| s.characters.values().any(|c| c.position == edge))
        .await?;
    assert!(moved.is_some(), "character should end at (800, 600)");
    Ok(())
}

/// The initial snapshot is sent on connect, not on the next tick.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn initial_snapshot_arrives_before_next_tick() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start(ArenaConfig {
        tick_hz: 1,
        ..Default::default()
    })
    .await?;
    // Let the first tick go out to nobody.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut client = GameClient::connect(&server.cfg).await?;
    assert!(client.recv_snapshot(Duration::from_millis(500)).await?);
    let snap = client.latest().expect("snapshot buffered");
    assert_eq!(snap.len(), 1);

    let view = snap.characters.values().next().unwrap();
    assert_eq!(view.health, view.max_health);
    assert!(server.arena.world.bounds().contains(view.position));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn disconnect_removes_character_from_next_snapshot() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;

    let leaving = GameClient::connect(&server.cfg).await?;
    let mut staying = GameClient::connect(&server.cfg).await?;
    assert!(staying.wait_for(WAIT, |s| s.len() == 2).await?.is_some());

    drop(leaving);
    assert!(staying.wait_for(WAIT, |s| s.len() == 1).await?.is_some());
    assert!(server.wait_for_population(1).await);
    assert_eq!(server.arena.sessions.len(), 1);
    Ok(())
}

/// Garbage and unknown command types are skipped; the session keeps going.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_lines_do_not_end_session() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;

    let mut stream = TcpStream::connect(server.addr()).await?;
    stream
        .write_all(
            b"this is not json\n{\"type\":\"teleport\",\"x\":1}\n{\"type\":\"move\",\"x\":-50,\"y\":10}\n",
        )
        .await?;

    let (read_half, _write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let reached =
        tokio::time::timeout(WAIT, read_until_at(&mut reader, Position::new(0.0, 10.0))).await??;

    assert!(reached, "move after malformed lines should still apply");
    assert_eq!(server.arena.world.len(), 1);
    Ok(())
}

/// A line of raw non-UTF-8 bytes is dropped like any other bad line.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_utf8_line_does_not_end_session() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;

    let mut stream = TcpStream::connect(server.addr()).await?;
    stream
        .write_all(b"\xff\xfe garbage\n{\"type\":\"move\",\"x\":-50,\"y\":10}\n")
        .await?;

    let (read_half, _write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let reached =
        tokio::time::timeout(WAIT, read_until_at(&mut reader, Position::new(0.0, 10.0))).await??;

    assert!(reached, "move after a non-utf-8 line should still apply");
    assert_eq!(server.arena.world.len(), 1);
    Ok(())
}

/// A client streaming bytes without a newline is cut off at the line limit.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overlong_line_ends_session() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;

    let mut stream = TcpStream::connect(server.addr()).await?;
    assert!(server.wait_for_population(1).await);

    let flood = vec![b'a'; MAX_LINE_BYTES + 1024];
    // The server may reset the connection mid-write once it gives up.
    let _ = stream.write_all(&flood).await;

    assert!(server.wait_for_population(0).await);
    assert!(server.arena.sessions.is_empty());
    Ok(())
}

/// Reads raw snapshot lines until some character sits at `target`.
async fn read_until_at(
    reader: &mut FrameReader<OwnedReadHalf>,
    target: Position,
) -> anyhow::Result<bool> {
    while let Some(line) = reader.next_line().await? {
        let snap = decode_snapshot(&line)?;
        if snap.characters.values().any(|c| c.position == target) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A client that never reads must not hold up broadcasts to others.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stalled_client_does_not_block_others() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start(ArenaConfig {
        outbound_queue: 2,
        ..Default::default()
    })
    .await?;

    let _stalled = TcpStream::connect(server.addr()).await?;
    let mut live = GameClient::connect(&server.cfg).await?;
    assert!(live.wait_for(WAIT, |s| s.len() == 2).await?.is_some());

    let start = live.snapshots_received();
    let deadline = tokio::time::Instant::now() + WAIT;
    while live.snapshots_received() < start + 30 && tokio::time::Instant::now() < deadline {
        live.recv_snapshot(Duration::from_millis(100)).await?;
    }
    assert!(live.snapshots_received() >= start + 30);
    assert_eq!(server.arena.world.len(), 2);
    Ok(())
}

/// Two players pushed into range start taking damage.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn players_in_range_fight() -> anyhow::Result<()> {
    init_tracing();
    let server = TestServer::start_default().await?;

    let mut a = GameClient::connect(&server.cfg).await?;
    let mut b = GameClient::connect(&server.cfg).await?;
    assert!(b.wait_for(WAIT, |s| s.len() == 2).await?.is_some());

    a.send_move(Position::new(400.0, 300.0)).await?;
    b.send_move(Position::new(410.0, 300.0)).await?;

    let hurt = b
        .wait_for(WAIT, |s| s.characters.values().any(|c| c.health < c.max_health))
        .await?;
    let snap = hurt.expect("someone should have been hit");
    for view in snap.characters.values() {
        assert!(view.health >= 0.0 && view.health <= view.max_health);
    }
    Ok(())
}
