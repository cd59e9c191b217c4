//! Control socket over a real Unix socket in a temporary directory.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pinpad_core::ActuatorCommand;
use pinpad_hardware::{ActuatorHandle, ActuatorRequest};
use pinpad_network::{ControlSocket, ControlSocketConfig};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LinesCodec};

const WAIT: Duration = Duration::from_secs(5);

struct Fixture {
    dir: tempfile::TempDir,
    requests: mpsc::Receiver<ActuatorRequest>,
}

fn config(dir: &tempfile::TempDir) -> ControlSocketConfig {
    ControlSocketConfig {
        path: dir.path().join("ctrl.sock"),
        ..ControlSocketConfig::default()
    }
}

async fn start() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let (actuator, requests) = ActuatorHandle::channel(4);
    let socket = ControlSocket::bind(config(&dir)).unwrap();
    tokio::spawn(socket.serve(actuator));
    Fixture { dir, requests }
}

async fn connect(dir: &tempfile::TempDir) -> Framed<UnixStream, LinesCodec> {
    let stream = UnixStream::connect(dir.path().join("ctrl.sock")).await.unwrap();
    Framed::new(stream, LinesCodec::new())
}

async fn request(client: &mut Framed<UnixStream, LinesCodec>, line: &str) -> String {
    client.send(line).await.unwrap();
    timeout(WAIT, client.next()).await.unwrap().unwrap().unwrap()
}

#[tokio::test]
async fn test_open_and_close_are_queued() {
    let mut fixture = start().await;
    let mut client = connect(&fixture.dir).await;

    assert_eq!(request(&mut client, "open").await, "ok");
    assert_eq!(request(&mut client, "close").await, "ok");

    let first = timeout(WAIT, fixture.requests.recv()).await.unwrap().unwrap();
    let second = timeout(WAIT, fixture.requests.recv()).await.unwrap().unwrap();
    assert_eq!(first.command, ActuatorCommand::Open);
    assert_eq!(second.command, ActuatorCommand::Close);
}

#[tokio::test]
async fn test_unknown_command() {
    let mut fixture = start().await;
    let mut client = connect(&fixture.dir).await;

    assert_eq!(request(&mut client, "dance").await, "error: unknown cmd");
    assert!(fixture.requests.try_recv().is_err());
}

#[tokio::test]
async fn test_overlong_line_is_rejected_and_closes_connection() {
    let mut fixture = start().await;
    let mut client = connect(&fixture.dir).await;

    let long = "o".repeat(100);
    assert_eq!(request(&mut client, &long).await, "error: unknown cmd");
    assert!(timeout(WAIT, client.next()).await.unwrap().is_none());
    assert!(fixture.requests.try_recv().is_err());

    let mut client = connect(&fixture.dir).await;
    assert_eq!(request(&mut client, "open").await, "ok");
}

#[tokio::test]
async fn test_actuator_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let (actuator, requests) = ActuatorHandle::channel(4);
    drop(requests);
    let socket = ControlSocket::bind(config(&dir)).unwrap();
    tokio::spawn(socket.serve(actuator));
    let mut client = connect(&dir).await;

    assert_eq!(request(&mut client, "open").await, "error: actuator unavailable");
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ctrl.sock");
    std::fs::write(&path, b"stale").unwrap();

    let (actuator, _requests) = ActuatorHandle::channel(1);
    let socket = ControlSocket::bind(config(&dir)).unwrap();
    assert_eq!(socket.path(), path);
    tokio::spawn(socket.serve(actuator));

    assert!(UnixStream::connect(&path).await.is_ok());
}

#[tokio::test]
async fn test_socket_file_removed_on_drop() {
    let dir = tempfile::tempdir().unwrap();
    let socket = ControlSocket::bind(config(&dir)).unwrap();
    let path = socket.path().to_path_buf();
    assert!(path.exists());

    drop(socket);
    assert!(!path.exists());
}
