//! Link engine running on real threads against the mock terminal.

use std::io;
use std::time::Duration;

use pinpad_core::KeyEvent;
use pinpad_link::mock::MockTerminal;
use pinpad_link::{LinkConfig, LinkError, spawn};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn quiet() -> LinkConfig {
    LinkConfig {
        heartbeat_interval: Duration::from_secs(3600),
    }
}

#[tokio::test]
async fn test_keypresses_are_delivered_in_order() {
    let (reader, writer, terminal) = MockTerminal::new();
    let mut link = spawn(reader, writer, quiet()).unwrap();
    let mut keys = link.take_key_events().unwrap();

    terminal.press_all("2345#");

    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(timeout(WAIT, keys.next()).await.unwrap().unwrap());
    }
    assert_eq!(
        received,
        vec![
            KeyEvent::Digit(2),
            KeyEvent::Digit(3),
            KeyEvent::Digit(4),
            KeyEvent::Digit(5),
            KeyEvent::Hash,
        ]
    );
    assert_eq!(link.stats().key_events, 5);
}

#[tokio::test]
async fn test_key_events_taken_once() {
    let (reader, writer, _terminal) = MockTerminal::new();
    let mut link = spawn(reader, writer, quiet()).unwrap();

    assert!(link.take_key_events().is_some());
    assert!(link.take_key_events().is_none());
}

#[tokio::test]
async fn test_leading_garbage_does_not_produce_keys() {
    let (reader, writer, terminal) = MockTerminal::new();
    let mut link = spawn(reader, writer, quiet()).unwrap();
    let mut keys = link.take_key_events().unwrap();

    terminal.send_raw(b"\0\0D 1  $xyz");
    terminal.press('8');

    let key = timeout(WAIT, keys.next()).await.unwrap().unwrap();
    assert_eq!(key, KeyEvent::Digit(8));
}

#[tokio::test]
async fn test_commands_reach_the_wire() {
    let (reader, writer, terminal) = MockTerminal::new();
    let link = spawn(reader, writer, quiet()).unwrap();

    let sender = link.sender();
    sender.lcd_set("PIN: *");
    sender.lcd_put('*');

    timeout(WAIT, async {
        while terminal.written().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    assert_eq!(terminal.commands(), vec!["^LCD PIN: *", "^LCH *"]);
    let widths: Vec<usize> = terminal.written().iter().map(String::len).collect();
    assert_eq!(widths, vec![39, 38]);
    assert!(terminal.written().iter().all(|c| c.ends_with('$')));
}

#[tokio::test]
async fn test_heartbeat_is_answered() {
    let (reader, writer, terminal) = MockTerminal::new();
    terminal.set_auto_pong(true);
    let link = spawn(
        reader,
        writer,
        LinkConfig {
            heartbeat_interval: Duration::from_millis(20),
        },
    )
    .unwrap();

    let mut stats = link.subscribe_stats();
    timeout(WAIT, stats.wait_for(|s| s.pongs_matched >= 2))
        .await
        .unwrap()
        .unwrap();

    let stats = link.stats();
    assert!(stats.pings_sent >= 2);
    assert!(stats.last_pong_at.is_some());
}

#[tokio::test]
async fn test_read_error_is_fatal() {
    let (reader, writer, terminal) = MockTerminal::new();
    let link = spawn(reader, writer, quiet()).unwrap();

    terminal.fail(io::ErrorKind::BrokenPipe);

    let reason = timeout(WAIT, link.join()).await.unwrap();
    assert!(matches!(reason, LinkError::Transport(e) if e.kind() == io::ErrorKind::BrokenPipe));
}

#[tokio::test]
async fn test_end_of_stream_is_fatal() {
    let (reader, writer, terminal) = MockTerminal::new();
    let link = spawn(reader, writer, quiet()).unwrap();

    terminal.hang_up();

    let reason = timeout(WAIT, link.join()).await.unwrap();
    assert!(matches!(reason, LinkError::Transport(e) if e.kind() == io::ErrorKind::UnexpectedEof));
}
