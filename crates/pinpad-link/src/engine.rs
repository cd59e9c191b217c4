//! The link engine: reader thread, writer thread and the consuming loop.
//!
//! All inbound bytes and heartbeat ticks are processed by one task, so frame
//! state and the outstanding heartbeat token never need a lock.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pinpad_core::KeyEvent;
use pinpad_core::constants::{DEFAULT_HEARTBEAT_INTERVAL_MS, HEARTBEAT_TOKEN_LEN};
use pinpad_protocol::{Command, FrameAssembler, HeartbeatToken, Inbound, Packet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::error::{LinkError, Result};
use crate::events::KeyEvents;
use crate::sender::LinkSender;

/// Bytes buffered between the reader thread and the engine loop.
const READER_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the link engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Interval between two heartbeat probes. The first probe is sent one
    /// interval after start.
    pub heartbeat_interval: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
        }
    }
}

/// Link health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Heartbeat probes sent.
    pub pings_sent: u64,

    /// Pongs echoing the outstanding token.
    pub pongs_matched: u64,

    /// Pongs echoing something else, or arriving with no probe outstanding.
    pub pongs_mismatched: u64,

    /// Probes still unacknowledged when the next one was due.
    pub pongs_missed: u64,

    /// Key presses delivered to the consumer.
    pub key_events: u64,

    /// Complete frames with an unknown tag or payload.
    pub frames_discarded: u64,

    /// Time of the most recent pong, matching or not.
    pub last_pong_at: Option<DateTime<Utc>>,
}

/// Handle to a running link engine.
pub struct LinkHandle {
    sender: LinkSender,
    key_events: Option<KeyEvents>,
    stats: watch::Receiver<LinkStats>,
    task: JoinHandle<LinkError>,
}

impl LinkHandle {
    /// Cloneable queue for display, LED and beep commands.
    pub fn sender(&self) -> LinkSender {
        self.sender.clone()
    }

    /// Take the key press stream.
    ///
    /// There is exactly one consumer: the first call returns the stream,
    /// every later call returns `None`.
    pub fn take_key_events(&mut self) -> Option<KeyEvents> {
        self.key_events.take()
    }

    /// Snapshot of the link health counters.
    pub fn stats(&self) -> LinkStats {
        self.stats.borrow().clone()
    }

    /// Receiver that observes every counter update.
    pub fn subscribe_stats(&self) -> watch::Receiver<LinkStats> {
        self.stats.clone()
    }

    /// Wait for the engine to stop and return the reason.
    ///
    /// The engine only stops on a fatal transport error, so in normal
    /// operation this future never resolves.
    pub async fn join(self) -> LinkError {
        match self.task.await {
            Ok(reason) => reason,
            Err(e) => LinkError::EngineStopped(e.to_string()),
        }
    }

    /// Stop the engine loop.
    ///
    /// The reader thread exits on its next read once the loop is gone.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// Start the link engine on an arbitrary byte transport.
///
/// `reader` is driven one byte at a time from a dedicated thread, `writer`
/// receives each encoded command from a second thread. Must be called
/// from within a Tokio runtime.
///
/// # Errors
///
/// Returns [`LinkError::Spawn`] if a thread cannot be started.
///
/// # Examples
///
/// ```
/// use pinpad_link::{LinkConfig, mock::MockTerminal, spawn};
///
/// # #[tokio::main]
/// # async fn main() -> pinpad_link::Result<()> {
/// let (reader, writer, terminal) = MockTerminal::new();
/// let mut link = spawn(reader, writer, LinkConfig::default())?;
/// let mut keys = link.take_key_events().unwrap();
///
/// terminal.press('5');
/// assert_eq!(keys.next().await, Some(pinpad_core::KeyEvent::Digit(5)));
/// # Ok(())
/// # }
/// ```
pub fn spawn<R, W>(reader: R, writer: W, config: LinkConfig) -> Result<LinkHandle>
where
    R: Read + Send + 'static,
    W: Write + Send + 'static,
{
    let (byte_tx, byte_rx) = mpsc::channel(READER_CHANNEL_CAPACITY);
    let (sender, command_rx) = LinkSender::channel();
    let (key_tx, key_events) = KeyEvents::channel();
    let (stats_tx, stats_rx) = watch::channel(LinkStats::default());

    thread::Builder::new()
        .name("pinpad-link-rx".to_string())
        .spawn(move || read_loop(reader, byte_tx))
        .map_err(LinkError::Spawn)?;

    thread::Builder::new()
        .name("pinpad-link-tx".to_string())
        .spawn(move || write_loop(writer, command_rx))
        .map_err(LinkError::Spawn)?;

    let engine = Engine::new(sender.clone(), key_tx, stats_tx, StdRng::from_entropy());
    let task = tokio::spawn(engine.run(byte_rx, config.heartbeat_interval));

    info!(
        "Link engine started (heartbeat every {}ms)",
        config.heartbeat_interval.as_millis()
    );

    Ok(LinkHandle {
        sender,
        key_events: Some(key_events),
        stats: stats_rx,
        task,
    })
}

/// What the reader thread reports to the engine loop.
#[derive(Debug)]
enum ReaderEvent {
    Byte(u8),
    Failed(io::Error),
}

fn read_loop<R: Read>(mut reader: R, events: mpsc::Sender<ReaderEvent>) {
    let mut byte = [0u8; 1];
    loop {
        let event = match reader.read(&mut byte) {
            Ok(0) => ReaderEvent::Failed(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial transport closed",
            )),
            Ok(_) => ReaderEvent::Byte(byte[0]),
            // Serial ports report an idle line as a timeout
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {
                continue;
            }
            Err(e) => ReaderEvent::Failed(e),
        };

        let fatal = matches!(event, ReaderEvent::Failed(_));
        if events.blocking_send(event).is_err() || fatal {
            debug!("Link reader exiting");
            return;
        }
    }
}

fn write_loop<W: Write>(mut writer: W, mut commands: mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = commands.blocking_recv() {
        let wire = command.encode();
        match writer.write_all(&wire).and_then(|()| writer.flush()) {
            Ok(()) => trace!("Sent {}", command),
            Err(e) => warn!("Failed to send {} to terminal: {}", command.verb(), e),
        }
    }
    debug!("Link writer exiting");
}

/// Result of checking a pong against the outstanding probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PongCheck {
    Matched,
    Mismatched { expected: Option<HeartbeatToken> },
}

/// Outstanding heartbeat bookkeeping.
///
/// At most one token is outstanding. Any pong clears it.
#[derive(Debug)]
pub(crate) struct Heartbeat<R> {
    outstanding: Option<HeartbeatToken>,
    rng: R,
}

impl<R: Rng> Heartbeat<R> {
    pub(crate) fn new(rng: R) -> Self {
        Self {
            outstanding: None,
            rng,
        }
    }

    /// Start a new probe.
    ///
    /// Returns the token of a probe that was never answered, if any, and the
    /// fresh token to send.
    pub(crate) fn tick(&mut self) -> (Option<HeartbeatToken>, HeartbeatToken) {
        let missed = self.outstanding.take();
        let token = HeartbeatToken::random(&mut self.rng);
        self.outstanding = Some(token);
        (missed, token)
    }

    pub(crate) fn acknowledge(&mut self, echoed: &[u8; HEARTBEAT_TOKEN_LEN]) -> PongCheck {
        match self.outstanding.take() {
            Some(expected) if expected.as_bytes() == echoed => PongCheck::Matched,
            expected => PongCheck::Mismatched { expected },
        }
    }

    #[cfg(test)]
    pub(crate) fn outstanding(&self) -> Option<HeartbeatToken> {
        self.outstanding
    }
}

/// State owned by the engine loop.
struct Engine<R> {
    assembler: FrameAssembler,
    heartbeat: Heartbeat<R>,
    commands: LinkSender,
    keys: mpsc::UnboundedSender<KeyEvent>,
    stats: watch::Sender<LinkStats>,
}

impl<R: Rng> Engine<R> {
    fn new(
        commands: LinkSender,
        keys: mpsc::UnboundedSender<KeyEvent>,
        stats: watch::Sender<LinkStats>,
        rng: R,
    ) -> Self {
        Self {
            assembler: FrameAssembler::new(),
            heartbeat: Heartbeat::new(rng),
            commands,
            keys,
            stats,
        }
    }

    async fn run(mut self, mut bytes: mpsc::Receiver<ReaderEvent>, interval: Duration) -> LinkError {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = bytes.recv() => match event {
                    Some(ReaderEvent::Byte(byte)) => self.on_byte(byte),
                    Some(ReaderEvent::Failed(e)) => {
                        error!("Error reading from the serial interface: {}", e);
                        return LinkError::Transport(e);
                    }
                    None => return LinkError::ReaderStopped,
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }
    }

    fn on_byte(&mut self, byte: u8) {
        if let Some(packet) = self.assembler.push(byte) {
            self.on_packet(packet);
        }
    }

    fn on_packet(&mut self, packet: Packet) {
        match packet.classify() {
            Inbound::Pong(echoed) => {
                let check = self.heartbeat.acknowledge(&echoed);
                if let PongCheck::Mismatched { expected } = check {
                    warn!(
                        "Terminal sent PONG {}, but we expected {}",
                        echoed.escape_ascii(),
                        expected.as_ref().map_or("nothing", HeartbeatToken::as_str)
                    );
                }
                self.stats.send_modify(|stats| {
                    match check {
                        PongCheck::Matched => stats.pongs_matched += 1,
                        PongCheck::Mismatched { .. } => stats.pongs_mismatched += 1,
                    }
                    stats.last_pong_at = Some(Utc::now());
                });
            }
            Inbound::Key(key) => {
                debug!("Key pressed: {}", key);
                self.stats.send_modify(|stats| stats.key_events += 1);
                if self.keys.send(key).is_err() {
                    debug!("No key consumer, dropping {}", key);
                }
            }
            Inbound::Unknown => {
                debug!("Discarding frame {:?}", packet);
                self.stats.send_modify(|stats| stats.frames_discarded += 1);
            }
        }
    }

    fn on_tick(&mut self) {
        let (missed, token) = self.heartbeat.tick();
        if let Some(missed) = missed {
            warn!("Terminal did not PONG {}", missed);
        }
        self.commands.ping(token);
        self.stats.send_modify(|stats| {
            stats.pings_sent += 1;
            if missed.is_some() {
                stats.pongs_missed += 1;
            }
        });
    }
}
