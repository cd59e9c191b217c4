//! In-memory terminal for tests and development.
//!
//! [`MockTerminal::new`] returns a reader and a writer to hand to
//! [`spawn`](crate::spawn), plus a [`MockTerminalHandle`] that plays the
//! terminal's side: pressing keys, answering heartbeats, breaking the line.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use pinpad_core::constants::{COMMAND_LEN, FRAME_END, WIDE_COMMAND_LEN};

/// Input queued for the reader side.
#[derive(Debug)]
enum MockInput {
    Bytes(Vec<u8>),
    Error(io::ErrorKind),
    Eof,
}

/// Simulated terminal.
pub struct MockTerminal;

impl MockTerminal {
    /// Create the transport pair and the handle controlling it.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_link::mock::MockTerminal;
    ///
    /// let (_reader, _writer, terminal) = MockTerminal::new();
    /// terminal.press_all("123456#");
    /// assert!(terminal.written().is_empty());
    /// ```
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (MockReader, MockWriter, MockTerminalHandle) {
        let (input_tx, input_rx) = mpsc::channel();
        let written = Arc::new(Mutex::new(Vec::new()));
        let auto_pong = Arc::new(AtomicBool::new(false));

        let handle = MockTerminalHandle {
            input_tx: input_tx.clone(),
            written: Arc::clone(&written),
            auto_pong: Arc::clone(&auto_pong),
        };

        let reader = MockReader {
            input_rx,
            pending: VecDeque::new(),
        };

        let writer = MockWriter {
            input_tx,
            partial: Vec::with_capacity(WIDE_COMMAND_LEN),
            written,
            auto_pong,
        };

        (reader, writer, handle)
    }
}

/// Reader half: yields whatever the handle queued, blocking in between.
pub struct MockReader {
    input_rx: mpsc::Receiver<MockInput>,
    pending: VecDeque<u8>,
}

impl Read for MockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while self.pending.is_empty() {
            match self.input_rx.recv() {
                Ok(MockInput::Bytes(bytes)) => self.pending.extend(bytes),
                Ok(MockInput::Error(kind)) => return Err(io::Error::from(kind)),
                Ok(MockInput::Eof) | Err(_) => return Ok(0),
            }
        }

        let mut count = 0;
        while count < buf.len() {
            match self.pending.pop_front() {
                Some(byte) => {
                    buf[count] = byte;
                    count += 1;
                }
                None => break,
            }
        }
        Ok(count)
    }
}

/// Writer half: records every complete command.
pub struct MockWriter {
    input_tx: mpsc::Sender<MockInput>,
    partial: Vec<u8>,
    written: Arc<Mutex<Vec<String>>>,
    auto_pong: Arc<AtomicBool>,
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            self.partial.push(byte);
            if self.partial.len() == command_width(&self.partial) {
                let command = String::from_utf8_lossy(&self.partial).into_owned();
                self.partial.clear();
                self.answer(&command);
                lock(&self.written).push(command);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Width of the command whose first bytes are `partial`.
fn command_width(partial: &[u8]) -> usize {
    if partial.starts_with(b"^LCD") || partial.starts_with(b"^LED") {
        WIDE_COMMAND_LEN
    } else {
        COMMAND_LEN
    }
}

impl MockWriter {
    fn answer(&self, command: &str) {
        if !self.auto_pong.load(Ordering::SeqCst) {
            return;
        }
        if let Some(token) = command.strip_prefix("^PING ").and_then(|rest| rest.get(..2)) {
            let pong = format!("^PONG {token}$");
            let _ = self.input_tx.send(MockInput::Bytes(pong.into_bytes()));
        }
    }
}

/// Controls the simulated terminal. Cheap to clone.
#[derive(Clone)]
pub struct MockTerminalHandle {
    input_tx: mpsc::Sender<MockInput>,
    written: Arc<Mutex<Vec<String>>>,
    auto_pong: Arc<AtomicBool>,
}

impl MockTerminalHandle {
    /// Press one key, sent as a `^PAD` frame.
    pub fn press(&self, key: char) {
        self.send_raw(format!("^PAD {key}  $").as_bytes());
    }

    /// Press every key of `keys` in order.
    pub fn press_all(&self, keys: &str) {
        for key in keys.chars() {
            self.press(key);
        }
    }

    /// Answer a heartbeat with the given token.
    pub fn pong(&self, token: &str) {
        self.send_raw(format!("^PONG {token}$").as_bytes());
    }

    /// Queue arbitrary bytes on the line.
    pub fn send_raw(&self, bytes: &[u8]) {
        let _ = self.input_tx.send(MockInput::Bytes(bytes.to_vec()));
    }

    /// Make the next read fail with `kind`.
    pub fn fail(&self, kind: io::ErrorKind) {
        let _ = self.input_tx.send(MockInput::Error(kind));
    }

    /// Make the next read report end of stream.
    pub fn hang_up(&self) {
        let _ = self.input_tx.send(MockInput::Eof);
    }

    /// Answer every `^PING` automatically.
    pub fn set_auto_pong(&self, enabled: bool) {
        self.auto_pong.store(enabled, Ordering::SeqCst);
    }

    /// Every command received so far, exactly as written.
    pub fn written(&self) -> Vec<String> {
        lock(&self.written).clone()
    }

    /// Received commands with padding and terminator stripped.
    pub fn commands(&self) -> Vec<String> {
        lock(&self.written)
            .iter()
            .map(|c| {
                c.strip_suffix(char::from(FRAME_END))
                    .unwrap_or(c)
                    .trim_end_matches(' ')
                    .to_string()
            })
            .collect()
    }

    /// Received commands that are not heartbeat probes.
    pub fn feedback(&self) -> Vec<String> {
        self.commands()
            .into_iter()
            .filter(|c| !c.starts_with("^PING "))
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
