//! Outbound command queue.

use pinpad_protocol::{BeepKind, Command, HeartbeatToken, Led};
use tokio::sync::mpsc;
use tracing::debug;

/// Cloneable handle that queues commands for the link writer.
///
/// Sending never blocks and never fails from the caller's point of view:
/// once the writer is gone, commands are dropped with a debug log.
///
/// # Examples
///
/// ```
/// use pinpad_link::LinkSender;
/// use pinpad_protocol::{Command, Led};
///
/// let (sender, mut rx) = LinkSender::channel();
/// sender.led(Led::Error, 3000);
/// assert_eq!(rx.try_recv().unwrap(), Command::led(Led::Error, 3000));
/// ```
#[derive(Debug, Clone)]
pub struct LinkSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl LinkSender {
    /// Create a sender together with the receiving end of its queue.
    ///
    /// The engine hands the receiver to its writer thread. Tests use the
    /// receiver to inspect what would have gone over the wire.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a command.
    pub fn send(&self, command: Command) {
        if let Err(e) = self.tx.send(command) {
            debug!("Link writer stopped, dropping {}", e.0);
        }
    }

    pub fn ping(&self, token: HeartbeatToken) {
        self.send(Command::Ping(token));
    }

    pub fn beep(&self, kind: BeepKind) {
        self.send(Command::Beep(kind));
    }

    /// Replace the display content.
    pub fn lcd_set(&self, text: impl Into<String>) {
        self.send(Command::LcdSet(text.into()));
    }

    /// Append one character to the display.
    pub fn lcd_put(&self, c: char) {
        self.send(Command::LcdPut(c));
    }

    pub fn led(&self, led: Led, duration_ms: u32) {
        self.send(Command::led(led, duration_ms));
    }

    /// Check whether the writer side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_queue_in_order() {
        let (sender, mut rx) = LinkSender::channel();
        sender.led(Led::Activity, 50);
        sender.beep(BeepKind::Ack);
        sender.lcd_set("PIN: *");
        sender.lcd_put('*');

        assert_eq!(rx.try_recv().unwrap(), Command::led(Led::Activity, 50));
        assert_eq!(rx.try_recv().unwrap(), Command::Beep(BeepKind::Ack));
        assert_eq!(rx.try_recv().unwrap(), Command::LcdSet("PIN: *".into()));
        assert_eq!(rx.try_recv().unwrap(), Command::LcdPut('*'));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_after_close_is_silent() {
        let (sender, rx) = LinkSender::channel();
        drop(rx);

        assert!(sender.is_closed());
        sender.beep(BeepKind::Short);
    }
}
