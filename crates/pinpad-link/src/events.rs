//! Key press stream handed to the single consumer of the link.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pinpad_core::KeyEvent;
use tokio::sync::mpsc;

/// Unbounded stream of key presses, in the order the terminal sent them.
///
/// Ends once the link engine stops.
#[derive(Debug)]
pub struct KeyEvents {
    rx: mpsc::UnboundedReceiver<KeyEvent>,
}

impl KeyEvents {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<KeyEvent>) -> Self {
        Self { rx }
    }

    /// Create a stream fed by a plain channel, detached from any link.
    pub fn channel() -> (mpsc::UnboundedSender<KeyEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self::new(rx))
    }

    /// Wait for the next key press.
    pub async fn next(&mut self) -> Option<KeyEvent> {
        self.rx.recv().await
    }
}

impl Stream for KeyEvents {
    type Item = KeyEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_stream_ends_when_sender_drops() {
        let (tx, events) = KeyEvents::channel();
        tx.send(KeyEvent::Digit(1)).unwrap();
        tx.send(KeyEvent::Hash).unwrap();
        drop(tx);

        let keys: Vec<KeyEvent> = events.collect().await;
        assert_eq!(keys, vec![KeyEvent::Digit(1), KeyEvent::Hash]);
    }
}
