//! Terminal-side warning shown while credential sync keeps failing.

use std::time::Duration;

use pinpad_link::LinkSender;
use pinpad_protocol::{BeepKind, Led};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Default period between two warning pulses.
pub const DEFAULT_INDICATOR_PERIOD: Duration = Duration::from_secs(2);

/// Duration of the red LED pulse.
const INDICATOR_LED_MS: u32 = 1000;

/// Repeats a red LED pulse plus a beep until cleared.
///
/// At most one pulse loop runs at a time. Dropping the indicator stops it.
#[derive(Debug)]
pub struct FailureIndicator {
    link: LinkSender,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl FailureIndicator {
    pub fn new(link: LinkSender, period: Duration) -> Self {
        Self {
            link,
            period,
            task: None,
        }
    }

    /// Start pulsing unless already running.
    pub fn engage(&mut self) {
        if self.is_running() {
            return;
        }

        warn!("Credential sync unhealthy, engaging failure indicator");
        let link = self.link.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            loop {
                link.led(Led::Error, INDICATOR_LED_MS);
                link.beep(BeepKind::Ack);
                tokio::time::sleep(period).await;
            }
        }));
    }

    /// Stop pulsing. No-op when idle.
    pub fn clear(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Credential sync healthy again, failure indicator cleared");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for FailureIndicator {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
