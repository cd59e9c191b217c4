//! Door contact poller.
//!
//! The door leaf carries a contact on a GPIO input. [`DoorMonitor`] polls it
//! and publishes the debounced [`DoorState`] on a watch channel, so any
//! number of consumers can read the latest state or wait for changes.

use std::time::Duration;

use pinpad_core::DoorState;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::devices::AnyGpio;
use crate::gpio::{GpioBus, GpioLevel};

/// Configuration for the door contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorSensorConfig {
    pub pin: u32,

    /// Level the contact reports while the door is open.
    pub open_level: GpioLevel,

    pub poll_interval: Duration,
}

impl Default for DoorSensorConfig {
    fn default() -> Self {
        Self {
            pin: 25,
            open_level: GpioLevel::High,
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// Read side of the door state.
#[derive(Debug, Clone)]
pub struct DoorStatus {
    rx: watch::Receiver<DoorState>,
}

impl DoorStatus {
    /// A status that never changes. Used when no sensor is attached.
    pub fn fixed(state: DoorState) -> Self {
        let (_, rx) = watch::channel(state);
        Self { rx }
    }

    /// Latest published state.
    pub fn current(&self) -> DoorState {
        *self.rx.borrow()
    }

    /// Wait for the next change. Returns `None` once the poller stopped.
    pub async fn changed(&mut self) -> Option<DoorState> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// Polls the door contact.
pub struct DoorMonitor;

impl DoorMonitor {
    /// Take a first reading, publish it and keep polling in the background.
    ///
    /// A failed first read publishes [`DoorState::Closed`]. Later read
    /// failures are logged and the previous state is kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_core::DoorState;
    /// use pinpad_hardware::door::{DoorMonitor, DoorSensorConfig};
    /// use pinpad_hardware::gpio::GpioLevel;
    /// use pinpad_hardware::mock::MockGpio;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let mock = MockGpio::new();
    /// mock.set_input(25, GpioLevel::High);
    ///
    /// let (status, _task) = DoorMonitor::start(mock.into(), DoorSensorConfig::default()).await;
    /// assert_eq!(status.current(), DoorState::Open);
    /// # }
    /// ```
    pub async fn start(gpio: AnyGpio, config: DoorSensorConfig) -> (DoorStatus, JoinHandle<()>) {
        let initial = match read_state(&gpio, &config).await {
            Some(state) => state,
            None => DoorState::Closed,
        };
        info!("Door is {}", initial);

        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(poll(gpio, config, tx));
        (DoorStatus { rx }, task)
    }
}

async fn read_state(gpio: &AnyGpio, config: &DoorSensorConfig) -> Option<DoorState> {
    match gpio.read(config.pin).await {
        Ok(level) => Some(DoorState::from_open(level == config.open_level)),
        Err(e) => {
            warn!("Could not read door contact: {}", e);
            None
        }
    }
}

async fn poll(gpio: AnyGpio, config: DoorSensorConfig, tx: watch::Sender<DoorState>) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and the first reading is already published
    ticker.tick().await;

    while !tx.is_closed() {
        ticker.tick().await;
        let Some(state) = read_state(&gpio, &config).await else {
            continue;
        };

        let changed = tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
        if changed {
            info!("Door is now {}", state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGpio;

    #[tokio::test(start_paused = true)]
    async fn test_first_reading_is_published() {
        let mock = MockGpio::new();
        mock.set_input(25, GpioLevel::Low);

        let (status, _task) = DoorMonitor::start(mock.into(), DoorSensorConfig::default()).await;
        assert_eq!(status.current(), DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_first_read_defaults_to_closed() {
        let mock = MockGpio::new();
        mock.fail_pin(25);

        let (status, _task) = DoorMonitor::start(mock.into(), DoorSensorConfig::default()).await;
        assert_eq!(status.current(), DoorState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_are_published() {
        let mock = MockGpio::new();
        mock.set_input(25, GpioLevel::Low);
        let (mut status, _task) =
            DoorMonitor::start(mock.clone().into(), DoorSensorConfig::default()).await;

        mock.set_input(25, GpioLevel::High);
        assert_eq!(status.changed().await, Some(DoorState::Open));

        mock.set_input(25, GpioLevel::Low);
        assert_eq!(status.changed().await, Some(DoorState::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_reading_is_not_a_change() {
        let mock = MockGpio::new();
        mock.set_input(25, GpioLevel::Low);
        let (mut status, _task) = DoorMonitor::start(mock.into(), DoorSensorConfig::default()).await;

        let waited = tokio::time::timeout(Duration::from_secs(2), status.changed()).await;
        assert!(waited.is_err());
    }

    #[test]
    fn test_fixed_status() {
        let status = DoorStatus::fixed(DoorState::Open);
        assert_eq!(status.current(), DoorState::Open);
    }
}
