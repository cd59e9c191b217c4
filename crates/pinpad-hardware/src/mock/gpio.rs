//! In-memory GPIO bus.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{HardwareError, Result};
use crate::gpio::{GpioBus, GpioDirection, GpioLevel};

/// Simulated GPIO bus.
///
/// Clones share state, so a test can keep one clone to inspect what the
/// controller under test wrote and to move sensor inputs.
///
/// # Examples
///
/// ```
/// use pinpad_hardware::gpio::{GpioBus, GpioLevel};
/// use pinpad_hardware::mock::MockGpio;
///
/// # #[tokio::main]
/// # async fn main() -> pinpad_hardware::Result<()> {
/// let gpio = MockGpio::new();
/// // Engaging pin 1 moves sensor 18 to "reached"
/// gpio.on_write(1, GpioLevel::Low, 18, GpioLevel::Low);
///
/// gpio.write(1, GpioLevel::Low).await?;
/// assert_eq!(gpio.read(18).await?, GpioLevel::Low);
/// assert_eq!(gpio.writes(), vec![(1, GpioLevel::Low)]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockGpio {
    state: Arc<Mutex<MockGpioState>>,
}

#[derive(Debug, Default)]
struct MockGpioState {
    exported: HashSet<u32>,
    directions: HashMap<u32, GpioDirection>,
    levels: HashMap<u32, GpioLevel>,
    writes: Vec<(u32, GpioLevel)>,
    reactions: Vec<Reaction>,
    failing: HashSet<u32>,
}

#[derive(Debug, Clone, Copy)]
struct Reaction {
    pin: u32,
    level: GpioLevel,
    input: u32,
    input_level: GpioLevel,
}

impl MockGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level an input pin reports.
    pub fn set_input(&self, pin: u32, level: GpioLevel) {
        self.lock().levels.insert(pin, level);
    }

    /// When `pin` is written with `level`, move `input` to `input_level`.
    pub fn on_write(&self, pin: u32, level: GpioLevel, input: u32, input_level: GpioLevel) {
        self.lock().reactions.push(Reaction {
            pin,
            level,
            input,
            input_level,
        });
    }

    /// Make every access to `pin` fail with an I/O error.
    pub fn fail_pin(&self, pin: u32) {
        self.lock().failing.insert(pin);
    }

    /// Current level of a pin, if it was ever written or set.
    pub fn level(&self, pin: u32) -> Option<GpioLevel> {
        self.lock().levels.get(&pin).copied()
    }

    pub fn direction(&self, pin: u32) -> Option<GpioDirection> {
        self.lock().directions.get(&pin).copied()
    }

    pub fn is_exported(&self, pin: u32) -> bool {
        self.lock().exported.contains(&pin)
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(u32, GpioLevel)> {
        self.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    fn lock(&self) -> MutexGuard<'_, MockGpioState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MockGpioState {
    fn check(&self, pin: u32, operation: &'static str) -> Result<()> {
        if self.failing.contains(&pin) {
            return Err(HardwareError::gpio(
                pin,
                operation,
                io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }
}

impl GpioBus for MockGpio {
    async fn export(&self, pin: u32) -> Result<()> {
        let mut state = self.lock();
        state.check(pin, "export")?;
        state.exported.insert(pin);
        Ok(())
    }

    async fn set_direction(&self, pin: u32, direction: GpioDirection) -> Result<()> {
        let mut state = self.lock();
        state.check(pin, "set direction")?;
        state.directions.insert(pin, direction);
        Ok(())
    }

    async fn write(&self, pin: u32, level: GpioLevel) -> Result<()> {
        let mut state = self.lock();
        state.check(pin, "write")?;
        state.levels.insert(pin, level);
        state.writes.push((pin, level));

        let triggered: Vec<Reaction> = state
            .reactions
            .iter()
            .filter(|r| r.pin == pin && r.level == level)
            .copied()
            .collect();
        for reaction in triggered {
            state.levels.insert(reaction.input, reaction.input_level);
        }
        Ok(())
    }

    async fn read(&self, pin: u32) -> Result<GpioLevel> {
        let state = self.lock();
        state.check(pin, "read")?;
        // Unconnected inputs float high
        Ok(state.levels.get(&pin).copied().unwrap_or(GpioLevel::High))
    }
}
