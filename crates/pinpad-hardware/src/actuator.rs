//! Motorized lock actuator.
//!
//! The lock turns the key cylinder with a drive motor that is mechanically
//! coupled to the cylinder only while a sequence runs, so the door can still
//! be opened with a physical key the rest of the time.
//!
//! # Sequence
//!
//! ```text
//! Idle ─> Driving ─> Coupling ─> AwaitingSensor ─> Decoupling ─> Idle
//!          drive on   couple       poll sensor       drive off
//!          50ms       100ms        until timeout     50ms, decouple 100ms
//! ```
//!
//! Commands are serialized through [`ActuatorHandle`]: one worker task owns
//! the [`ActuatorController`] and runs one sequence at a time.

use std::fmt;
use std::time::Duration;

use pinpad_core::{ActuatorCommand, ActuatorPhase};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, warn};

use crate::devices::AnyGpio;
use crate::error::{HardwareError, Result};
use crate::gpio::{GpioBus, GpioDirection, GpioLevel};

/// Default capacity of the command queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Pin triples driving the motors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotorPins {
    /// Drive motor turning towards unlocked.
    pub open_drive: [u32; 3],

    /// Drive motor turning towards locked.
    pub close_drive: [u32; 3],

    pub coupling: [u32; 3],

    pub decoupling: [u32; 3],
}

impl Default for MotorPins {
    fn default() -> Self {
        Self {
            open_drive: [1, 17, 4],
            close_drive: [21, 17, 4],
            coupling: [11, 9, 10],
            decoupling: [22, 9, 10],
        }
    }
}

impl MotorPins {
    fn drive(&self, command: ActuatorCommand) -> [u32; 3] {
        match command {
            ActuatorCommand::Open => self.open_drive,
            ActuatorCommand::Close => self.close_drive,
        }
    }

    /// Every motor pin, each listed once.
    fn all(&self) -> Vec<u32> {
        let mut pins = Vec::with_capacity(12);
        for pin in self
            .open_drive
            .iter()
            .chain(&self.close_drive)
            .chain(&self.coupling)
            .chain(&self.decoupling)
        {
            if !pins.contains(pin) {
                pins.push(*pin);
            }
        }
        pins
    }
}

/// Completion sensors. Both are active-low.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorPins {
    /// Reads low once the cylinder reached the unlocked position.
    pub unlocked: u32,

    /// Reads low once the cylinder reached the locked position.
    pub locked: u32,
}

impl Default for SensorPins {
    fn default() -> Self {
        Self {
            unlocked: 18,
            locked: 23,
        }
    }
}

impl SensorPins {
    fn target(&self, command: ActuatorCommand) -> u32 {
        match command {
            ActuatorCommand::Open => self.unlocked,
            ActuatorCommand::Close => self.locked,
        }
    }
}

/// Timing of one motor sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorTimings {
    /// Wait after starting or stopping the drive motor.
    pub drive_settle: Duration,

    /// Length of the coupling and decoupling pulses.
    pub coupling_pulse: Duration,

    pub sensor_poll: Duration,

    /// Wait after the sensor reported the target position.
    pub sensor_settle: Duration,

    pub open_timeout: Duration,

    pub close_timeout: Duration,
}

impl Default for ActuatorTimings {
    fn default() -> Self {
        Self {
            drive_settle: Duration::from_millis(50),
            coupling_pulse: Duration::from_millis(100),
            sensor_poll: Duration::from_millis(20),
            sensor_settle: Duration::from_millis(250),
            open_timeout: Duration::from_secs(3),
            close_timeout: Duration::from_secs(4),
        }
    }
}

impl ActuatorTimings {
    fn timeout(&self, command: ActuatorCommand) -> Duration {
        match command {
            ActuatorCommand::Open => self.open_timeout,
            ActuatorCommand::Close => self.close_timeout,
        }
    }
}

/// Configuration for the actuator controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuatorConfig {
    pub motors: MotorPins,

    pub sensors: SensorPins,

    /// Pins configured as outputs and driven inactive at startup.
    pub outputs: Vec<u32>,

    /// Pins configured as inputs at startup.
    pub inputs: Vec<u32>,

    pub timings: ActuatorTimings,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            motors: MotorPins::default(),
            sensors: SensorPins::default(),
            outputs: vec![11, 9, 10, 22, 21, 17, 4, 1],
            inputs: vec![18, 23, 24, 8, 7, 25],
            timings: ActuatorTimings::default(),
        }
    }
}

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorOutcome {
    /// The sensor already reported the target; no motor moved.
    AlreadyInPosition,

    /// The sensor reported the target during the sequence.
    Completed,

    /// The sensor never reported the target. The motor was still decoupled.
    SensorTimeout,
}

impl fmt::Display for ActuatorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInPosition => write!(f, "already in position"),
            Self::Completed => write!(f, "completed"),
            Self::SensorTimeout => write!(f, "sensor timeout"),
        }
    }
}

/// Drives the lock motors through GPIO.
#[derive(Debug)]
pub struct ActuatorController {
    gpio: AnyGpio,
    config: ActuatorConfig,
    phase: watch::Sender<ActuatorPhase>,
}

impl ActuatorController {
    pub fn new(gpio: AnyGpio, config: ActuatorConfig) -> Self {
        let (phase, _) = watch::channel(ActuatorPhase::Idle);
        Self {
            gpio,
            config,
            phase,
        }
    }

    /// Observe phase changes, for diagnostics.
    pub fn subscribe_phase(&self) -> watch::Receiver<ActuatorPhase> {
        self.phase.subscribe()
    }

    /// Export every pin, configure directions and release all outputs.
    ///
    /// # Errors
    ///
    /// Any GPIO failure here is an initialization failure.
    pub async fn initialize(&self) -> Result<()> {
        let pins = self.config.outputs.iter().chain(&self.config.inputs);
        for &pin in pins {
            self.gpio.export(pin).await?;
        }

        for &pin in &self.config.outputs {
            self.gpio.set_direction(pin, GpioDirection::Out).await?;
            self.gpio.write(pin, GpioLevel::INACTIVE).await?;
        }

        for &pin in &self.config.inputs {
            self.gpio.set_direction(pin, GpioDirection::In).await?;
        }

        info!(
            "Actuator initialized ({} outputs, {} inputs)",
            self.config.outputs.len(),
            self.config.inputs.len()
        );
        Ok(())
    }

    /// Run one command to completion.
    ///
    /// # Errors
    ///
    /// Returns the first GPIO error. Every motor pin is released before the
    /// error is returned, as far as the bus still allows.
    pub async fn execute(&self, command: ActuatorCommand) -> Result<ActuatorOutcome> {
        if self.target_reached(command).await? {
            return Ok(ActuatorOutcome::AlreadyInPosition);
        }

        let result = self.sequence(command).await;
        if result.is_err() {
            self.release_all().await;
        }
        self.phase.send_replace(ActuatorPhase::Idle);
        result
    }

    /// Hand the controller to a worker task and return the queue feeding it.
    pub fn spawn(self, capacity: usize) -> (ActuatorHandle, JoinHandle<()>) {
        let (handle, requests) = ActuatorHandle::channel(capacity);
        let task = tokio::spawn(self.serve(requests));
        (handle, task)
    }

    /// Process requests one at a time until every handle is dropped.
    pub async fn serve(self, mut requests: mpsc::Receiver<ActuatorRequest>) {
        while let Some(request) = requests.recv().await {
            info!("Executing {}", request.command);
            let result = self.execute(request.command).await;

            match &result {
                Ok(ActuatorOutcome::SensorTimeout) => {
                    warn!("{} finished without sensor confirmation", request.command)
                }
                Ok(outcome) => info!("{} {}", request.command, outcome),
                Err(e) => error!("{} failed: {}", request.command, e),
            }

            if let Some(reply) = request.reply {
                let _ = reply.send(result);
            }
        }
        debug!("Actuator queue closed");
    }

    async fn target_reached(&self, command: ActuatorCommand) -> Result<bool> {
        let pin = self.config.sensors.target(command);
        Ok(self.gpio.read(pin).await? == GpioLevel::ACTIVE)
    }

    async fn sequence(&self, command: ActuatorCommand) -> Result<ActuatorOutcome> {
        let motors = &self.config.motors;
        let timings = &self.config.timings;
        let drive = motors.drive(command);

        self.phase.send_replace(ActuatorPhase::Driving);
        self.set_pins(&drive, GpioLevel::ACTIVE).await?;
        sleep(timings.drive_settle).await;

        self.phase.send_replace(ActuatorPhase::Coupling);
        self.pulse(&motors.coupling).await?;

        self.phase.send_replace(ActuatorPhase::AwaitingSensor);
        let reached = self.await_target(command).await?;
        if reached {
            sleep(timings.sensor_settle).await;
        }

        self.phase.send_replace(ActuatorPhase::Decoupling);
        self.set_pins(&drive, GpioLevel::INACTIVE).await?;
        sleep(timings.drive_settle).await;
        self.pulse(&motors.decoupling).await?;

        Ok(if reached {
            ActuatorOutcome::Completed
        } else {
            ActuatorOutcome::SensorTimeout
        })
    }

    async fn await_target(&self, command: ActuatorCommand) -> Result<bool> {
        let deadline = Instant::now() + self.config.timings.timeout(command);
        loop {
            if self.target_reached(command).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(self.config.timings.sensor_poll).await;
        }
    }

    async fn pulse(&self, pins: &[u32]) -> Result<()> {
        self.set_pins(pins, GpioLevel::ACTIVE).await?;
        sleep(self.config.timings.coupling_pulse).await;
        self.set_pins(pins, GpioLevel::INACTIVE).await
    }

    async fn set_pins(&self, pins: &[u32], level: GpioLevel) -> Result<()> {
        for &pin in pins {
            self.gpio.write(pin, level).await?;
        }
        Ok(())
    }

    async fn release_all(&self) {
        for pin in self.config.motors.all() {
            if let Err(e) = self.gpio.write(pin, GpioLevel::INACTIVE).await {
                warn!("Could not release GPIO {}: {}", pin, e);
            }
        }
    }
}

/// One queued command.
#[derive(Debug)]
pub struct ActuatorRequest {
    pub command: ActuatorCommand,

    /// Receives the outcome, if the sender waits for it.
    pub reply: Option<oneshot::Sender<Result<ActuatorOutcome>>>,
}

/// Cloneable entry point to the actuator worker.
#[derive(Debug, Clone)]
pub struct ActuatorHandle {
    tx: mpsc::Sender<ActuatorRequest>,
}

impl ActuatorHandle {
    /// Create a handle and the request queue a worker consumes.
    ///
    /// # Examples
    ///
    /// ```
    /// use pinpad_core::ActuatorCommand;
    /// use pinpad_hardware::ActuatorHandle;
    ///
    /// # #[tokio::main]
    /// # async fn main() -> pinpad_hardware::Result<()> {
    /// let (handle, mut requests) = ActuatorHandle::channel(4);
    /// handle.submit(ActuatorCommand::Close).await?;
    ///
    /// assert_eq!(requests.recv().await.unwrap().command, ActuatorCommand::Close);
    /// # Ok(())
    /// # }
    /// ```
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ActuatorRequest>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Queue a command without waiting for it to run.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::ActuatorUnavailable`] if the worker is gone.
    pub async fn submit(&self, command: ActuatorCommand) -> Result<()> {
        self.tx
            .send(ActuatorRequest {
                command,
                reply: None,
            })
            .await
            .map_err(|_| HardwareError::ActuatorUnavailable)
    }

    /// Queue a command and wait for its outcome.
    pub async fn execute(&self, command: ActuatorCommand) -> Result<ActuatorOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.tx
            .send(ActuatorRequest {
                command,
                reply: Some(reply),
            })
            .await
            .map_err(|_| HardwareError::ActuatorUnavailable)?;
        outcome.await.map_err(|_| HardwareError::ActuatorUnavailable)?
    }
}
