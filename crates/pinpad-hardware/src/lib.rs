//! GPIO hardware for the pinpad door controller.
//!
//! - [`gpio`]: the [`GpioBus`] trait and pin levels (inverted logic).
//! - [`sysfs`] and [`mock`]: bus backends, combined in [`devices::AnyGpio`].
//! - [`actuator`]: the sensor-gated motor sequence and its command queue.
//! - [`door`]: the door contact poller.
//!
//! # Examples
//!
//! ```no_run
//! use pinpad_core::ActuatorCommand;
//! use pinpad_hardware::{ActuatorConfig, ActuatorController, SysfsGpio};
//!
//! # async fn example() -> pinpad_hardware::Result<()> {
//! let controller = ActuatorController::new(SysfsGpio::default().into(), ActuatorConfig::default());
//! controller.initialize().await?;
//!
//! let (actuator, _worker) = controller.spawn(8);
//! let outcome = actuator.execute(ActuatorCommand::Open).await?;
//! println!("open: {outcome}");
//! # Ok(())
//! # }
//! ```

pub mod actuator;
pub mod devices;
pub mod door;
pub mod error;
pub mod gpio;
pub mod mock;
pub mod sysfs;

pub use actuator::{
    ActuatorConfig, ActuatorController, ActuatorHandle, ActuatorOutcome, ActuatorRequest,
    ActuatorTimings, DEFAULT_QUEUE_CAPACITY, MotorPins, SensorPins,
};
pub use devices::AnyGpio;
pub use door::{DoorMonitor, DoorSensorConfig, DoorStatus};
pub use error::{HardwareError, Result};
pub use gpio::{GpioBus, GpioDirection, GpioLevel};
pub use sysfs::SysfsGpio;
