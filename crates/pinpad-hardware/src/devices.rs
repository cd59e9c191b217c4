//! Enum wrapper for GPIO bus dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn GpioBus>` is
//! not an option. [`AnyGpio`] gives the controller and the door monitor one
//! concrete type that works with either backend.

use crate::error::Result;
use crate::gpio::{GpioBus, GpioDirection, GpioLevel};
use crate::mock::MockGpio;
use crate::sysfs::SysfsGpio;

/// Any supported GPIO backend.
///
/// # Examples
///
/// ```
/// use pinpad_hardware::devices::AnyGpio;
/// use pinpad_hardware::gpio::{GpioBus, GpioLevel};
/// use pinpad_hardware::mock::MockGpio;
///
/// # #[tokio::main]
/// # async fn main() -> pinpad_hardware::Result<()> {
/// let mock = MockGpio::new();
/// let gpio = AnyGpio::Mock(mock.clone());
///
/// gpio.write(22, GpioLevel::High).await?;
/// assert_eq!(mock.level(22), Some(GpioLevel::High));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyGpio {
    /// Kernel sysfs interface.
    Sysfs(SysfsGpio),

    /// In-memory bus for development and testing.
    Mock(MockGpio),
}

impl GpioBus for AnyGpio {
    async fn export(&self, pin: u32) -> Result<()> {
        match self {
            Self::Sysfs(bus) => bus.export(pin).await,
            Self::Mock(bus) => bus.export(pin).await,
        }
    }

    async fn set_direction(&self, pin: u32, direction: GpioDirection) -> Result<()> {
        match self {
            Self::Sysfs(bus) => bus.set_direction(pin, direction).await,
            Self::Mock(bus) => bus.set_direction(pin, direction).await,
        }
    }

    async fn write(&self, pin: u32, level: GpioLevel) -> Result<()> {
        match self {
            Self::Sysfs(bus) => bus.write(pin, level).await,
            Self::Mock(bus) => bus.write(pin, level).await,
        }
    }

    async fn read(&self, pin: u32) -> Result<GpioLevel> {
        match self {
            Self::Sysfs(bus) => bus.read(pin).await,
            Self::Mock(bus) => bus.read(pin).await,
        }
    }
}

impl From<SysfsGpio> for AnyGpio {
    fn from(bus: SysfsGpio) -> Self {
        Self::Sysfs(bus)
    }
}

impl From<MockGpio> for AnyGpio {
    fn from(bus: MockGpio) -> Self {
        Self::Mock(bus)
    }
}
