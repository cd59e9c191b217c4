//! GPIO bus abstraction.
//!
//! The lock hardware is wired with inverted logic: driving a line
//! [`GpioLevel::Low`] energizes it.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).

#![allow(async_fn_in_trait)]

use std::fmt;

use crate::error::Result;

/// Logic level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioLevel {
    Low,
    High,
}

impl GpioLevel {
    /// Level that energizes an output.
    pub const ACTIVE: Self = Self::Low;

    /// Level that releases an output.
    pub const INACTIVE: Self = Self::High;

    /// Digit written to a sysfs `value` file.
    pub fn as_digit(&self) -> char {
        match self {
            Self::Low => '0',
            Self::High => '1',
        }
    }

    /// Parse the content of a sysfs `value` file.
    pub fn from_digit(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(Self::Low),
            "1" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for GpioLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_digit())
    }
}

/// Direction of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpioDirection {
    In,
    Out,
}

impl GpioDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Access to numbered GPIO lines.
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
/// gpio.write(17, GpioLevel::ACTIVE).await?;
/// assert_eq!(gpio.read(17).await?, GpioLevel::Low);
/// # Ok(())
/// # }
/// ```
pub trait GpioBus: Send + Sync {
    /// Make a pin available. Exporting an already exported pin succeeds.
    async fn export(&self, pin: u32) -> Result<()>;

    async fn set_direction(&self, pin: u32, direction: GpioDirection) -> Result<()>;

    async fn write(&self, pin: u32, level: GpioLevel) -> Result<()>;

    async fn read(&self, pin: u32) -> Result<GpioLevel>;
}
