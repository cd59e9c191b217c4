//! GPIO access through the kernel's sysfs interface.
//!
//! ```text
//! <base>/export               write "<pin>\n"
//! <base>/gpio<pin>/direction  write "in\n" or "out\n"
//! <base>/gpio<pin>/value      write or read "0\n" / "1\n"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, trace};

use crate::error::{HardwareError, Result};
use crate::gpio::{GpioBus, GpioDirection, GpioLevel};

/// Default sysfs GPIO root.
pub const DEFAULT_SYSFS_BASE: &str = "/sys/class/gpio";

/// GPIO bus backed by sysfs files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsGpio {
    base: PathBuf,
}

impl SysfsGpio {
    /// Create a bus rooted at `base` (normally [`DEFAULT_SYSFS_BASE`]).
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn pin_file(&self, pin: u32, name: &str) -> PathBuf {
        self.base.join(format!("gpio{pin}")).join(name)
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_BASE)
    }
}

impl GpioBus for SysfsGpio {
    async fn export(&self, pin: u32) -> Result<()> {
        match fs::write(self.base.join("export"), format!("{pin}\n")).await {
            Ok(()) => {
                debug!("Exported GPIO {}", pin);
                Ok(())
            }
            // The kernel answers EBUSY for pins that are already exported
            Err(e) if e.kind() == io::ErrorKind::ResourceBusy => {
                debug!("GPIO {} already exported", pin);
                Ok(())
            }
            Err(e) => Err(HardwareError::gpio(pin, "export", e)),
        }
    }

    async fn set_direction(&self, pin: u32, direction: GpioDirection) -> Result<()> {
        fs::write(
            self.pin_file(pin, "direction"),
            format!("{}\n", direction.as_str()),
        )
        .await
        .map_err(|e| HardwareError::gpio(pin, "set direction", e))
    }

    async fn write(&self, pin: u32, level: GpioLevel) -> Result<()> {
        trace!("GPIO {} <- {}", pin, level);
        fs::write(self.pin_file(pin, "value"), format!("{}\n", level.as_digit()))
            .await
            .map_err(|e| HardwareError::gpio(pin, "write", e))
    }

    async fn read(&self, pin: u32) -> Result<GpioLevel> {
        let value = fs::read_to_string(self.pin_file(pin, "value"))
            .await
            .map_err(|e| HardwareError::gpio(pin, "read", e))?;
        GpioLevel::from_digit(&value).ok_or_else(|| HardwareError::invalid_value(pin, value.trim()))
    }
}
