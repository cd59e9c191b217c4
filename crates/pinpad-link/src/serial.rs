//! Opening the terminal's serial device.

use std::time::Duration;

use pinpad_core::constants::{DEFAULT_BAUD_RATE, DEFAULT_SERIAL_DEVICE};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::info;

use crate::engine::{LinkConfig, LinkHandle, spawn};
use crate::error::{LinkError, Result};

/// Read timeout of the serial port. An idle line only wakes the reader
/// thread this often.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyAMA0`.
    pub device: String,

    /// Baud rate. The line is always 8N1 without flow control.
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_SERIAL_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Open the serial device in raw mode and start the link engine on it.
///
/// # Errors
///
/// Returns [`LinkError::Open`] if the device cannot be opened, configured or
/// duplicated for the writer thread.
pub fn open(serial: &SerialConfig, config: LinkConfig) -> Result<LinkHandle> {
    info!("Opening {} at {} baud", serial.device, serial.baud_rate);

    let reader = serialport::new(&serial.device, serial.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| LinkError::open(&serial.device, e))?;

    let writer = reader
        .try_clone()
        .map_err(|e| LinkError::open(&serial.device, e))?;

    spawn(reader, writer, config)
}
