//! TOML configuration for the `pinpad` binary.
//!
//! Every key is optional; an empty file yields the built-in defaults.
//!
//! ```toml
//! [serial]
//! device = "/dev/ttyAMA0"
//!
//! [sync]
//! pin_url = "http://infra.rzl/BenutzerDB/pins/haupttuer"
//! pin_path = "/perm/pins.json"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use pinpad_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_CONTROL_SOCKET, DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_PIN_PATH,
    DEFAULT_PIN_URL, DEFAULT_SERIAL_DEVICE, DEFAULT_STATUS_RESTORE_DELAY_MS,
    DEFAULT_SYNC_FAILURE_THRESHOLD, DEFAULT_SYNC_INTERVAL_SECS, MAX_CONTROL_LINE,
};
use pinpad_hardware::sysfs::DEFAULT_SYSFS_BASE;
use pinpad_hardware::{ActuatorConfig, DEFAULT_QUEUE_CAPACITY, DoorSensorConfig};
use pinpad_keypad::ValidatorConfig;
use pinpad_link::{LinkConfig, SerialConfig};
use pinpad_network::ControlSocketConfig;
use pinpad_storage::SyncConfig;
use serde::Deserialize;

use crate::logging::LogFormat;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub serial: SerialSection,
    pub link: LinkSection,
    pub actuator: ActuatorSection,
    pub door: DoorSection,
    pub sync: SyncSection,
    pub keypad: KeypadSection,
    pub control: ControlSection,
    pub logging: LoggingSection,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would stall or spin the controller.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.link.heartbeat_interval_ms == 0 {
            bail!("link.heartbeat_interval_ms must be positive");
        }
        if self.door.poll_interval_ms == 0 {
            bail!("door.poll_interval_ms must be positive");
        }
        if self.sync.interval_secs == 0 {
            bail!("sync.interval_secs must be positive");
        }
        if self.sync.failure_threshold == 0 {
            bail!("sync.failure_threshold must be at least 1");
        }
        if self.actuator.queue_capacity == 0 {
            bail!("actuator.queue_capacity must be at least 1");
        }
        if self.control.max_line == 0 {
            bail!("control.max_line must be positive");
        }
        Ok(())
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            device: self.serial.device.clone(),
            baud_rate: self.serial.baud_rate,
        }
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            heartbeat_interval: Duration::from_millis(self.link.heartbeat_interval_ms),
        }
    }

    pub fn actuator_config(&self) -> ActuatorConfig {
        let mut config = ActuatorConfig::default();
        config.timings.open_timeout = Duration::from_millis(self.actuator.open_timeout_ms);
        config.timings.close_timeout = Duration::from_millis(self.actuator.close_timeout_ms);
        config
    }

    pub fn door_config(&self) -> DoorSensorConfig {
        DoorSensorConfig {
            pin: self.door.pin,
            poll_interval: Duration::from_millis(self.door.poll_interval_ms),
            ..DoorSensorConfig::default()
        }
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            url: self.sync.pin_url.clone(),
            interval: Duration::from_secs(self.sync.interval_secs),
            request_timeout: Duration::from_secs(self.sync.request_timeout_secs),
            max_payload: self.sync.max_payload_bytes,
            failure_threshold: self.sync.failure_threshold,
            ..SyncConfig::default()
        }
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            restore_delay: Duration::from_millis(self.keypad.restore_delay_ms),
        }
    }

    pub fn control_config(&self) -> ControlSocketConfig {
        ControlSocketConfig {
            path: self.control.socket.clone(),
            max_line: self.control.max_line,
        }
    }
}

/// The `[serial]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialSection {
    pub device: String,
    pub baud_rate: u32,
}

impl Default for SerialSection {
    fn default() -> Self {
        Self {
            device: DEFAULT_SERIAL_DEVICE.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// The `[link]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkSection {
    pub heartbeat_interval_ms: u64,
}

impl Default for LinkSection {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
        }
    }
}

/// The `[actuator]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ActuatorSection {
    /// Root of the sysfs GPIO tree.
    pub gpio_base: PathBuf,
    pub open_timeout_ms: u64,
    pub close_timeout_ms: u64,
    pub queue_capacity: usize,
}

impl Default for ActuatorSection {
    fn default() -> Self {
        let timings = ActuatorConfig::default().timings;
        Self {
            gpio_base: PathBuf::from(DEFAULT_SYSFS_BASE),
            open_timeout_ms: timings.open_timeout.as_millis() as u64,
            close_timeout_ms: timings.close_timeout.as_millis() as u64,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// The `[door]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DoorSection {
    pub pin: u32,
    pub poll_interval_ms: u64,
}

impl Default for DoorSection {
    fn default() -> Self {
        let door = DoorSensorConfig::default();
        Self {
            pin: door.pin,
            poll_interval_ms: door.poll_interval.as_millis() as u64,
        }
    }
}

/// The `[sync]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub pin_url: String,
    pub pin_path: PathBuf,
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
    pub max_payload_bytes: usize,

    /// Consecutive failures before the terminal starts warning.
    pub failure_threshold: u32,
}

impl Default for SyncSection {
    fn default() -> Self {
        let sync = SyncConfig::default();
        Self {
            pin_url: DEFAULT_PIN_URL.to_string(),
            pin_path: PathBuf::from(DEFAULT_PIN_PATH),
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            request_timeout_secs: sync.request_timeout.as_secs(),
            max_payload_bytes: sync.max_payload,
            failure_threshold: DEFAULT_SYNC_FAILURE_THRESHOLD,
        }
    }
}

/// The `[keypad]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KeypadSection {
    pub restore_delay_ms: u64,
}

impl Default for KeypadSection {
    fn default() -> Self {
        Self {
            restore_delay_ms: DEFAULT_STATUS_RESTORE_DELAY_MS,
        }
    }
}

/// The `[control]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlSection {
    pub enabled: bool,
    pub socket: PathBuf,
    pub max_line: usize,
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            enabled: true,
            socket: PathBuf::from(DEFAULT_CONTROL_SOCKET),
            max_line: MAX_CONTROL_LINE,
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}
