//! Configuration loading and typed config structures for the datalogger.
//!
//! Every tunable has a fixed default matching the deployed AP550 dummy
//! logger: the public EMQX broker, a 20 second interval, and a 09:00-18:00
//! IST working window. If `datalogger-config.yaml` is present in the working
//! directory its values override the defaults key by key. There is no
//! environment-variable layer.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, NaiveTime};
use serde::Deserialize;

use crate::schedule::{ScheduleError, WorkingHours};

/// Seconds per minute, for converting the configured UTC offset.
const SECONDS_PER_MINUTE: i32 = 60;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The working-hours window or timezone is unusable.
    #[error("invalid schedule: {source}")]
    Schedule {
        /// The underlying schedule error.
        #[from]
        source: ScheduleError,
    },

    /// A value parsed but is out of range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level datalogger configuration.
///
/// Mirrors the structure of `datalogger-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DataloggerConfig {
    /// MQTT broker and topic.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Publish interval, working window, and timezone.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Identity fields copied into every payload.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Location of the engine-hours counter file.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl DataloggerConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or a
    /// validation error from [`DataloggerConfig::validate`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or a
    /// validation error from [`DataloggerConfig::validate`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise return the defaults.
    ///
    /// # Errors
    ///
    /// Same as [`DataloggerConfig::from_file`] when the file exists.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::info!(path = %path.display(), "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero interval or empty topic,
    /// and [`ConfigError::Schedule`] for an inverted window or an
    /// out-of-range UTC offset.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.publish_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "schedule.publish_interval_secs must be at least 1".to_owned(),
            });
        }
        if self.broker.topic.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "broker.topic must not be empty".to_owned(),
            });
        }
        if self.broker.keep_alive_secs == 0 {
            return Err(ConfigError::Invalid {
                reason: "broker.keep_alive_secs must be at least 1".to_owned(),
            });
        }
        self.schedule.working_hours()?;
        self.schedule.utc_offset()?;
        Ok(())
    }
}

/// MQTT connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrokerConfig {
    /// Broker hostname.
    #[serde(default = "default_broker_host")]
    pub host: String,

    /// Broker TCP port.
    #[serde(default = "default_broker_port")]
    pub port: u16,

    /// Topic every payload is published to.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// MQTT client identifier.
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// MQTT keep-alive in seconds.
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl BrokerConfig {
    /// Keep-alive as a [`Duration`].
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            topic: default_topic(),
            client_id: default_client_id(),
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

/// Timing of the publish loop.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds between ticks. Also the simulated tick duration.
    #[serde(default = "default_publish_interval_secs")]
    pub publish_interval_secs: u64,

    /// Start of the daily working window (inclusive), local time.
    #[serde(default = "default_window_start")]
    pub window_start: NaiveTime,

    /// End of the daily working window (inclusive), local time.
    #[serde(default = "default_window_end")]
    pub window_end: NaiveTime,

    /// Local offset from UTC in minutes (IST is +330).
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Timezone name written into every payload.
    #[serde(default = "default_timezone_label")]
    pub timezone_label: String,
}

impl ScheduleConfig {
    /// Publish interval as a [`Duration`].
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.publish_interval_secs)
    }

    /// Build the working-hours gate from the configured window.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvertedWindow`] if the start is after the end.
    pub fn working_hours(&self) -> Result<WorkingHours, ScheduleError> {
        WorkingHours::new(self.window_start, self.window_end)
    }

    /// Resolve the configured offset.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidOffset`] if the offset is not strictly
    /// within one day of UTC.
    pub fn utc_offset(&self) -> Result<FixedOffset, ScheduleError> {
        self.utc_offset_minutes
            .checked_mul(SECONDS_PER_MINUTE)
            .and_then(FixedOffset::east_opt)
            .ok_or(ScheduleError::InvalidOffset {
                minutes: self.utc_offset_minutes,
            })
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            publish_interval_secs: default_publish_interval_secs(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            utc_offset_minutes: default_utc_offset_minutes(),
            timezone_label: default_timezone_label(),
        }
    }
}

/// Static identity of the simulated datalogger and machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceConfig {
    /// Datalogger identifier.
    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Machine family.
    #[serde(default = "default_machine_type")]
    pub machine_type: String,

    /// Machine model.
    #[serde(default = "default_machine_model")]
    pub machine_model: String,

    /// Datalogger firmware version.
    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,

    /// Machine software version.
    #[serde(default = "default_machine_version")]
    pub machine_version: String,

    /// Vehicle identification number.
    #[serde(default = "default_vin")]
    pub vin: String,

    /// Installation latitude.
    #[serde(default = "default_latitude")]
    pub latitude: String,

    /// Installation longitude.
    #[serde(default = "default_longitude")]
    pub longitude: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            device_id: default_device_id(),
            machine_type: default_machine_type(),
            machine_model: default_machine_model(),
            firmware_version: default_firmware_version(),
            machine_version: default_machine_version(),
            vin: default_vin(),
            latitude: default_latitude(),
            longitude: default_longitude(),
        }
    }
}

/// Where the engine-hours counter lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON counter file.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_broker_host() -> String {
    "broker.emqx.io".to_owned()
}

const fn default_broker_port() -> u16 {
    1883
}

fn default_topic() -> String {
    "Datalogger/AP550/Data".to_owned()
}

fn default_client_id() -> String {
    "rust_dummy_datalogger".to_owned()
}

const fn default_keep_alive_secs() -> u64 {
    60
}

const fn default_publish_interval_secs() -> u64 {
    20
}

fn default_window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN)
}

const fn default_utc_offset_minutes() -> i32 {
    330
}

fn default_timezone_label() -> String {
    "Asia/Kolkata".to_owned()
}

fn default_device_id() -> String {
    "AP550".to_owned()
}

fn default_machine_type() -> String {
    "CEV_V".to_owned()
}

fn default_machine_model() -> String {
    "AP550".to_owned()
}

fn default_firmware_version() -> String {
    "0.0.0.1".to_owned()
}

fn default_machine_version() -> String {
    "0.0.1.0".to_owned()
}

fn default_vin() -> String {
    "abc123456dv789532".to_owned()
}

fn default_latitude() -> String {
    "23.0225".to_owned()
}

fn default_longitude() -> String {
    "72.5714".to_owned()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("engine_state.json")
}
