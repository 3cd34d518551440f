//! Persistence of the engine-hours counter.
//!
//! The only state that survives a restart is the hour meter, stored as a
//! one-field JSON object:
//!
//! ```json
//! {"engine_hours": 301.25}
//! ```
//!
//! Reading is forgiving: a missing, unreadable, or nonsensical file yields
//! the caller's default and a log line, never an error. Writing goes to a
//! sibling `.tmp` file that is then renamed over the counter file, so a
//! crash mid-write leaves the previous reading intact.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Errors from reading or writing the counter file.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem failure.
    #[error("counter file I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The file is not the expected JSON shape.
    #[error("counter file is not valid JSON: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// The stored value is negative, NaN, or infinite.
    #[error("counter value {value} is not a valid hour meter reading")]
    InvalidValue {
        /// The offending value.
        value: f64,
    },
}

/// On-disk shape of the counter file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct CounterFile {
    engine_hours: f64,
}

/// Reads and writes the engine-hours counter file.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the counter file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored engine hours.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read (including when
    /// it does not exist), [`StoreError::Json`] if it is malformed, and
    /// [`StoreError::InvalidValue`] for a negative or non-finite reading.
    pub fn load(&self) -> Result<f64, StoreError> {
        let contents = std::fs::read_to_string(&self.path)?;
        let file: CounterFile = serde_json::from_str(&contents)?;
        if !file.engine_hours.is_finite() || file.engine_hours < 0.0 {
            return Err(StoreError::InvalidValue {
                value: file.engine_hours,
            });
        }
        Ok(file.engine_hours)
    }

    /// Read the stored engine hours, falling back to `default` on any error.
    pub fn load_or(&self, default: f64) -> f64 {
        match self.load() {
            Ok(hours) => {
                info!(path = %self.path.display(), engine_hours = hours, "Restored engine hours");
                hours
            }
            Err(StoreError::Io { source }) if source.kind() == ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    default,
                    "No counter file, starting from default engine hours"
                );
                default
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    default,
                    "Counter file unusable, starting from default engine hours"
                );
                default
            }
        }
    }

    /// Replace the counter file with `engine_hours`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be written, or
    /// [`StoreError::Json`] if `engine_hours` is not representable in JSON.
    /// On error the previous counter file is left untouched.
    pub fn save(&self, engine_hours: f64) -> Result<(), StoreError> {
        let contents = serde_json::to_string(&CounterFile { engine_hours })?;
        let staging = self.staging_path();
        std::fs::write(&staging, contents)?;
        std::fs::rename(&staging, &self.path)?;
        debug!(path = %self.path.display(), engine_hours, "Engine hours persisted");
        Ok(())
    }

    /// Sibling file the next reading is written to before the rename.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("engine_state"), ToOwned::to_owned);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
