//! The datalogger's SD card.
//!
//! The firmware logs every record locally before sending it, so free space
//! shrinks a little each tick. Only the two figures the firmware reports are
//! modelled: free megabytes and free percentage.

use serde::{Deserialize, Serialize};

/// Capacity of the simulated card.
pub const DEFAULT_SD_CAPACITY_MB: f64 = 2048.0;
/// Free space on the simulated card at startup.
pub const DEFAULT_SD_FREE_MB: f64 = 1060.0;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Free-space state of the SD card.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StorageCard {
    /// Total capacity, MB.
    pub capacity_mb: f64,
    /// Free space, MB. Never negative, never above capacity.
    pub free_mb: f64,
}

impl Default for StorageCard {
    fn default() -> Self {
        Self {
            capacity_mb: DEFAULT_SD_CAPACITY_MB,
            free_mb: DEFAULT_SD_FREE_MB,
        }
    }
}

impl StorageCard {
    /// Account for `bytes` written to the card.
    pub fn record(&mut self, bytes: u32) {
        self.free_mb = (self.free_mb - f64::from(bytes) / BYTES_PER_MB).clamp(0.0, self.capacity_mb);
    }

    /// Free space as a whole percentage of capacity, 0 for an empty card.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn free_percent(&self) -> u8 {
        if self.capacity_mb <= 0.0 {
            return 0;
        }
        // Clamped to 0..=100 first, so the cast cannot wrap.
        (self.free_mb / self.capacity_mb * 100.0).round().clamp(0.0, 100.0) as u8
    }
}
