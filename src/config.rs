use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StatusBarError;

/// Glyphs and width of the textual progress bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarStyle {
    pub complete: char,
    pub incomplete: char,
    pub length: usize,
}

impl Default for BarStyle {
    fn default() -> Self {
        Self {
            complete: '=',
            incomplete: ' ',
            length: 20,
        }
    }
}

/// Options for a [`crate::StatusBar`].
///
/// Every field has a default, so the struct can be embedded in a larger
/// configuration file and only `total` needs to be supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBarOptions {
    /// Size of the transfer in bytes. Required; `Some(0)` is a valid empty transfer.
    pub total: Option<u64>,
    /// Milliseconds between periodic renders, `0` disables them.
    pub frequency_ms: u64,
    /// Quiet elapsed-time ticks before the transfer is considered hung.
    pub stall_ticks: u32,
    /// Weight of the newest sample in the speed average.
    pub smoothing: f64,
    pub progress_bar: BarStyle,
}

impl Default for StatusBarOptions {
    fn default() -> Self {
        Self {
            total: None,
            frequency_ms: 200,
            stall_ticks: 3,
            smoothing: 0.005,
            progress_bar: BarStyle::default(),
        }
    }
}

impl StatusBarOptions {
    pub fn with_total(total: u64) -> Self {
        Self {
            total: Some(total),
            ..Default::default()
        }
    }

    pub fn render_period(&self) -> Option<Duration> {
        match self.frequency_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), StatusBarError> {
        if self.progress_bar.length == 0 {
            return Err(StatusBarError::invalid("progress bar length must be positive"));
        }
        Ok(())
    }
}
