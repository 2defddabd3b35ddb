// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Saved preferences for the spiview simulator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key under which [`SimPrefs`] are stored.
pub const PREFS_KEY: &str = "sim_prefs";

/// Which producer signal closes a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerPref {
    /// The instance carrying the last-in-frame flag.
    #[default]
    LastInstance,
    /// The explicit frame-end command.
    FrameEnd,
}

/// Transport and decoding preferences.
///
/// Missing fields in a stored blob take their defaults, so older files keep
/// loading after fields are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimPrefs {
    /// Serial device last used.
    pub serial: Option<String>,
    /// Line rate the device is expected to run at. Informational: the
    /// device is opened as-is and its line settings are configured externally.
    pub baud: u32,
    /// Longest single transport wait, in milliseconds.
    pub read_timeout_ms: u64,
    /// Bytes requested per read.
    pub chunk: usize,
    /// Framing buffer cap in bytes.
    pub max_buffer: usize,
    /// Frame trigger convention.
    pub trigger: TriggerPref,
}

impl Default for SimPrefs {
    fn default() -> Self {
        Self {
            serial: None,
            baud: 115_200,
            read_timeout_ms: 100,
            chunk: 64,
            max_buffer: 64 * 1024,
            trigger: TriggerPref::LastInstance,
        }
    }
}

impl SimPrefs {
    /// Read timeout as a duration.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reject values the reader cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baud == 0 {
            return Err(invalid("baud", "must be positive"));
        }
        if !(1..=60_000).contains(&self.read_timeout_ms) {
            return Err(invalid("read_timeout_ms", "must be between 1 and 60000"));
        }
        if self.chunk == 0 {
            return Err(invalid("chunk", "must be positive"));
        }
        if self.max_buffer < self.chunk {
            return Err(invalid("max_buffer", "must hold at least one chunk"));
        }
        Ok(())
    }

    /// Stored prefs, or defaults when none were saved.
    pub fn load<S: ConfigStore>(config: &ConfigService<S>) -> Result<Self, ConfigError> {
        let prefs = config.load::<Self>(PREFS_KEY)?.unwrap_or_default();
        prefs.validate()?;
        Ok(prefs)
    }

    /// Persist after validating.
    pub fn save<S: ConfigStore>(&self, config: &ConfigService<S>) -> Result<(), ConfigError> {
        self.validate()?;
        config.save(PREFS_KEY, self)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_owned(),
    }
}
