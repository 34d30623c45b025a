//! # Run Configuration
//!
//! Loaded once at startup, from defaults, a TOML file, or the command
//! line. Validated before any worker thread exists.
//!
//! ```toml
//! thread_count = 3
//! cycle_count = 5
//! seed = 4282
//! work_unit_us = 5000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Default number of workers.
pub const DEFAULT_THREADS: usize = 3;

/// Default number of cycles per worker.
pub const DEFAULT_CYCLES: u64 = 5;

/// Default seed for the per-cycle draws.
pub const DEFAULT_SEED: u64 = 0x4282_2480;

/// Default length of one unit of simulated work, in microseconds.
pub const DEFAULT_WORK_UNIT_US: u64 = 5_000;

/// Configuration for a run.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Number of participating workers.
    pub thread_count: usize,
    /// Number of rendezvous rounds each worker performs.
    pub cycle_count: u64,
    /// Seed for the per-cycle random draws.
    pub seed: u64,
    /// Length of one unit of per-cycle local work, in microseconds.
    /// Zero disables the delay.
    pub work_unit_us: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            thread_count: DEFAULT_THREADS,
            cycle_count: DEFAULT_CYCLES,
            seed: DEFAULT_SEED,
            work_unit_us: DEFAULT_WORK_UNIT_US,
        }
    }
}

impl RunConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys,
    /// and the [`validate`](Self::validate) errors for bad values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, otherwise
    /// the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that the run can reach quorum at all.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroThreads`] or [`ConfigError::ZeroCycles`].
    pub fn validate(&self) -> ConfigResult<()> {
        if self.thread_count < 1 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.cycle_count < 1 {
            return Err(ConfigError::ZeroCycles);
        }
        Ok(())
    }

    /// Returns the work unit as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn work_unit(&self) -> Duration {
        Duration::from_micros(self.work_unit_us)
    }
}
