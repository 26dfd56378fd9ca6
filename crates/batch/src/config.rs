// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Batching processor configuration.

use crate::error::ConfigError;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default flush threshold, matching the teacher processor's Go-parity
/// default.
pub const DEFAULT_SEND_BATCH_SIZE: usize = 8192;

/// Default idle-flush timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(200);

/// Batching processor configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Flush the current batch once it holds at least this many items.
    pub send_batch_size: Option<NonZeroUsize>,
    /// Hard cap on items per export; an over-threshold batch is split,
    /// leaving the remainder in the accumulator.
    pub send_batch_max_size: Option<NonZeroUsize>,
    /// Idle-flush deadline, reset after every flush. `None` disables the
    /// timer trigger entirely.
    #[serde(with = "humantime_serde::option")]
    pub timeout: Option<Duration>,
    /// When true, `consume_*` callers block on a per-call waiter until their
    /// data has been exported (or the export failed). When false,
    /// `consume_*` returns as soon as the data is enqueued.
    pub back_pressure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_batch_size: NonZeroUsize::new(DEFAULT_SEND_BATCH_SIZE),
            send_batch_max_size: None,
            timeout: Some(DEFAULT_TIMEOUT),
            back_pressure: false,
        }
    }
}

impl Config {
    /// Validates this configuration, returning the effective flush
    /// threshold (the smaller of the two configured sizes).
    pub fn validate(&self) -> Result<NonZeroUsize, ConfigError> {
        let lower_limit = self
            .send_batch_size
            .or(self.send_batch_max_size)
            .ok_or(ConfigError::NoThreshold)?;

        if let (Some(max), Some(size)) = (self.send_batch_max_size, self.send_batch_size) {
            if max < size {
                return Err(ConfigError::MaxBelowSize {
                    max: max.get(),
                    size: size.get(),
                });
            }
        }

        Ok(lower_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = Config::default();
        assert_eq!(cfg.validate().unwrap().get(), DEFAULT_SEND_BATCH_SIZE);
    }

    #[test]
    fn neither_size_set_is_rejected() {
        let cfg = Config {
            send_batch_size: None,
            send_batch_max_size: None,
            timeout: None,
            back_pressure: false,
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::NoThreshold)));
    }

    #[test]
    fn max_below_size_is_rejected() {
        let cfg = Config {
            send_batch_size: NonZeroUsize::new(100),
            send_batch_max_size: NonZeroUsize::new(10),
            timeout: None,
            back_pressure: false,
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MaxBelowSize { max: 10, size: 100 })
        ));
    }

    #[test]
    fn deserializes_humantime_timeout() {
        let json = serde_json::json!({ "timeout": "500ms", "send_batch_size": 100 });
        let cfg: Config = serde_json::from_value(json).unwrap();
        assert_eq!(cfg.timeout, Some(Duration::from_millis(500)));
        assert_eq!(cfg.send_batch_size.unwrap().get(), 100);
    }
}
