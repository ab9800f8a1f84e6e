//! Runtime configuration of a strip.

use crate::encoder::min_refresh_period_ms;
use embassy_time::Duration;

/// Frame period of repeating animations (about 30 frames per second).
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_millis(33);

/// Bound on every wait for a transfer to complete.
pub const DEFAULT_FLAG_TIMEOUT: Duration = Duration::from_millis(50);

/// Static description of one strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripConfig {
    /// Number of LEDs on the strip.
    pub led_count: usize,
    /// Period of the frame timer.
    pub refresh_period: Duration,
    /// How long `start`, `stop` and `reset` wait for the completion event.
    pub flag_timeout: Duration,
}

impl StripConfig {
    pub const fn new(led_count: usize) -> Self {
        Self {
            led_count,
            refresh_period: DEFAULT_REFRESH_PERIOD,
            flag_timeout: DEFAULT_FLAG_TIMEOUT,
        }
    }

    pub const fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub const fn with_flag_timeout(mut self, timeout: Duration) -> Self {
        self.flag_timeout = timeout;
        self
    }

    /// Checks the configuration against a pixel buffer of `capacity` LEDs.
    ///
    /// The refresh period must leave room for a whole frame plus latch, and
    /// the flag timeout must too, or a healthy transfer would time out.
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if self.led_count == 0 {
            return Err(ConfigError::ZeroLedCount);
        }

        if self.led_count > capacity {
            return Err(ConfigError::LedCountExceedsCapacity {
                led_count: self.led_count,
                capacity,
            });
        }

        let minimum_ms = min_refresh_period_ms(self.led_count);

        let refresh_ms = self.refresh_period.as_millis();
        if refresh_ms < u64::from(minimum_ms) {
            return Err(ConfigError::RefreshPeriodTooShort {
                requested_ms: refresh_ms,
                minimum_ms,
            });
        }

        let timeout_ms = self.flag_timeout.as_millis();
        if timeout_ms < u64::from(minimum_ms) {
            return Err(ConfigError::FlagTimeoutTooShort {
                requested_ms: timeout_ms,
                minimum_ms,
            });
        }

        Ok(())
    }
}

/// Invalid [`StripConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    ZeroLedCount,
    LedCountExceedsCapacity { led_count: usize, capacity: usize },
    RefreshPeriodTooShort { requested_ms: u64, minimum_ms: u32 },
    FlagTimeoutTooShort { requested_ms: u64, minimum_ms: u32 },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::ZeroLedCount => write!(f, "strip must have at least one LED"),
            ConfigError::LedCountExceedsCapacity {
                led_count,
                capacity,
            } => write!(f, "{} LEDs exceed the buffer capacity of {}", led_count, capacity),
            ConfigError::RefreshPeriodTooShort {
                requested_ms,
                minimum_ms,
            } => write!(
                f,
                "refresh period of {} ms is shorter than one frame ({} ms)",
                requested_ms, minimum_ms
            ),
            ConfigError::FlagTimeoutTooShort {
                requested_ms,
                minimum_ms,
            } => write!(
                f,
                "flag timeout of {} ms is shorter than one frame ({} ms)",
                requested_ms, minimum_ms
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}
