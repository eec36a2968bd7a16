use std::time::Duration;

use lockstep_time::EmuDuration;

use crate::{RealTimeError, Result};

/// Pacing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealTimeConfig {
    /// Emulated time between two pacing samples.
    pub sync_interval: EmuDuration,
    /// Largest host-time debt the emulation tries to win back. Anything beyond is forgiven.
    pub max_catch_up_time: Duration,
    /// Upper bound, in percent of the selected speed, while catching up.
    pub max_catch_up_factor: u32,
}

impl RealTimeConfig {
    pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_millis(50);
    pub const DEFAULT_MAX_CATCH_UP_TIME: Duration = Duration::from_millis(2000);
    pub const DEFAULT_MAX_CATCH_UP_FACTOR: u32 = 105;

    pub fn validate(&self) -> Result<()> {
        if self.sync_interval.is_zero() {
            return Err(RealTimeError::InvalidConfig("sync_interval must be non-zero"));
        }
        if self.max_catch_up_factor < 100 {
            return Err(RealTimeError::InvalidConfig(
                "max_catch_up_factor must be at least 100",
            ));
        }
        Ok(())
    }
}

impl Default for RealTimeConfig {
    fn default() -> Self {
        Self {
            sync_interval: EmuDuration::from_std(Self::DEFAULT_SYNC_INTERVAL),
            max_catch_up_time: Self::DEFAULT_MAX_CATCH_UP_TIME,
            max_catch_up_factor: Self::DEFAULT_MAX_CATCH_UP_FACTOR,
        }
    }
}
