//! Wall-clock pacing of emulated time.
//!
//! [`RealTime`] is an ordinary schedulable device: every `sync_interval` of emulated time it
//! compares how much emulated and host time have passed and sleeps the emulation thread when
//! the emulation is ahead. When the emulation falls behind it is allowed to catch up, but
//! never faster than `max_catch_up_factor` percent of the selected speed and never for more
//! than `max_catch_up_time` of accumulated debt.

mod commands;
mod config;
mod pacer;

use lockstep_scheduler::SchedulerError;
use thiserror::Error;

pub use commands::{register_commands, PauseCmd, SpeedCmd, ThrottleCmd};
pub use config::RealTimeConfig;
pub use pacer::RealTime;

pub type Result<T> = std::result::Result<T, RealTimeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealTimeError {
    #[error("speed must be a positive percentage, got {0}")]
    IllegalSpeed(i64),

    #[error("invalid real-time configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
