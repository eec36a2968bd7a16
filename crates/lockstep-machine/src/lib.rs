//! Emulation session: the object that owns the timing kernel and runs the main loop.
//!
//! A [`Session`] builds the scheduler, the real-time pacer, the host event pipeline, the
//! console and the devices, and ties their lifetimes together. Nothing here is global; a
//! process may run several sessions side by side.
#![forbid(unsafe_code)]

mod e6timer;
mod event;
mod session;

use lockstep_console::CommandError;
use lockstep_realtime::RealTimeError;
use lockstep_scheduler::SchedulerError;
use thiserror::Error;

pub use e6timer::{E6Timer, E6_FREQ};
pub use event::{HostEvent, HostEventKind};
pub use session::{Session, SessionConfig, SliceExit};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("scheduler: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("real-time pacer: {0}")]
    RealTime(#[from] RealTimeError),

    #[error("console: {0}")]
    Command(#[from] CommandError),
}
