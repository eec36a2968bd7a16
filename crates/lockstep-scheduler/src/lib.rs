//! Emulated-time scheduler.
//!
//! Devices implement [`Schedulable`] and ask the [`Scheduler`] to call them back at a given
//! [`EmuTime`]. The main loop drives the scheduler forward with [`Scheduler::advance_to`],
//! which delivers due callbacks strictly in time order; callbacks due at the same instant
//! run in the order they were scheduled.

mod error;
mod pending;
mod scheduler;

use lockstep_time::EmuTime;

pub use error::{Result, SchedulerError};
pub use scheduler::{SchedulableId, SchedulableRef, Scheduler};

/// Opaque value passed back to a device so it can tell its sync points apart.
pub type SyncToken = u32;

/// A device that can be brought up to a given emulated instant.
pub trait Schedulable {
    /// Called by the scheduler when a sync point of this device falls due.
    ///
    /// `time` never decreases between calls for the same `(device, token)`.
    fn execute_at(&mut self, time: EmuTime, token: SyncToken) -> Result<()>;
}
