use lockstep_time::EmuTime;
use thiserror::Error;

use crate::SchedulableId;

pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Scheduler contract violations.
///
/// Every variant indicates a bug in a device or in the kernel itself. Callers are expected
/// to stop the emulation run rather than try to recover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("advance_to({requested}) is earlier than the current time {current}")]
    TimeWentBackwards { current: EmuTime, requested: EmuTime },

    #[error("sync point at {requested} is earlier than the current time {current}")]
    SyncPointInPast { current: EmuTime, requested: EmuTime },

    #[error("advance_to called from inside a sync point callback")]
    Reentrant,

    #[error("schedulable {0:?} is not attached to this scheduler")]
    UnknownOwner(SchedulableId),

    #[error("schedulable {0:?} is already borrowed when its sync point fired")]
    OwnerBusy(SchedulableId),
}
