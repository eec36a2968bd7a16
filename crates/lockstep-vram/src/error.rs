use thiserror::Error;

use crate::VdpTime;

pub type Result<T> = std::result::Result<T, VramError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VramError {
    #[error("VRAM address {address:#x} is outside the {size:#x} byte store")]
    OutOfBounds { address: u32, size: usize },

    #[error("VRAM write at {requested} is earlier than the store's time {current}")]
    TimeWentBackwards { current: VdpTime, requested: VdpTime },

    #[error("read through a disabled window")]
    WindowDisabled,
}
