//! Video RAM shared between the CPU interface, the command engine and observers.
//!
//! Each user that caches VRAM-derived state claims the address range it depends on with a
//! [`Window`]. The store keeps every such user consistent: before the CPU touches an address
//! the command engine may also touch, the engine is first brought up to the CPU's time, and
//! every committed byte is announced to the observers whose window contains it.

mod error;
mod store;
mod window;

use lockstep_time::EmuTime;

pub use error::{Result, VramError};
pub use store::{ObserverId, Vram};
pub use window::Window;

/// Video processor clock in Hz (six times the colour-burst frequency).
pub const VDP_FREQ: u64 = 21_477_270;

/// Instants as seen by the video processor.
pub type VdpTime = EmuTime<VDP_FREQ>;

/// The command engine: the only VRAM writer besides the CPU.
pub trait CommandEngine {
    /// Executes the running command up to `time`, committing each byte through
    /// [`Vram::cmd_write`].
    fn sync(&mut self, vram: &mut Vram, time: VdpTime) -> Result<()>;
}

/// A subsystem notified before a byte inside its window is committed.
pub trait VramObserver {
    fn update_vram(&mut self, address: u32, value: u8, time: VdpTime);
}

impl<T: CommandEngine + ?Sized> CommandEngine for std::rc::Rc<std::cell::RefCell<T>> {
    fn sync(&mut self, vram: &mut Vram, time: VdpTime) -> Result<()> {
        self.borrow_mut().sync(vram, time)
    }
}

impl<T: VramObserver + ?Sized> VramObserver for std::rc::Rc<std::cell::RefCell<T>> {
    fn update_vram(&mut self, address: u32, value: u8, time: VdpTime) {
        self.borrow_mut().update_vram(address, value, time);
    }
}
