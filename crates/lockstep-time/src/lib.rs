//! Emulated and host time primitives.
//!
//! Every device in the emulated machine measures time as [`EmuTime`]: an integer tick count
//! at a fixed frequency. The scheduler's master clock runs at [`MAIN_FREQ`]; devices with
//! their own crystal convert exactly between frequencies without drift.
//!
//! [`HostClock`] abstracts the host's wall clock so the real-time pacer can be driven by a
//! [`FakeHostClock`] in tests.

mod emu_time;
mod host_clock;

pub use emu_time::{EmuDuration, EmuTime, MAIN_FREQ};
pub use host_clock::{FakeHostClock, HostClock, StdHostClock};
