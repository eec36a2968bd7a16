use lockstep_time::EmuTime;

/// Tick rate of the free-running I/O timer.
pub const E6_FREQ: u64 = 255_681;

pub const PORT_LOW: u8 = 0xE6;
pub const PORT_HIGH: u8 = 0xE7;

/// Free-running 16-bit counter readable on I/O ports `0xE6` (low byte) and `0xE7` (high
/// byte). Any write to `0xE6` restarts it from zero.
///
/// The counter is never stepped; reads derive it from the emulated time of the access.
#[derive(Debug, Clone, Copy)]
pub struct E6Timer {
    reference: EmuTime<E6_FREQ>,
}

impl E6Timer {
    pub fn new(time: EmuTime) -> Self {
        Self {
            reference: time.convert(),
        }
    }

    pub fn reset(&mut self, time: EmuTime) {
        self.reference = time.convert();
    }

    /// Counter value at `time`.
    pub fn counter(&self, time: EmuTime) -> u16 {
        let now: EmuTime<E6_FREQ> = time.convert();
        // Truncation to the 16-bit hardware counter.
        now.ticks().wrapping_sub(self.reference.ticks()) as u16
    }

    pub fn read_io(&self, port: u8, time: EmuTime) -> u8 {
        let [low, high] = self.counter(time).to_le_bytes();
        match port {
            PORT_LOW => low,
            PORT_HIGH => high,
            _ => {
                tracing::debug!(port, "E6 timer read on unmapped port");
                0xFF
            }
        }
    }

    pub fn write_io(&mut self, port: u8, _value: u8, time: EmuTime) {
        if port == PORT_LOW {
            self.reset(time);
        }
    }
}
