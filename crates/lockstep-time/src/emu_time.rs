use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign};
use std::time::Duration;

/// Master emulation frequency in Hz.
///
/// Chosen as a common multiple of the usual home-computer crystal derived clocks
/// (3.579545 MHz colour burst times 960), so most device clocks divide it exactly.
pub const MAIN_FREQ: u64 = 3_579_545 * 960;

const MICROS_PER_SEC: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A point in emulated time, counted in ticks of a fixed frequency `HZ`.
///
/// `EmuTime` without a parameter is the scheduler's master clock ([`MAIN_FREQ`]). Devices
/// running from a slower crystal can use their own frequency and [`EmuTime::convert`]
/// between the two.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuTime<const HZ: u64 = MAIN_FREQ> {
    ticks: u64,
}

/// A span of emulated time in ticks of `HZ`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EmuDuration<const HZ: u64 = MAIN_FREQ> {
    ticks: u64,
}

impl<const HZ: u64> EmuTime<HZ> {
    pub const ZERO: Self = Self { ticks: 0 };

    /// Clock frequency in ticks per second.
    pub const FREQ: u64 = HZ;

    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    #[inline]
    pub const fn ticks(self) -> u64 {
        self.ticks
    }

    /// Returns `self + duration`.
    ///
    /// # Panics
    ///
    /// Panics on overflow. At [`MAIN_FREQ`] `u64` ticks last roughly 170 years of emulated
    /// time, so an overflow always means a corrupted time value upstream.
    #[inline]
    pub fn add(self, duration: EmuDuration<HZ>) -> Self {
        self.plus(duration)
    }

    #[inline]
    fn plus(self, duration: EmuDuration<HZ>) -> Self {
        Self {
            ticks: self
                .ticks
                .checked_add(duration.ticks)
                .expect("emulated time overflowed u64::MAX ticks"),
        }
    }

    /// Signed number of ticks from `self` to `other` (`other - self`).
    #[inline]
    pub fn ticks_until(self, other: Self) -> i64 {
        let delta = i128::from(other.ticks) - i128::from(self.ticks);
        i64::try_from(delta).expect("emulated time difference does not fit in i64")
    }

    /// Elapsed duration from `self` to `other`, zero if `other` is earlier.
    #[inline]
    pub fn duration_until(self, other: Self) -> EmuDuration<HZ> {
        EmuDuration::from_ticks(other.ticks.saturating_sub(self.ticks))
    }

    /// Re-expresses this instant at frequency `TO`.
    ///
    /// The result is `floor(ticks * TO / HZ)`, computed from the absolute tick count every
    /// time. Converting a growing sequence of instants therefore never accumulates rounding
    /// error and never goes backwards.
    pub fn convert<const TO: u64>(self) -> EmuTime<TO> {
        let scaled = u128::from(self.ticks) * u128::from(TO) / u128::from(HZ);
        EmuTime::from_ticks(u64::try_from(scaled).expect("converted emulated time overflowed"))
    }

    /// Exact comparison against an instant counted at a different frequency.
    pub fn cmp_at<const OTHER: u64>(self, other: EmuTime<OTHER>) -> Ordering {
        let lhs = u128::from(self.ticks) * u128::from(OTHER);
        let rhs = u128::from(other.ticks()) * u128::from(HZ);
        lhs.cmp(&rhs)
    }
}

impl<const HZ: u64> EmuDuration<HZ> {
    pub const ZERO: Self = Self { ticks: 0 };

    #[inline]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    #[inline]
    pub const fn ticks(self) -> u64 {
        self.ticks
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.ticks == 0
    }

    /// Smallest emulated duration that covers `duration` (rounded up to a whole tick).
    pub fn from_std(duration: Duration) -> Self {
        let numer = duration.as_nanos() * u128::from(HZ);
        let ticks = numer.div_ceil(NANOS_PER_SEC);
        Self::from_ticks(u64::try_from(ticks).expect("emulated duration overflowed"))
    }

    /// Converts to wall-clock units, truncating sub-nanosecond remainders.
    pub fn to_std(self) -> Duration {
        let nanos = u128::from(self.ticks) * NANOS_PER_SEC / u128::from(HZ);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Whole microseconds in this duration (truncated).
    pub fn as_micros(self) -> u64 {
        let micros = u128::from(self.ticks) * MICROS_PER_SEC / u128::from(HZ);
        u64::try_from(micros).unwrap_or(u64::MAX)
    }
}

impl<const HZ: u64> Add<EmuDuration<HZ>> for EmuTime<HZ> {
    type Output = EmuTime<HZ>;

    #[inline]
    fn add(self, rhs: EmuDuration<HZ>) -> Self::Output {
        self.plus(rhs)
    }
}

impl<const HZ: u64> AddAssign<EmuDuration<HZ>> for EmuTime<HZ> {
    #[inline]
    fn add_assign(&mut self, rhs: EmuDuration<HZ>) {
        *self = self.plus(rhs);
    }
}

impl<const HZ: u64> Add for EmuDuration<HZ> {
    type Output = EmuDuration<HZ>;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::from_ticks(
            self.ticks
                .checked_add(rhs.ticks)
                .expect("emulated duration overflowed u64::MAX ticks"),
        )
    }
}

impl<const HZ: u64> fmt::Debug for EmuTime<HZ> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmuTime({}@{}Hz)", self.ticks, HZ)
    }
}

impl<const HZ: u64> fmt::Display for EmuTime<HZ> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticks)
    }
}

impl<const HZ: u64> fmt::Debug for EmuDuration<HZ> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EmuDuration({}@{}Hz)", self.ticks, HZ)
    }
}
