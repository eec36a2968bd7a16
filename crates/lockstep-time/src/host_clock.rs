use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Source of host wall-clock time used to pace emulation.
///
/// `now` is measured from an arbitrary, fixed epoch and must be monotonic.
pub trait HostClock {
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// [`HostClock`] backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy)]
pub struct StdHostClock {
    epoch: Instant,
}

impl StdHostClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for StdHostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for StdHostClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct FakeState {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Manually driven [`HostClock`] for deterministic tests.
///
/// Clones share the same underlying time, so a test can keep a handle while the pacer owns
/// another. `sleep` advances the fake time and records the requested duration.
#[derive(Debug, Clone, Default)]
pub struct FakeHostClock {
    state: Arc<Mutex<FakeState>>,
}

impl FakeHostClock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.lock().now += by;
    }

    pub fn set_now(&self, now: Duration) {
        self.lock().now = now;
    }

    /// Returns and clears the sleeps requested so far.
    pub fn take_sleeps(&self) -> Vec<Duration> {
        std::mem::take(&mut self.lock().sleeps)
    }
}

impl HostClock for FakeHostClock {
    fn now(&self) -> Duration {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.lock();
        state.now += duration;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_sleep_advances_shared_time() {
        let clock = FakeHostClock::new();
        let handle = clock.clone();

        handle.advance(Duration::from_millis(3));
        clock.sleep(Duration::from_millis(2));

        assert_eq!(handle.now(), Duration::from_millis(5));
        assert_eq!(handle.take_sleeps(), vec![Duration::from_millis(2)]);
        assert!(handle.take_sleeps().is_empty());
    }

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdHostClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
