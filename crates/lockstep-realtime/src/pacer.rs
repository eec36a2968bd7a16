use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use lockstep_scheduler::{Schedulable, SchedulableId, SchedulableRef, Scheduler, SyncToken};
use lockstep_time::{EmuDuration, EmuTime, HostClock};

use crate::{RealTimeConfig, RealTimeError, Result};

/// Weight of the newest sample in the speed-factor estimate.
const ALPHA: f64 = 0.2;

const SYNC_TOKEN: SyncToken = 0;

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

/// Host-time pacer for the emulation thread.
///
/// Host times are kept in microseconds since the [`HostClock`] epoch. Emulated spans are
/// normalised by the selected speed, so "100 % speed" means one emulated microsecond per
/// host microsecond.
pub struct RealTime {
    scheduler: Rc<Scheduler>,
    id: SchedulableId,
    clock: Box<dyn HostClock>,
    config: RealTimeConfig,

    speed: u32,
    throttle: bool,
    factor: f64,

    real_origin: i64,
    real_ref: i64,
    emu_origin: EmuTime,
    emu_ref: EmuTime,
}

impl RealTime {
    /// Attaches a pacer to `scheduler` and arms its first sync point one interval from now.
    pub fn new(
        scheduler: Rc<Scheduler>,
        clock: Box<dyn HostClock>,
        config: RealTimeConfig,
    ) -> Result<Rc<RefCell<Self>>> {
        config.validate()?;

        let pacer = Rc::new_cyclic(|me: &Weak<RefCell<RealTime>>| {
            let weak: SchedulableRef = me.clone();
            let id = scheduler.attach(weak);
            let now = scheduler.current_time();
            let real_now = micros(clock.now());
            RefCell::new(RealTime {
                scheduler: scheduler.clone(),
                id,
                clock,
                config,
                speed: 100,
                throttle: true,
                factor: 1.0,
                real_origin: real_now,
                real_ref: real_now,
                emu_origin: now,
                emu_ref: now,
            })
        });
        pacer.borrow().arm(scheduler.current_time())?;
        Ok(pacer)
    }

    /// Synchronises with the host right now instead of at the next scheduled sample.
    pub fn sync(&mut self) -> Result<()> {
        self.scheduler.remove_sync_point(self.id, Some(SYNC_TOKEN));
        let now = self.scheduler.current_time();
        self.internal_sync(now)?;
        Ok(())
    }

    fn internal_sync(&mut self, now: EmuTime) -> lockstep_scheduler::Result<()> {
        if !self.throttle {
            self.reset_timing_at(now);
            return self.arm(now);
        }

        let real_now = micros(self.clock.now());
        let real_passed = real_now - self.real_ref;
        let emu_passed = self.normalised_micros(self.emu_ref.duration_until(now));

        if real_passed > 0 && emu_passed > 0 {
            let total_real = real_now - self.real_origin;
            let total_emu = self.normalised_micros(self.emu_origin.duration_until(now));
            tracing::debug!(
                emu_us = emu_passed,
                real_us = real_passed,
                total_emu_us = total_emu,
                total_real_us = total_real,
                "pacer sample"
            );

            let max_catch_up = micros(self.config.max_catch_up_time);
            let catch_factor = i64::from(self.config.max_catch_up_factor);
            let catch_up = total_real - total_emu;
            let mut sleep = 0;
            if catch_up < 0 {
                sleep = -catch_up;
            } else if catch_up > max_catch_up {
                let lost = catch_up - max_catch_up;
                self.real_origin += lost;
                tracing::debug!(lost_us = lost, "emulation too slow, forgiving lost time");
            }
            if catch_factor * (sleep + real_passed) < 100 * emu_passed {
                sleep = 100 * emu_passed / catch_factor - real_passed;
            }
            if sleep > 0 {
                tracing::debug!(sleep_us = sleep, "pacer sleeping");
                self.clock.sleep(Duration::from_micros(sleep.unsigned_abs()));
            }

            let sample = (sleep.max(0) + real_passed) as f64 / emu_passed as f64;
            self.factor = self.factor * (1.0 - ALPHA) + sample * ALPHA;

            self.real_ref = real_now + sleep.max(0);
            self.emu_ref = now;
        }
        self.arm(now)
    }

    fn arm(&self, now: EmuTime) -> lockstep_scheduler::Result<()> {
        let mut next = self.emu_ref + self.config.sync_interval;
        if next <= now {
            next = now + self.config.sync_interval;
        }
        self.scheduler.set_sync_point(next, self.id, SYNC_TOKEN)
    }

    /// Microseconds of host time `span` should take at the current speed.
    fn normalised_micros(&self, span: EmuDuration) -> i64 {
        let us = u128::from(span.as_micros()) * 100 / u128::from(self.speed);
        i64::try_from(us).unwrap_or(i64::MAX)
    }

    fn reset_timing_at(&mut self, now: EmuTime) {
        let real_now = micros(self.clock.now());
        self.real_origin = real_now;
        self.real_ref = real_now;
        self.emu_origin = now;
        self.emu_ref = now;
        self.factor = 1.0;
    }

    /// Restarts the long- and short-period references from the current instants.
    pub fn reset_timing(&mut self) {
        let now = self.scheduler.current_time();
        self.reset_timing_at(now);
    }

    pub fn pause(&mut self) {
        if !self.scheduler.is_paused() {
            tracing::info!("emulation paused");
        }
        self.scheduler.pause();
    }

    /// Resumes emulation. Time spent paused is not treated as lag.
    pub fn unpause(&mut self) {
        self.reset_timing();
        if self.scheduler.is_paused() {
            tracing::info!("emulation resumed");
        }
        self.scheduler.unpause();
    }

    pub fn toggle_pause(&mut self) {
        if self.is_paused() {
            self.unpause();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.scheduler.is_paused()
    }

    pub fn set_throttle(&mut self, throttle: bool) {
        if self.throttle != throttle {
            tracing::info!(throttle, "throttling changed");
        }
        self.throttle = throttle;
    }

    pub fn throttle(&self) -> bool {
        self.throttle
    }

    /// Selected speed in percent of real time.
    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn set_speed(&mut self, percent: i64) -> Result<()> {
        let speed = u32::try_from(percent)
            .ok()
            .filter(|&s| s > 0)
            .ok_or(RealTimeError::IllegalSpeed(percent))?;
        tracing::info!(speed, "emulation speed changed");
        self.speed = speed;
        self.reset_timing();
        Ok(())
    }

    /// Smoothed ratio of host time to speed-normalised emulated time.
    pub fn speed_factor(&self) -> f64 {
        self.factor
    }

    /// Estimated host time the emulation needs to get from `from` to `to`.
    pub fn real_duration(&self, from: EmuTime, to: EmuTime) -> Duration {
        from.duration_until(to).to_std().mul_f64(self.factor)
    }

    pub fn config(&self) -> &RealTimeConfig {
        &self.config
    }

    pub fn schedulable_id(&self) -> SchedulableId {
        self.id
    }
}

impl Schedulable for RealTime {
    fn execute_at(&mut self, time: EmuTime, _token: SyncToken) -> lockstep_scheduler::Result<()> {
        self.internal_sync(time)
    }
}

impl Drop for RealTime {
    fn drop(&mut self) {
        self.scheduler.detach(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lockstep_time::FakeHostClock;
    use pretty_assertions::assert_eq;

    fn ms(n: u64) -> EmuDuration {
        EmuDuration::from_std(Duration::from_millis(n))
    }

    fn at(n: u64) -> EmuTime {
        EmuTime::ZERO + ms(n)
    }

    fn setup(config: RealTimeConfig) -> (Rc<Scheduler>, Rc<RefCell<RealTime>>, FakeHostClock) {
        let scheduler = Rc::new(Scheduler::new(EmuTime::ZERO));
        let clock = FakeHostClock::new();
        let pacer = RealTime::new(scheduler.clone(), Box::new(clock.clone()), config).unwrap();
        (scheduler, pacer, clock)
    }

    #[test]
    fn zero_elapsed_sync_rearms_one_interval_after_reference() {
        let config = RealTimeConfig {
            sync_interval: EmuDuration::from_ticks(1000),
            ..RealTimeConfig::default()
        };
        let (scheduler, pacer, clock) = setup(config);
        let id = pacer.borrow().schedulable_id();

        pacer.borrow_mut().sync().unwrap();

        assert!(clock.take_sleeps().is_empty());
        assert_eq!(
            scheduler.sync_point_time(id, SYNC_TOKEN),
            Some(EmuTime::from_ticks(1000))
        );
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn sleeps_when_emulation_runs_ahead() {
        let (scheduler, pacer, clock) = setup(RealTimeConfig::default());

        clock.advance(Duration::from_millis(10));
        assert_eq!(scheduler.advance_to(at(50)).unwrap(), 1);

        assert_eq!(clock.take_sleeps(), vec![Duration::from_millis(40)]);
        assert!((pacer.borrow().speed_factor() - 1.0).abs() < 1e-9);
        assert_eq!(
            scheduler.sync_point_time(pacer.borrow().schedulable_id(), SYNC_TOKEN),
            Some(at(100))
        );
    }

    #[test]
    fn forgives_debt_beyond_max_catch_up_then_limits_catch_up_rate() {
        let (scheduler, pacer, clock) = setup(RealTimeConfig::default());

        // 3 s of host time for 50 ms of emulation: 950 ms of the debt is forgiven.
        clock.advance(Duration::from_millis(3000));
        scheduler.advance_to(at(50)).unwrap();
        assert!(clock.take_sleeps().is_empty());
        let factor = pacer.borrow().speed_factor();
        assert!((factor - (0.8 + 0.2 * 60.0)).abs() < 1e-9, "factor {factor}");

        // Still 1.96 s behind, but catching up may run at most 105 %.
        clock.advance(Duration::from_millis(10));
        scheduler.advance_to(at(100)).unwrap();
        assert_eq!(clock.take_sleeps(), vec![Duration::from_micros(37_619)]);
    }

    #[test]
    fn unthrottled_never_sleeps() {
        let (scheduler, pacer, clock) = setup(RealTimeConfig::default());
        pacer.borrow_mut().set_throttle(false);

        scheduler.advance_to(at(500)).unwrap();
        assert!(clock.take_sleeps().is_empty());
        assert_eq!(pacer.borrow().speed_factor(), 1.0);
        assert_eq!(scheduler.pending_count(), 1);
    }

    #[test]
    fn double_speed_halves_the_host_time_per_interval() {
        let (scheduler, pacer, clock) = setup(RealTimeConfig::default());
        pacer.borrow_mut().set_speed(200).unwrap();

        clock.advance(Duration::from_millis(5));
        scheduler.advance_to(at(50)).unwrap();
        assert_eq!(clock.take_sleeps(), vec![Duration::from_millis(20)]);
    }

    #[test]
    fn illegal_speed_keeps_previous_value() {
        let (_scheduler, pacer, _clock) = setup(RealTimeConfig::default());
        assert_eq!(
            pacer.borrow_mut().set_speed(0),
            Err(RealTimeError::IllegalSpeed(0))
        );
        assert_eq!(
            pacer.borrow_mut().set_speed(-5),
            Err(RealTimeError::IllegalSpeed(-5))
        );
        assert_eq!(pacer.borrow().speed(), 100);
    }

    #[test]
    fn pause_stops_dispatch_and_unpause_forgets_paused_host_time() {
        let (scheduler, pacer, clock) = setup(RealTimeConfig::default());

        pacer.borrow_mut().toggle_pause();
        assert!(pacer.borrow().is_paused());
        assert_eq!(scheduler.advance_to(at(50)).unwrap(), 0);

        clock.advance(Duration::from_secs(10));
        pacer.borrow_mut().toggle_pause();
        assert!(!pacer.borrow().is_paused());

        clock.advance(Duration::from_millis(50));
        scheduler.advance_to(at(50)).unwrap();
        assert!(clock.take_sleeps().is_empty());
        assert!((pacer.borrow().speed_factor() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn real_duration_scales_by_factor() {
        let (_scheduler, pacer, _clock) = setup(RealTimeConfig::default());
        pacer.borrow_mut().factor = 2.0;
        let estimate = pacer.borrow().real_duration(at(0), at(10));
        assert!((estimate.as_secs_f64() - 0.020).abs() < 1e-9);
        assert_eq!(pacer.borrow().real_duration(at(10), at(0)), Duration::ZERO);
    }

    #[test]
    fn dropping_the_pacer_detaches_it() {
        let (scheduler, pacer, _clock) = setup(RealTimeConfig::default());
        assert_eq!(scheduler.pending_count(), 1);
        drop(pacer);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let scheduler = Rc::new(Scheduler::new(EmuTime::ZERO));
        let config = RealTimeConfig {
            max_catch_up_factor: 50,
            ..RealTimeConfig::default()
        };
        assert!(matches!(
            RealTime::new(scheduler.clone(), Box::new(FakeHostClock::new()), config),
            Err(RealTimeError::InvalidConfig(_))
        ));
        assert_eq!(scheduler.pending_count(), 0);
    }
}
