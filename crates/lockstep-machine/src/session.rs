use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use lockstep_console::{CommandController, HotKeys};
use lockstep_events::{DeferredEvents, EventDistributor};
use lockstep_realtime::{register_commands, RealTime, RealTimeConfig};
use lockstep_scheduler::Scheduler;
use lockstep_time::{EmuDuration, EmuTime, HostClock};

use crate::{E6Timer, HostEvent, HostEventKind, SessionError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    /// Emulated time advanced per [`Session::run_slice`].
    pub slice: EmuDuration,
    pub realtime: RealTimeConfig,
    /// Initial speed in percent.
    pub speed: u32,
    pub throttle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            slice: EmuDuration::from_std(Duration::from_millis(10)),
            realtime: RealTimeConfig::default(),
            speed: 100,
            throttle: true,
        }
    }
}

/// Why [`Session::run_slice`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceExit {
    /// Emulated time advanced by one slice.
    Completed { dispatched: usize },
    /// Emulation is paused; emulated time did not move.
    Paused,
    /// A quit was requested; emulated time did not move.
    Quit,
}

/// One running emulator instance.
pub struct Session {
    config: SessionConfig,
    scheduler: Rc<Scheduler>,
    pacer: Rc<RefCell<RealTime>>,
    distributor: EventDistributor<HostEvent>,
    deferred: DeferredEvents<HostEvent>,
    commands: Rc<CommandController>,
    hotkeys: Rc<RefCell<HotKeys>>,
    e6_timer: E6Timer,
    console: Rc<RefCell<Vec<String>>>,
    quit: Rc<Cell<bool>>,
}

impl Session {
    pub fn new(config: SessionConfig, clock: Box<dyn HostClock>) -> Result<Self, SessionError> {
        let scheduler = Rc::new(Scheduler::new(EmuTime::ZERO));
        let pacer = RealTime::new(scheduler.clone(), clock, config.realtime)?;
        {
            let mut pacer = pacer.borrow_mut();
            pacer.set_speed(i64::from(config.speed))?;
            pacer.set_throttle(config.throttle);
        }

        let commands = Rc::new(CommandController::new());
        register_commands(&commands, &pacer)?;

        let (distributor, deferred) = EventDistributor::new();
        let session = Self {
            config,
            e6_timer: E6Timer::new(scheduler.current_time()),
            scheduler,
            pacer,
            distributor,
            deferred,
            commands,
            hotkeys: Rc::new(RefCell::new(HotKeys::default())),
            console: Rc::new(RefCell::new(Vec::new())),
            quit: Rc::new(Cell::new(false)),
        };
        session.register_listeners();
        tracing::info!(
            slice_us = config.slice.as_micros(),
            speed = config.speed,
            throttle = config.throttle,
            "session started"
        );
        Ok(session)
    }

    fn register_listeners(&self) {
        let commands = self.commands.clone();
        let console = self.console.clone();
        self.deferred.register_deferred_listener(
            HostEventKind::Command,
            Rc::new(move |event: &HostEvent| {
                if let HostEvent::Command(line) = event {
                    run_command(&commands, &console, line);
                }
            }),
        );

        let commands = self.commands.clone();
        let console = self.console.clone();
        let hotkeys = self.hotkeys.clone();
        self.deferred.register_deferred_listener(
            HostEventKind::Key,
            Rc::new(move |event: &HostEvent| {
                let HostEvent::Key(key) = event else {
                    return;
                };
                let bound = hotkeys.borrow().command_for(*key).map(str::to_string);
                match bound {
                    Some(line) => run_command(&commands, &console, &line),
                    None => tracing::debug!(%key, "no hotkey binding"),
                }
            }),
        );

        let quit = self.quit.clone();
        self.deferred.register_deferred_listener(
            HostEventKind::Quit,
            Rc::new(move |_: &HostEvent| {
                tracing::info!("quit requested");
                quit.set(true);
            }),
        );
    }

    /// Handles pending host events, then runs one slice of emulated time.
    pub fn run_slice(&mut self) -> Result<SliceExit, SessionError> {
        self.deferred.drain_deferred();
        if self.quit.get() {
            return Ok(SliceExit::Quit);
        }
        if self.scheduler.is_paused() {
            return Ok(SliceExit::Paused);
        }
        let target = self.scheduler.current_time() + self.config.slice;
        let dispatched = self.scheduler.advance_to(target)?;
        Ok(SliceExit::Completed { dispatched })
    }

    /// Runs slices until emulated time reaches `time`.
    ///
    /// Returns early, with the reason, when paused or asked to quit.
    pub fn run_until(&mut self, time: EmuTime) -> Result<SliceExit, SessionError> {
        let mut dispatched = 0;
        loop {
            self.deferred.drain_deferred();
            if self.quit.get() {
                return Ok(SliceExit::Quit);
            }
            if self.scheduler.is_paused() {
                return Ok(SliceExit::Paused);
            }
            let now = self.scheduler.current_time();
            if now >= time {
                return Ok(SliceExit::Completed { dispatched });
            }
            let target = (now + self.config.slice).min(time);
            dispatched += self.scheduler.advance_to(target)?;
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }

    pub fn current_time(&self) -> EmuTime {
        self.scheduler.current_time()
    }

    /// Console lines produced since the last call.
    pub fn take_console_output(&self) -> Vec<String> {
        std::mem::take(&mut *self.console.borrow_mut())
    }

    /// Runs a console command line directly, as if typed on the console.
    pub fn execute_command(&self, line: &str) {
        run_command(&self.commands, &self.console, line);
    }

    /// Producer-side handle for feeding host events from another thread.
    pub fn distributor(&self) -> &EventDistributor<HostEvent> {
        &self.distributor
    }

    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.scheduler
    }

    pub fn pacer(&self) -> &Rc<RefCell<RealTime>> {
        &self.pacer
    }

    pub fn commands(&self) -> &CommandController {
        &self.commands
    }

    pub fn hotkeys(&self) -> std::cell::RefMut<'_, HotKeys> {
        self.hotkeys.borrow_mut()
    }

    pub fn io_read(&self, port: u8) -> u8 {
        self.e6_timer.read_io(port, self.scheduler.current_time())
    }

    pub fn io_write(&mut self, port: u8, value: u8) {
        let now = self.scheduler.current_time();
        self.e6_timer.write_io(port, value, now);
    }
}

fn run_command(commands: &CommandController, console: &RefCell<Vec<String>>, line: &str) {
    match commands.execute(line) {
        Ok(output) if output.is_empty() => {}
        Ok(output) => console.borrow_mut().push(output),
        Err(err) => console.borrow_mut().push(err.to_string()),
    }
}
