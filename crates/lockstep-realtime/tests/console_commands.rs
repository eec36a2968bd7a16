use std::rc::Rc;

use lockstep_console::{CommandController, CommandError};
use lockstep_realtime::{register_commands, RealTime, RealTimeConfig};
use lockstep_scheduler::Scheduler;
use lockstep_time::{EmuTime, FakeHostClock};
use pretty_assertions::assert_eq;

fn setup() -> (CommandController, Rc<std::cell::RefCell<RealTime>>) {
    let scheduler = Rc::new(Scheduler::new(EmuTime::ZERO));
    let pacer = RealTime::new(
        scheduler,
        Box::new(FakeHostClock::new()),
        RealTimeConfig::default(),
    )
    .unwrap();
    let controller = CommandController::new();
    register_commands(&controller, &pacer).unwrap();
    (controller, pacer)
}

#[test]
fn speed_reports_and_sets_percentage() {
    let (console, pacer) = setup();

    assert_eq!(console.execute("speed").unwrap(), "Current speed: 100");
    assert_eq!(console.execute("speed 0x96").unwrap(), "");
    assert_eq!(pacer.borrow().speed(), 150);
    assert_eq!(console.execute("speed").unwrap(), "Current speed: 150");
}

#[test]
fn illegal_speed_leaves_state_unchanged() {
    let (console, pacer) = setup();

    for line in ["speed 0", "speed -20", "speed quick"] {
        assert_eq!(console.execute(line), Err(CommandError::IllegalArgument));
    }
    assert_eq!(console.execute("speed 1 2"), Err(CommandError::Syntax));
    assert_eq!(pacer.borrow().speed(), 100);
    assert_eq!(
        console.execute("speed 0").unwrap_err().to_string(),
        "Illegal argument"
    );
}

#[test]
fn pause_toggles_and_forces() {
    let (console, pacer) = setup();

    console.execute("pause").unwrap();
    assert!(pacer.borrow().is_paused());
    console.execute("pause").unwrap();
    assert!(!pacer.borrow().is_paused());

    console.execute("pause on").unwrap();
    console.execute("pause on").unwrap();
    assert!(pacer.borrow().is_paused());
    console.execute("pause off").unwrap();
    assert!(!pacer.borrow().is_paused());

    assert_eq!(console.execute("pause maybe"), Err(CommandError::Syntax));
    assert_eq!(
        console.execute("pause on now").unwrap_err().to_string(),
        "Syntax error"
    );
}

#[test]
fn throttle_toggles_and_forces() {
    let (console, pacer) = setup();

    console.execute("throttle").unwrap();
    assert!(!pacer.borrow().throttle());
    console.execute("throttle on").unwrap();
    assert!(pacer.borrow().throttle());
    console.execute("throttle off").unwrap();
    assert!(!pacer.borrow().throttle());
    assert_eq!(console.execute("throttle 1"), Err(CommandError::Syntax));
}

#[test]
fn commands_have_help() {
    let (console, _pacer) = setup();

    assert_eq!(console.command_names(), vec!["pause", "speed", "throttle"]);
    let help = console.execute("help speed").unwrap();
    assert!(help.starts_with("This command controls the emulation speed"));
    assert!(console.execute("help pause").unwrap().contains("pause on"));
}
