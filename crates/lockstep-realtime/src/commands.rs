use std::cell::RefCell;
use std::rc::Rc;

use lockstep_console::{Command, CommandController, CommandError};

use crate::RealTime;

type Pacer = Rc<RefCell<RealTime>>;

fn on_off(arg: &str) -> Result<bool, CommandError> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(CommandError::Syntax),
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal integer.
fn parse_int(arg: &str) -> Option<i64> {
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, arg.strip_prefix('+').unwrap_or(arg)),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// `pause [on|off]`
pub struct PauseCmd(pub Pacer);

impl Command for PauseCmd {
    fn execute(&self, tokens: &[&str]) -> Result<String, CommandError> {
        let mut pacer = self.0.borrow_mut();
        match tokens {
            [_] => pacer.toggle_pause(),
            [_, arg] => {
                if on_off(arg)? {
                    pacer.pause();
                } else {
                    pacer.unpause();
                }
            }
            _ => return Err(CommandError::Syntax),
        }
        Ok(String::new())
    }

    fn help(&self) -> &'static [&'static str] {
        &[
            "Use this command to pause/unpause the emulator",
            " pause:     toggle pause",
            " pause on:  pause emulation",
            " pause off: unpause emulation",
        ]
    }
}

/// `throttle [on|off]`
pub struct ThrottleCmd(pub Pacer);

impl Command for ThrottleCmd {
    fn execute(&self, tokens: &[&str]) -> Result<String, CommandError> {
        let mut pacer = self.0.borrow_mut();
        let throttle = match tokens {
            [_] => !pacer.throttle(),
            [_, arg] => on_off(arg)?,
            _ => return Err(CommandError::Syntax),
        };
        pacer.set_throttle(throttle);
        Ok(String::new())
    }

    fn help(&self) -> &'static [&'static str] {
        &[
            "This command turns speed throttling on/off",
            " throttle:     toggle throttling",
            " throttle on:  run emulation on normal speed",
            " throttle off: run emulation on maximum speed",
        ]
    }
}

/// `speed [<percent>]`
pub struct SpeedCmd(pub Pacer);

impl Command for SpeedCmd {
    fn execute(&self, tokens: &[&str]) -> Result<String, CommandError> {
        match tokens {
            [_] => Ok(format!("Current speed: {}", self.0.borrow().speed())),
            [_, arg] => {
                let percent = parse_int(arg).ok_or(CommandError::IllegalArgument)?;
                self.0
                    .borrow_mut()
                    .set_speed(percent)
                    .map_err(|_| CommandError::IllegalArgument)?;
                Ok(String::new())
            }
            _ => Err(CommandError::Syntax),
        }
    }

    fn help(&self) -> &'static [&'static str] {
        &[
            "This command controls the emulation speed",
            "A higher value means faster emulation, normal speed is 100.",
            " speed:       shows current speed",
            " speed <num>: sets new speed",
        ]
    }
}

/// Registers `pause`, `throttle` and `speed` for `pacer`.
pub fn register_commands(
    controller: &CommandController,
    pacer: &Pacer,
) -> Result<(), CommandError> {
    controller.register_command("pause", Rc::new(PauseCmd(pacer.clone())))?;
    controller.register_command("throttle", Rc::new(ThrottleCmd(pacer.clone())))?;
    controller.register_command("speed", Rc::new(SpeedCmd(pacer.clone())))?;
    Ok(())
}
