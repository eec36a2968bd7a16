use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::{Command, CommandError, Result};

/// Registry of console commands, keyed by name.
///
/// Commands are held as `Rc` so one may be run while another is being registered from
/// within it.
#[derive(Default)]
pub struct CommandController {
    commands: RefCell<BTreeMap<String, Rc<dyn Command>>>,
}

impl CommandController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_command(&self, name: &str, command: Rc<dyn Command>) -> Result<()> {
        let mut commands = self.commands.borrow_mut();
        if commands.contains_key(name) {
            return Err(CommandError::AlreadyRegistered(name.to_string()));
        }
        commands.insert(name.to_string(), command);
        Ok(())
    }

    pub fn unregister_command(&self, name: &str) -> bool {
        self.commands.borrow_mut().remove(name).is_some()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.borrow().keys().cloned().collect()
    }

    /// Tokenizes `line` on whitespace and runs the named command.
    ///
    /// `help <name>` is handled here and returns that command's help text.
    pub fn execute(&self, line: &str) -> Result<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&name) = tokens.first() else {
            return Ok(String::new());
        };
        if name == "help" {
            return match tokens.as_slice() {
                [_] => Ok(self.command_names().join(" ")),
                [_, topic] => self.help(topic),
                _ => Err(CommandError::Syntax),
            };
        }

        let command = self.lookup(name)?;
        let result = command.execute(&tokens);
        match &result {
            Ok(_) => tracing::debug!(command = line, "command executed"),
            Err(err) => tracing::debug!(command = line, %err, "command failed"),
        }
        result
    }

    pub fn help(&self, name: &str) -> Result<String> {
        Ok(self.lookup(name)?.help().join("\n"))
    }

    fn lookup(&self, name: &str) -> Result<Rc<dyn Command>> {
        self.commands
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| CommandError::Unknown(name.to_string()))
    }
}
