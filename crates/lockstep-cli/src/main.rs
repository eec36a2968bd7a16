#![forbid(unsafe_code)]

mod config;
mod stdin_source;

use std::io::{self, BufReader, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use lockstep_machine::{Session, SliceExit};
use lockstep_time::StdHostClock;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::stdin_source::LineSource;

/// Host sleep between polls for input while emulation is paused.
const PAUSED_POLL: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    let config = Config::load()?;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let mut session = Session::new(config.session, Box::new(StdHostClock::new()))
        .context("failed to start emulation session")?;
    session
        .distributor()
        .spawn_producer(LineSource::new(BufReader::new(io::stdin())))
        .context("failed to spawn host event thread")?;

    let mut stdout = io::stdout();
    loop {
        let exit = session.run_slice()?;
        for line in session.take_console_output() {
            writeln!(stdout, "{line}")?;
        }
        stdout.flush()?;

        match exit {
            SliceExit::Quit => break,
            SliceExit::Paused => thread::sleep(PAUSED_POLL),
            SliceExit::Completed { .. } => {}
        }
        if let Some(stop_at) = config.stop_at {
            if session.current_time() >= stop_at {
                tracing::info!(time = %session.current_time(), "emulated time limit reached");
                break;
            }
        }
    }

    tracing::info!(time = %session.current_time(), "session finished");
    Ok(())
}
