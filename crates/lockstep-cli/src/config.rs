use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use lockstep_machine::SessionConfig;
use lockstep_realtime::RealTimeConfig;
use lockstep_time::{EmuDuration, EmuTime};

#[derive(Debug, Clone, Parser)]
#[command(name = "lockstep", version, about = "Runs the emulator timing kernel against the host clock")]
pub struct Args {
    /// Emulated milliseconds between two pacing samples.
    ///
    /// Environment variable: `LOCKSTEP_SYNC_INTERVAL_MS`.
    #[arg(long, env = "LOCKSTEP_SYNC_INTERVAL_MS", default_value_t = 50)]
    sync_interval_ms: u64,

    /// Largest host-time lag (ms) the emulation tries to win back; the rest is dropped.
    ///
    /// Environment variable: `LOCKSTEP_MAX_CATCH_UP_MS`.
    #[arg(long, env = "LOCKSTEP_MAX_CATCH_UP_MS", default_value_t = 2000)]
    max_catch_up_ms: u64,

    /// Fastest catch-up rate, in percent of the selected speed.
    ///
    /// Environment variable: `LOCKSTEP_MAX_CATCH_UP_FACTOR`.
    #[arg(long, env = "LOCKSTEP_MAX_CATCH_UP_FACTOR", default_value_t = 105)]
    max_catch_up_factor: u32,

    /// Initial emulation speed in percent of real time.
    ///
    /// Environment variable: `LOCKSTEP_SPEED`.
    #[arg(long, env = "LOCKSTEP_SPEED", default_value_t = 100)]
    speed: u32,

    /// Start with throttling off (run as fast as possible).
    ///
    /// Environment variable: `LOCKSTEP_NO_THROTTLE`.
    #[arg(long, env = "LOCKSTEP_NO_THROTTLE")]
    no_throttle: bool,

    /// Emulated milliseconds per main-loop iteration.
    #[arg(long, default_value_t = 10)]
    slice_ms: u64,

    /// Stop after this many milliseconds of emulated time.
    #[arg(long)]
    max_emu_ms: Option<u64>,

    /// Log filter (tracing-subscriber EnvFilter syntax).
    ///
    /// Environment variable: `LOCKSTEP_LOG`.
    #[arg(long, env = "LOCKSTEP_LOG", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub session: SessionConfig,
    pub stop_at: Option<EmuTime>,
    pub log_level: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    pub fn from_args(args: Args) -> Result<Self> {
        let realtime = RealTimeConfig {
            sync_interval: EmuDuration::from_std(Duration::from_millis(args.sync_interval_ms)),
            max_catch_up_time: Duration::from_millis(args.max_catch_up_ms),
            max_catch_up_factor: args.max_catch_up_factor,
        };
        realtime
            .validate()
            .context("invalid pacing configuration")?;
        if args.speed == 0 {
            anyhow::bail!("--speed must be a positive percentage");
        }
        if args.slice_ms == 0 {
            anyhow::bail!("--slice-ms must be non-zero");
        }

        let stop_at = args
            .max_emu_ms
            .map(|ms| EmuTime::ZERO + EmuDuration::from_std(Duration::from_millis(ms)));

        Ok(Self {
            session: SessionConfig {
                slice: EmuDuration::from_std(Duration::from_millis(args.slice_ms)),
                realtime,
                speed: args.speed,
                throttle: !args.no_throttle,
            },
            stop_at,
            log_level: args.log_level,
        })
    }
}
