//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::state::SettingsPatch;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "flomodoro")]
#[command(about = "A focus/break timer service that survives restarts and suspension")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Directory holding the persisted settings and timer snapshot
    #[arg(short, long, default_value = "./flomodoro")]
    pub data_dir: PathBuf,

    /// Scheduler cadence in milliseconds while the timer runs
    #[arg(long, default_value = "250")]
    pub tick_ms: u64,

    /// Focus duration in minutes (overrides saved settings)
    #[arg(short, long)]
    pub focus: Option<i64>,

    /// Short break duration in minutes (overrides saved settings)
    #[arg(short, long)]
    pub short_break: Option<i64>,

    /// Long break duration in minutes (overrides saved settings)
    #[arg(short, long)]
    pub long_break: Option<i64>,

    /// Focus sessions per long break (overrides saved settings)
    #[arg(short, long)]
    pub rounds: Option<i64>,

    /// Disable desktop notifications
    #[arg(long)]
    pub no_notify: bool,

    /// Disable the completion sound
    #[arg(long)]
    pub no_sound: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Scheduler cadence, never below 10ms
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(10))
    }

    /// Settings overrides given on the command line
    pub fn settings_overrides(&self) -> SettingsPatch {
        SettingsPatch {
            focus_duration: self.focus,
            short_break_duration: self.short_break,
            long_break_duration: self.long_break,
            rounds: self.rounds,
            dark_mode: None,
        }
    }
}
