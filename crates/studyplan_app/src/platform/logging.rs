//! Logging setup for the studyplan shell.
//!
//! The session loop owns the terminal, so the usual destination is the
//! `./studyplan.log` file; `STUDYPLAN_LOG` overrides the level.

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

const LOG_FILENAME: &str = "./studyplan.log";

/// Where log lines end up.
#[allow(dead_code)]
pub enum LogDestination {
    /// Only `./studyplan.log`.
    File,
    /// Only the terminal.
    Terminal,
    /// Both the file and the terminal.
    Both,
}

/// Installs the global logger, honoring `STUDYPLAN_LOG` for the level.
pub fn initialize(destination: LogDestination) {
    let level = std::env::var("STUDYPLAN_LOG")
        .ok()
        .and_then(|raw| LevelFilter::from_str(&raw).ok())
        .unwrap_or(LevelFilter::Info);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    if matches!(destination, LogDestination::Terminal | LogDestination::Both) {
        loggers.push(TermLogger::new(
            level,
            config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ));
    }
    if matches!(destination, LogDestination::File | LogDestination::Both) {
        match File::create(PathBuf::from(LOG_FILENAME)) {
            Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
            Err(err) => eprintln!("could not create {LOG_FILENAME}: {err}"),
        }
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}
