// Gearbox - TCP option injection agent
// Copyright (C) 2025  Maxim Petrov
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Command-line interface of the agent.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::{ArgAction, Parser};
use log::info;
use thiserror::Error;

/// Verbosity of the diagnostic output, selected with `-i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DebugLevel {
    #[default]
    None = 0,
    Minimal = 1,
    Full = 2,
}

impl DebugLevel {
    /// Default `env_logger` filter for this level, `RUST_LOG` still takes precedence.
    pub fn log_filter(self) -> &'static str {
        match self {
            DebugLevel::None => "warn",
            DebugLevel::Minimal => "info",
            DebugLevel::Full => "debug",
        }
    }
}

impl FromStr for DebugLevel {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0" => Ok(DebugLevel::None),
            "1" => Ok(DebugLevel::Minimal),
            "2" => Ok(DebugLevel::Full),
            other => Err(UsageError::InvalidDebugLevel(other.to_string())),
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DebugLevel::None => "none",
            DebugLevel::Minimal => "minimal",
            DebugLevel::Full => "full",
        };
        f.write_str(s)
    }
}

/// Process-wide settings, built once from the command line and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessConfig {
    pub cgroup_path: PathBuf,
    pub config_path: PathBuf,
    pub debug_level: DebugLevel,
}

impl ProcessConfig {
    /// Report the resolved paths. Call it after the logger is up.
    pub fn log_summary(&self) {
        info!(
            "cgroup path for TCP option injection set to: {}",
            self.cgroup_path.display()
        );
        info!("config file path set to: {}", self.config_path.display());
        info!("debug level: {}", self.debug_level);
    }
}

/// What the command line asks the agent to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(ProcessConfig),
    Help,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("invalid debug level: {0}")]
    InvalidDebugLevel(String),
    #[error("the -c option is required")]
    MissingCgroupPath,
    #[error("the -f option is required")]
    MissingConfigPath,
    #[error("{0}")]
    Invalid(String),
}

// getopt-like surface: short flags only, last occurrence wins, usage text is our own
#[derive(Parser, Debug)]
#[command(
    disable_help_flag = true,
    disable_version_flag = true,
    args_override_self = true
)]
struct CliArgs {
    #[arg(short = 'c', value_name = "cgroup_path")]
    cgroup_path: Option<PathBuf>,

    #[arg(short = 'f', value_name = "config_file_path")]
    config_path: Option<PathBuf>,

    #[arg(short = 'i', value_name = "0|1|2")]
    debug_level: Option<String>,

    #[arg(short = 'h', action = ArgAction::SetTrue)]
    help: bool,

    // operands are accepted and ignored, as getopt leaves them untouched
    #[arg(hide = true)]
    _operands: Vec<OsString>,
}

/// Parse the full argument vector (program name included).
pub fn parse_args<I, T>(argv: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(argv).map_err(|e| UsageError::Invalid(describe(&e)))?;
    if cli.help {
        return Ok(Invocation::Help);
    }

    let debug_level = match cli.debug_level {
        Some(level) => level.parse::<DebugLevel>()?,
        None => DebugLevel::default(),
    };
    let cgroup_path = cli.cgroup_path.ok_or(UsageError::MissingCgroupPath)?;
    let config_path = cli.config_path.ok_or(UsageError::MissingConfigPath)?;

    Ok(Invocation::Run(ProcessConfig {
        cgroup_path,
        config_path,
        debug_level,
    }))
}

// clap renders "error: <what>\n\n<tips and usage>", keep only <what>
fn describe(err: &clap::Error) -> String {
    let text = err.to_string();
    let first = text.lines().next().unwrap_or_default().trim();
    first.strip_prefix("error: ").unwrap_or(first).to_string()
}

pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} -c <cgroup_path> -f <config_file_path> [-h] [-i <0|1|2>]\n\
         \x20 -c <cgroup_path>        Specify the cgroup path that is required for operation.\n\
         \x20 -f <config_file_path>   Specify the path to the configuration file.\n\
         \x20 -i <0|1|2>              Control the level of debug information \
         (0 for none, 1 for minimal, 2 for full).\n\
         \x20 -h                      Display this help and exit.\n"
    )
}
