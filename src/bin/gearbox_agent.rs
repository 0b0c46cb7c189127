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

use std::env;
use std::ffi::OsString;

use env_logger::Env;
use log::{info, warn};

use gearbox::agent::Agent;
use gearbox::agent::args::{self, Invocation, ProcessConfig};
use gearbox::common::{Result, emsg};

fn run(process: ProcessConfig) -> Result<()> {
    process.log_summary();

    let agent = Agent::bootstrap(process).map_err(|e| e.to_string())?;
    if agent.is_isolated() {
        warn!("no manager or collector is reachable, continuing without reporting");
    } else if agent.failed_count() > 0 {
        warn!(
            "running with partial connectivity: {} endpoint(s) failed",
            agent.failed_count()
        );
    }

    info!(
        "agent is ready for cgroup {}",
        agent.process().cgroup_path.display()
    );
    agent.shutdown();
    Ok(())
}

fn main_wrapper(argv: &[OsString]) -> Result<()> {
    // paths are OS strings, only the program name is needed as text
    let prog = argv
        .first()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "gearbox-agent".to_string());

    let process = match args::parse_args(argv) {
        Ok(Invocation::Run(process)) => process,
        Ok(Invocation::Help) => {
            print!("{}", args::usage(&prog));
            return Ok(());
        }
        Err(e) => return emsg(format!("{e}\n{}", args::usage(&prog).trim_end())),
    };

    // debug level picks the default filter, RUST_LOG still wins
    let filter = process.debug_level.log_filter();
    env_logger::Builder::from_env(Env::default().default_filter_or(filter)).init();
    info!("gearbox-agent starting");

    run(process)
}

fn main() {
    let argv: Vec<OsString> = env::args_os().collect();
    if let Err(msg) = main_wrapper(&argv) {
        eprintln!("Error: {msg}");
        std::process::exit(1);
    }
}
