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

pub mod args;
pub mod config;
pub mod connector;
pub mod endpoint;

use log::info;

use args::ProcessConfig;
use config::ConfigError;
use endpoint::{EndpointGroup, Role};

/// Gearbox agent after startup.
///
/// Holds the process settings and the live connections to managers and collectors. The
/// TCP option injection and the reporting logic work on top of this structure.
#[derive(Debug)]
pub struct Agent {
    process: ProcessConfig,
    managers: EndpointGroup,
    collectors: EndpointGroup,
}

impl Agent {
    /// Load the endpoints config and connect managers then collectors.
    ///
    /// Only config errors are fatal. Unreachable endpoints stay in their groups as failed
    /// links, so the caller decides whether partial connectivity is enough.
    pub fn bootstrap(process: ProcessConfig) -> Result<Agent, ConfigError> {
        let cfg = config::load_config(&process.config_path)?;
        info!(
            "loaded {} manager(s) and {} collector(s) from {}",
            cfg.managers.len(),
            cfg.collectors.len(),
            process.config_path.display()
        );

        let mut managers = EndpointGroup::new(Role::Manager, cfg.managers);
        let mut collectors = EndpointGroup::new(Role::Collector, cfg.collectors);

        let live_managers = managers.connect_all();
        let live_collectors = collectors.connect_all();
        info!(
            "connected to {live_managers}/{} manager(s) and {live_collectors}/{} collector(s)",
            managers.len(),
            collectors.len()
        );

        Ok(Agent {
            process,
            managers,
            collectors,
        })
    }

    pub fn process(&self) -> &ProcessConfig {
        &self.process
    }

    pub fn managers(&self) -> &EndpointGroup {
        &self.managers
    }

    pub fn collectors(&self) -> &EndpointGroup {
        &self.collectors
    }

    /// Number of endpoints in both groups that failed to connect.
    pub fn failed_count(&self) -> usize {
        self.managers.failures().count() + self.collectors.failures().count()
    }

    /// True when at least one endpoint exists but none of them is connected.
    pub fn is_isolated(&self) -> bool {
        let total = self.managers.len() + self.collectors.len();
        let live = self.managers.connected().count() + self.collectors.connected().count();
        total > 0 && live == 0
    }

    pub fn shutdown(mut self) {
        self.managers.close_all();
        self.collectors.close_all();
        info!("agent connections closed");
    }
}
