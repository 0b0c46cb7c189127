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

//! Manager and collector groups: one record per configured endpoint.

use std::fmt;
use std::net::{Shutdown, TcpStream};

use log::{debug, info, warn};

use super::config::EndpointSpec;
use super::connector::{self, ConnectError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Manager,
    Collector,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Manager => "manager",
            Role::Collector => "collector",
        };
        f.write_str(s)
    }
}

/// Connection state of a single endpoint.
#[derive(Debug, Default)]
pub enum Link {
    #[default]
    Unconnected,
    Connected(TcpStream),
    Failed(ConnectError),
}

#[derive(Debug)]
pub struct Endpoint {
    pub spec: EndpointSpec,
    pub link: Link,
}

impl Endpoint {
    pub fn stream(&self) -> Option<&TcpStream> {
        match &self.link {
            Link::Connected(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ConnectError> {
        match &self.link {
            Link::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Ordered endpoints of one role.
///
/// The order is the order of the config file, so index `i` is the same endpoint for the
/// whole lifetime of the group.
#[derive(Debug)]
pub struct EndpointGroup {
    role: Role,
    endpoints: Vec<Endpoint>,
}

impl EndpointGroup {
    pub fn new(role: Role, specs: Vec<EndpointSpec>) -> Self {
        let endpoints = specs
            .into_iter()
            .map(|spec| Endpoint {
                spec,
                link: Link::Unconnected,
            })
            .collect();
        Self { role, endpoints }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn specs(&self) -> impl Iterator<Item = &EndpointSpec> {
        self.endpoints.iter().map(|e| &e.spec)
    }

    pub fn connected(&self) -> impl Iterator<Item = (usize, &TcpStream)> {
        self.endpoints
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.stream().map(|s| (i, s)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &ConnectError)> {
        self.endpoints
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.error().map(|err| (i, err)))
    }

    /// Connect every endpoint in order and return the number of live connections.
    ///
    /// A failed endpoint is recorded in its [`Link`] and does not stop the others.
    pub fn connect_all(&mut self) -> usize {
        let mut connected = 0;
        for (i, endpoint) in self.endpoints.iter_mut().enumerate() {
            let EndpointSpec { ip, port } = &endpoint.spec;
            endpoint.link = match connector::connect(ip, *port) {
                Ok(stream) => {
                    info!("{} {i} connected: {ip}:{port}", self.role);
                    connected += 1;
                    Link::Connected(stream)
                }
                Err(e) => {
                    warn!("{} {i} is unreachable: {e}", self.role);
                    Link::Failed(e)
                }
            };
        }
        connected
    }

    /// Shut down all live sockets, every endpoint goes back to [`Link::Unconnected`].
    pub fn close_all(&mut self) {
        for (i, endpoint) in self.endpoints.iter_mut().enumerate() {
            if let Link::Connected(stream) = std::mem::take(&mut endpoint.link) {
                // peer may already be gone, the socket is released on drop anyway
                if let Err(e) = stream.shutdown(Shutdown::Both) {
                    debug!("{} {i}: shutdown failed: {e}", self.role);
                }
            }
        }
    }
}
