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

//! Outbound TCP connections to manager and collector endpoints.

use std::io;
use std::net::{AddrParseError, Ipv4Addr, SocketAddrV4, TcpStream};

use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectErrorKind {
    #[error("failed to create socket: {0}")]
    SocketCreateFailed(#[source] io::Error),
    #[error("invalid address: {0}")]
    InvalidAddress(#[source] AddrParseError),
    #[error("failed to connect: {0}")]
    ConnectFailed(#[source] io::Error),
}

#[derive(Debug, Error)]
#[error("endpoint {ip}:{port}: {kind}")]
pub struct ConnectError {
    pub ip: String,
    pub port: u16,
    #[source]
    pub kind: ConnectErrorKind,
}

/// Open a blocking TCP/IPv4 connection to `ip:port`.
///
/// `ip` must be a dotted-quad address. The OS connect timeout applies, nothing else. On
/// success the caller owns the stream and closes it by dropping it.
pub fn connect(ip: &str, port: u16) -> Result<TcpStream, ConnectError> {
    let fail = |kind| ConnectError {
        ip: ip.to_string(),
        port,
        kind,
    };

    let addr = ip
        .parse::<Ipv4Addr>()
        .map_err(|e| fail(ConnectErrorKind::InvalidAddress(e)))?;

    debug!("connecting to {addr}:{port}");
    TcpStream::connect(SocketAddrV4::new(addr, port)).map_err(|e| {
        if is_socket_exhaustion(&e) {
            fail(ConnectErrorKind::SocketCreateFailed(e))
        } else {
            fail(ConnectErrorKind::ConnectFailed(e))
        }
    })
}

// std creates the socket and connects in one call, these errnos come from socket(2)
fn is_socket_exhaustion(e: &io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM | libc::EAFNOSUPPORT)
    )
}
