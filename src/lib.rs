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

//! Bootstrap layer of the Gearbox TCP option injection agent.
//!
//! The crate turns command-line arguments into a [`agent::args::ProcessConfig`], loads the
//! JSON descriptor of manager and collector endpoints and opens one TCP connection per
//! endpoint. Everything runs synchronously on the calling thread.

pub mod agent;
pub mod common;
