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

/// Use simple text descriptions as error type at the top level of the agent executable.
pub type Result<T> = std::result::Result<T, String>;

/// Little helper function to convert str literals to error message.
pub fn emsg<T, U: AsRef<str>>(s: U) -> Result<T> {
    Err(s.as_ref().to_string())
}
