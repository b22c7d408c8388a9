//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mimewalk.
//
// Mimewalk is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Mimewalk is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Mimewalk. If not, see <http://www.gnu.org/licenses/>.

//! Interpretation of pre-parsed message content trees.

pub mod bridge;
pub mod charset;
pub mod classify;
pub mod encoded_word;
pub mod envelope;
pub mod handler;
pub mod header;
pub mod mime_types;
pub mod model;
#[cfg(test)]
pub mod testing;
pub mod uuencode;
pub mod walker;
