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

use std::fmt;

/// Text included at the start of every log statement made while walking one
/// message.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    folder: Option<String>,
    mail_id: Option<String>,
}

impl LogPrefix {
    pub fn new(folder: Option<&str>, mail_id: Option<&str>) -> Self {
        Self {
            folder: folder.map(sanitise),
            mail_id: mail_id.map(sanitise),
        }
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "walk")?;
        if self.folder.is_some() || self.mail_id.is_some() {
            write!(
                f,
                "[{}/{}]",
                self.folder.as_deref().unwrap_or("?"),
                self.mail_id.as_deref().unwrap_or("?"),
            )?;
        }

        Ok(())
    }
}

fn sanitise(s: &str) -> String {
    let mut s = s.to_owned();
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
