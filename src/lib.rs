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

//! Walks pre-parsed mail content trees and reports what it finds, in order,
//! to a caller-supplied `Handler`.
//!
//! Content the walker understands is decoded before being reported: text is
//! converted to a string using its declared (or detected) charset, uuencoded
//! files embedded in text are split out, and TNEF (`winmail.dat`) containers
//! are unpacked into the parts they hold. Everything else is reported as-is
//! with a sequence id and a display file name.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat if $guard:expr, $actual:expr) => {
        match $actual {
            $expected if $guard => (),
            unexpected => panic!(
                "Expected {} matches {} if {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                stringify!($guard),
                unexpected
            ),
        }
    };
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod mime;
pub mod support;
pub mod tnef;

pub use crate::mime::handler::{
    Flow, Halt, Handler, InlineText, PartInfo, UuAttachment,
};
pub use crate::mime::model::{
    ContentDisposition, ContentType, EmailAddress, Envelope, MemoryPart,
    Message, Part, Priority, SystemFlags,
};
pub use crate::mime::walker::{CancellationToken, MessageParser, ParseOptions};
pub use crate::support::config::{InlinePolicy, ParserConfig};
pub use crate::support::error::Error;

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};

    INIT_TEST_LOG.call_once(|| {
        let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
        let config = Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .build(
                Root::builder()
                    .appender("stderr")
                    .build(log::LevelFilter::Debug),
            )
            .unwrap();
        log4rs::init_config(config).unwrap();
    })
}
