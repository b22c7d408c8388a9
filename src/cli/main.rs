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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use structopt::clap;
use structopt::StructOpt;

use super::dump::Dump;
use mimewalk::support::diagnostic::CharsetCounters;
use mimewalk::support::sysexits::*;
use mimewalk::{
    Envelope, InlinePolicy, MemoryPart, Message, MessageParser, ParserConfig,
};

/// Walk the content of mail files and print everything found in them.
///
/// Each FILE is treated as the single root part of a message with the given
/// content type. With the default type, this lists the contents of
/// `winmail.dat` files.
///
/// If a file named `logging.toml` exists next to the first FILE, or one is
/// given with `--log-config`, it configures logging in the usual log4rs
/// format. Otherwise informational messages are written to standard error.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// Treat parts which have a file name as attachments even if their
    /// disposition is `inline`.
    #[structopt(long)]
    strict: bool,

    /// Read parser configuration from this TOML file.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Read log4rs configuration from this file.
    #[structopt(long, parse(from_os_str))]
    log_config: Option<PathBuf>,

    /// The content type of the input files.
    #[structopt(long, default_value = "application/ms-tnef")]
    content_type: String,

    /// The files to walk.
    #[structopt(parse(from_os_str), required = true)]
    files: Vec<PathBuf>,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    init_log(&options);

    let mut config = match options.config {
        None => ParserConfig::default(),
        Some(ref path) => match ParserConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error in config file '{}': {}", path.display(), e);
                EX_CONFIG.exit()
            }
        },
    };
    if options.strict {
        config.inline_policy = InlinePolicy::Strict;
    }

    let counters = Arc::new(CharsetCounters::new());
    let parser = MessageParser::new(config).with_diagnostics(counters.clone());

    let stdout = io::stdout();
    let mut stdout = stdout.lock();
    let mut status = EX_OK;
    for path in &options.files {
        let result = walk_file(&parser, path, &options.content_type, &mut stdout);
        status = status.max(result);
    }

    for (charset, count) in counters.snapshot() {
        warn!("Unsupported charset {:?} seen {} times", charset, count);
    }

    if EX_OK != status {
        status.exit();
    }
}

fn walk_file(
    parser: &MessageParser,
    path: &Path,
    content_type: &str,
    out: &mut dyn io::Write,
) -> Sysexit {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Unable to read '{}': {}", path.display(), e);
            return EX_NOINPUT;
        }
    };

    let folder = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("Walking '{}' as {}", path.display(), content_type);

    let root = MemoryPart::parse(content_type, data);
    let message = Message::new(
        Envelope {
            subject: Some(name.clone()),
            ..Envelope::default()
        },
        &root,
    )
    .with_location(&folder, &name);

    let mut dump = Dump::new(out);
    if let Err(e) = parser.parse(&message, &mut dump) {
        eprintln!("Error walking '{}': {}", path.display(), e);
        return EX_DATAERR;
    }

    if let Some(e) = dump.into_error() {
        eprintln!("Error writing output: {}", e);
        return EX_IOERR;
    }

    EX_OK
}

fn init_log(options: &Options) {
    let log_config = options.log_config.clone().or_else(|| {
        options
            .files
            .first()
            .and_then(|f| f.parent())
            .map(|dir| dir.join("logging.toml"))
            .filter(|f| f.is_file())
    });

    let result = match log_config {
        Some(path) => init_file_log(&path),
        None => init_console_log(),
    };

    if let Err(e) = result {
        eprintln!("Failed to initialise logging: {}", e);
        EX_CONFIG.exit();
    }
}

fn init_file_log(path: &Path) -> Result<(), String> {
    log4rs::init_file(path, log4rs::file::Deserializers::default())
        .map_err(|e| format!("'{}': {}", path.display(), e))
}

fn init_console_log() -> Result<(), String> {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};

    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(log::LevelFilter::Info))
        .map_err(|e| e.to_string())?;
    log4rs::init_config(config).map_err(|e| e.to_string())?;
    Ok(())
}
