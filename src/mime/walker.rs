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

//! The recursive walk over a message's content tree.
//!
//! A `MessageParser` holds configuration and collaborators and is immutable,
//! so one instance can serve any number of threads. Each call to `parse`
//! creates its own `TraversalContext`, which is the only mutable state of a
//! walk.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use super::bridge::{self, Bridged, ContainerDecoder, TnefLibrary};
use super::charset::{self, CharsetDetector, SniffingDetector};
use super::classify::{self, PartKind};
use super::envelope;
use super::handler::*;
use super::mime_types::{BuiltinTypes, ExtensionLookup};
use super::model::*;
use super::uuencode;
use crate::support::config::ParserConfig;
use crate::support::diagnostic::{Diagnostics, NoDiagnostics};
use crate::support::error::Error;
use crate::support::log_prefix::LogPrefix;

/// Allows a walk to be stopped from outside, typically from another thread.
///
/// Cancellation is checked before each part is visited and has the same
/// effect as a handler halting.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-call options for `MessageParser::parse_with`.
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// The sequence id prefix of the root part. Empty for a top-level
    /// message, in which case the root part is `1`.
    pub prefix: String,
    pub cancel: Option<CancellationToken>,
}

/// Walks messages, reporting what it finds to a `Handler`.
pub struct MessageParser {
    config: ParserConfig,
    types: Box<dyn ExtensionLookup>,
    detector: Box<dyn CharsetDetector>,
    diagnostics: Arc<dyn Diagnostics>,
    decoder: Box<dyn ContainerDecoder>,
}

impl Default for MessageParser {
    fn default() -> Self {
        MessageParser::new(ParserConfig::default())
    }
}

impl MessageParser {
    pub fn new(config: ParserConfig) -> Self {
        MessageParser {
            config,
            types: Box::new(BuiltinTypes),
            detector: Box::new(SniffingDetector),
            diagnostics: Arc::new(NoDiagnostics),
            decoder: Box::new(TnefLibrary),
        }
    }

    pub fn with_extension_lookup(
        mut self,
        types: impl ExtensionLookup + 'static,
    ) -> Self {
        self.types = Box::new(types);
        self
    }

    pub fn with_charset_detector(
        mut self,
        detector: impl CharsetDetector + 'static,
    ) -> Self {
        self.detector = Box::new(detector);
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_container_decoder(
        mut self,
        decoder: impl ContainerDecoder + 'static,
    ) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Walk `message` with the default options.
    pub fn parse(
        &self,
        message: &Message<'_>,
        handler: &mut dyn Handler,
    ) -> Result<(), Error> {
        self.parse_with(message, handler, &ParseOptions::default())
    }

    /// Walk `message`, reporting everything to `handler`.
    ///
    /// The envelope is always reported in full. The content tree is then
    /// walked in pre-order until it is exhausted, a callback halts, a limit is
    /// reached, or `options.cancel` is cancelled. `message_end` is called last
    /// unless an error is returned.
    pub fn parse_with(
        &self,
        message: &Message<'_>,
        handler: &mut dyn Handler,
        options: &ParseOptions,
    ) -> Result<(), Error> {
        let body = message.body.ok_or(Error::MissingParameter("message body"))?;
        let log_prefix = LogPrefix::new(
            message.folder.as_deref(),
            message.mail_id.as_deref(),
        );

        let halted = envelope::emit(message, body, handler);
        if halted {
            info!("{} Halted during envelope; skipping content", log_prefix);
        }

        let mut walk = Walk {
            parser: self,
            handler,
            ctx: TraversalContext {
                stopped: halted,
                first_multipart_seen: false,
                root_prefix: options.prefix.clone(),
                parts_seen: 0,
                cancel: options.cancel.clone(),
            },
            log_prefix,
            mail_id: message.mail_id.clone().unwrap_or_else(|| "?".to_owned()),
            folder: message.folder.clone().unwrap_or_else(|| "?".to_owned()),
        };

        walk.walk(body, &options.prefix, 1, 0)?;
        debug!(
            "{} Walk complete after {} parts",
            walk.log_prefix, walk.ctx.parts_seen
        );
        walk.handler.message_end(message);
        Ok(())
    }
}

/// The mutable state of one walk.
struct TraversalContext {
    /// Set once anything requests that the walk stop. Never cleared.
    stopped: bool,
    /// Set when the first multipart is dispatched. The children of that
    /// multipart keep the root prefix; all others are prefixed with the id of
    /// their parent.
    first_multipart_seen: bool,
    root_prefix: String,
    parts_seen: u32,
    cancel: Option<CancellationToken>,
}

struct Walk<'p, 'h> {
    parser: &'p MessageParser,
    handler: &'h mut dyn Handler,
    ctx: TraversalContext,
    log_prefix: LogPrefix,
    mail_id: String,
    folder: String,
}

impl Walk<'_, '_> {
    fn note(&mut self, flow: Flow) {
        if flow.is_err() {
            debug!("{} Handler halted the walk", self.log_prefix);
            self.ctx.stopped = true;
        }
    }

    fn unreadable(&self, source: io::Error) -> Error {
        Error::UnreadablePartContent {
            mail_id: self.mail_id.clone(),
            folder: self.folder.clone(),
            source,
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.ctx.stopped {
            return true;
        }

        if self.ctx.cancel.as_ref().map_or(false, |c| c.is_cancelled()) {
            info!("{} Walk cancelled", self.log_prefix);
            self.ctx.stopped = true;
        } else if self.ctx.parts_seen >= self.parser.config.max_parts {
            info!(
                "{} Stopping after {} parts",
                self.log_prefix, self.ctx.parts_seen
            );
            self.ctx.stopped = true;
        }

        self.ctx.stopped
    }

    fn walk(
        &mut self,
        part: &dyn Part,
        prefix: &str,
        position: usize,
        depth: u32,
    ) -> Result<(), Error> {
        if self.should_stop() {
            return Ok(());
        }
        self.ctx.parts_seen += 1;

        let content_type = part
            .content_type()
            .unwrap_or_else(ContentType::octet_stream);
        let raw_filename = part.raw_filename();
        let inline = self.parser.config.inline_policy.is_inline(
            part.content_disposition()
                .as_ref()
                .map(|cd| cd.disposition.as_str()),
            raw_filename.is_some(),
        );
        let sequence_id = part
            .sequence_id_slot()
            .get_or_init(|| classify::sequence_id(prefix, position))
            .clone();
        let base_type = content_type.base_type();
        let filename = classify::display_filename(
            raw_filename.as_deref(),
            &sequence_id,
            &base_type,
            self.parser.types.as_ref(),
        );
        let kind = PartKind::of(&content_type);

        debug!(
            "{} {} {} {:?}{}",
            self.log_prefix,
            sequence_id,
            base_type,
            kind,
            if inline { " (inline)" } else { "" }
        );

        let info = PartInfo {
            part,
            base_type: &base_type,
            inline,
            filename: &filename,
            sequence_id: &sequence_id,
        };

        match kind {
            PartKind::Text if inline => {
                self.text(&info, &content_type, prefix, position)
            }
            PartKind::Html if inline => self.html(&info, &content_type),
            PartKind::Text | PartKind::Html | PartKind::Other => {
                self.attachment(&info);
                Ok(())
            }
            PartKind::Multipart => self.multipart(&info, depth),
            PartKind::Image => {
                let content_id = part.content_id();
                let flow = self.handler.image_part(&info, content_id.as_deref());
                self.note(flow);
                Ok(())
            }
            PartKind::Message if inline => {
                let flow = self.handler.nested_message(part, &sequence_id);
                self.note(flow);
                Ok(())
            }
            PartKind::Message => {
                self.attachment(&PartInfo {
                    base_type: "message/rfc822",
                    ..info
                });
                Ok(())
            }
            PartKind::Container => self.container(&info, prefix, position, depth),
            PartKind::Special => {
                let flow = self.handler.special_part(&info);
                self.note(flow);
                Ok(())
            }
        }
    }

    fn attachment(&mut self, info: &PartInfo<'_>) {
        let flow = self.handler.attachment(info);
        self.note(flow);
    }

    fn decode(
        &mut self,
        part: &dyn Part,
        content_type: &ContentType,
    ) -> Result<(String, u64), Error> {
        let data = part.read_content().map_err(|e| self.unreadable(e))?;
        let encoding = charset::resolve_charset(
            content_type,
            &data,
            self.parser.detector.as_ref(),
            self.parser.diagnostics.as_ref(),
            &self.parser.config.default_charset,
        );
        let size = part.size().unwrap_or(data.len() as u64);
        Ok((charset::decode_text(encoding, &data), size))
    }

    fn text(
        &mut self,
        info: &PartInfo<'_>,
        content_type: &ContentType,
        prefix: &str,
        position: usize,
    ) -> Result<(), Error> {
        let (text, size) = self.decode(info.part, content_type)?;
        let split = uuencode::split(
            &text,
            self.parser.config.max_uuencoded_attachments,
        );

        let split = match split {
            None => {
                let flow = self.handler.inline_plain_text(&InlineText {
                    part: info.part,
                    content_type,
                    text: &text,
                    size,
                    filename: info.filename,
                    sequence_id: info.sequence_id,
                });
                self.note(flow);
                return Ok(());
            }
            Some(split) => split,
        };

        let flow = self.handler.inline_uuencoded_plain_text(&InlineText {
            part: info.part,
            content_type,
            text: &split.text,
            size,
            filename: info.filename,
            sequence_id: info.sequence_id,
        });
        self.note(flow);

        for (ix, file) in split.files.iter().enumerate() {
            if self.ctx.stopped {
                break;
            }

            let sequence_id = classify::sequence_id(prefix, position + 1 + ix);
            let base_type = self
                .parser
                .types
                .mime_type_for_filename(&file.filename)
                .unwrap_or_else(|| "application/octet-stream".to_owned());
            let flow = self.handler.inline_uuencoded_attachment(&UuAttachment {
                file,
                base_type: &base_type,
                sequence_id: &sequence_id,
            });
            self.note(flow);
        }

        Ok(())
    }

    fn html(
        &mut self,
        info: &PartInfo<'_>,
        content_type: &ContentType,
    ) -> Result<(), Error> {
        let (text, size) = self.decode(info.part, content_type)?;
        let flow = self.handler.inline_html(&InlineText {
            part: info.part,
            content_type,
            text: &text,
            size,
            filename: info.filename,
            sequence_id: info.sequence_id,
        });
        self.note(flow);
        Ok(())
    }

    fn multipart(&mut self, info: &PartInfo<'_>, depth: u32) -> Result<(), Error> {
        let child_prefix = if self.ctx.first_multipart_seen {
            info.sequence_id.to_owned()
        } else {
            self.ctx.first_multipart_seen = true;
            self.ctx.root_prefix.clone()
        };

        let count = info.part.enclosed_count();
        if count < 0 {
            return Err(Error::InvalidMultipartContent {
                sequence_id: info.sequence_id.to_owned(),
                count,
            });
        }

        if depth >= self.parser.config.max_depth {
            warn!(
                "{} Multipart {} is nested too deeply; not descending",
                self.log_prefix, info.sequence_id
            );
            self.attachment(info);
            return Ok(());
        }

        let count = count as usize;
        let flow = self.handler.multipart(info.part, count, info.sequence_id);
        self.note(flow);

        for index in 0..count {
            if self.ctx.stopped {
                break;
            }

            let child = info
                .part
                .enclosed_part(index)
                .map_err(|e| self.unreadable(e))?;
            self.walk(&*child, &child_prefix, index + 1, depth + 1)?;
        }

        Ok(())
    }

    fn container(
        &mut self,
        info: &PartInfo<'_>,
        prefix: &str,
        position: usize,
        depth: u32,
    ) -> Result<(), Error> {
        let parser = self.parser;
        if depth >= parser.config.max_depth {
            warn!(
                "{} Container {} is nested too deeply; not unpacking",
                self.log_prefix, info.sequence_id
            );
            self.attachment(info);
            return Ok(());
        }

        match bridge::unpack(
            info.part,
            parser.decoder.as_ref(),
            parser.types.as_ref(),
            parser.detector.as_ref(),
            &self.log_prefix,
        ) {
            Ok(Bridged::Parts(parts)) => {
                for (ix, synthetic) in parts.enumerate() {
                    if self.ctx.stopped {
                        break;
                    }

                    self.walk(&synthetic, prefix, position + ix, depth + 1)?;
                }
            }

            Ok(Bridged::Abandoned) => (),

            Err(e) => {
                warn!(
                    "{} Unable to unpack container {}; reporting it as \
                     an attachment: {}",
                    self.log_prefix, info.sequence_id, e
                );
                self.attachment(info);
            }
        }

        Ok(())
    }
}
