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

//! Turns proprietary container parts into ordinary synthetic parts which the
//! walker can traverse as if they had been in the message all along.

use std::vec;

use log::{debug, warn};

use super::charset::CharsetDetector;
use super::header::{parse_content_type, ContentDisposition, ContentType};
use super::mime_types::ExtensionLookup;
use super::model::{MemoryPart, Part};
use crate::support::log_prefix::LogPrefix;
use crate::tnef::{self, convert, rtf, Attachment, MessageKind, TnefMessage};

/// The container decoding library used by the bridge.
pub trait ContainerDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<TnefMessage, tnef::Error>;

    fn decompress_rtf(&self, data: &[u8]) -> Result<Vec<u8>, tnef::Error>;

    /// Convert a contact into a multipart holding an equivalent vCard.
    fn contact_to_multipart(
        &self,
        message: &TnefMessage,
    ) -> Result<MemoryPart, tnef::Error>;

    /// Convert a read receipt into a `multipart/report`.
    fn read_receipt_to_multipart(
        &self,
        message: &TnefMessage,
        displayed: bool,
    ) -> Result<MemoryPart, tnef::Error>;
}

/// The built-in TNEF implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TnefLibrary;

impl ContainerDecoder for TnefLibrary {
    fn decode(&self, data: &[u8]) -> Result<TnefMessage, tnef::Error> {
        tnef::read(data)
    }

    fn decompress_rtf(&self, data: &[u8]) -> Result<Vec<u8>, tnef::Error> {
        rtf::decompress(data)
    }

    fn contact_to_multipart(
        &self,
        message: &TnefMessage,
    ) -> Result<MemoryPart, tnef::Error> {
        convert::contact_to_vcard(message)
    }

    fn read_receipt_to_multipart(
        &self,
        message: &TnefMessage,
        displayed: bool,
    ) -> Result<MemoryPart, tnef::Error> {
        convert::read_receipt_to_report(message, displayed)
    }
}

/// The outcome of unpacking a container.
pub enum Bridged<'a> {
    /// The synthetic parts to walk in place of the container.
    Parts(SyntheticParts<'a>),
    /// The container was understood, but converting it failed. Nothing is
    /// reported for it.
    Abandoned,
}

enum Pending {
    File(Attachment),
    Message(MemoryPart),
}

/// Produces the synthetic parts of a generic container: the message body
/// first, if there is one, then each attachment in order.
pub struct SyntheticParts<'a> {
    body: Option<MemoryPart>,
    attachments: vec::IntoIter<Pending>,
    types: &'a dyn ExtensionLookup,
}

impl<'a> SyntheticParts<'a> {
    fn single(part: MemoryPart, types: &'a dyn ExtensionLookup) -> Self {
        SyntheticParts {
            body: Some(part),
            attachments: Vec::new().into_iter(),
            types,
        }
    }
}

impl Iterator for SyntheticParts<'_> {
    type Item = MemoryPart;

    fn next(&mut self) -> Option<MemoryPart> {
        if let Some(body) = self.body.take() {
            return Some(body);
        }

        self.attachments.next().map(|pending| match pending {
            Pending::File(attachment) => attachment_part(attachment, self.types),
            Pending::Message(part) => part,
        })
    }
}

/// Unpack the container `part`.
///
/// An error means the container could not be read or decoded at all, in
/// which case the caller should treat it as an opaque attachment.
pub fn unpack<'a>(
    part: &dyn Part,
    decoder: &dyn ContainerDecoder,
    types: &'a dyn ExtensionLookup,
    detector: &dyn CharsetDetector,
    log_prefix: &LogPrefix,
) -> Result<Bridged<'a>, tnef::Error> {
    let data = part.read_content()?;
    let message = decoder.decode(&data)?;

    match message.kind() {
        MessageKind::Contact => match decoder.contact_to_multipart(&message) {
            Ok(converted) => {
                Ok(Bridged::Parts(SyntheticParts::single(converted, types)))
            }
            Err(e) => {
                warn!("{} Failed to convert TNEF contact: {}", log_prefix, e);
                Ok(Bridged::Abandoned)
            }
        },

        MessageKind::ReadReceipt(displayed) => {
            match decoder.read_receipt_to_multipart(&message, displayed) {
                Ok(converted) => {
                    Ok(Bridged::Parts(SyntheticParts::single(converted, types)))
                }
                Err(e) => {
                    warn!(
                        "{} Failed to convert TNEF read receipt: {}",
                        log_prefix, e
                    );
                    Ok(Bridged::Abandoned)
                }
            }
        }

        MessageKind::Other => {
            debug!(
                "{} Unpacking TNEF {:?} with {} attachments",
                log_prefix,
                message.class(),
                message.attachments.len()
            );
            let (body, attachments) =
                prepare(message, decoder, types, detector)?;
            Ok(Bridged::Parts(SyntheticParts {
                body,
                attachments: attachments.into_iter(),
                types,
            }))
        }
    }
}

/// Do everything that can fail up front, so that a bad container is either
/// entirely replaced by its parts or not at all.
fn prepare(
    mut message: TnefMessage,
    decoder: &dyn ContainerDecoder,
    types: &dyn ExtensionLookup,
    detector: &dyn CharsetDetector,
) -> Result<(Option<MemoryPart>, Vec<Pending>), tnef::Error> {
    let body = match message.compressed_rtf() {
        Some(compressed) => {
            let rtf = decoder.decompress_rtf(compressed)?;
            let charset = detector.detect(&rtf);
            Some(MemoryPart::new(
                ContentType::new("text", "rtf").with_parm("charset", &charset),
                rtf,
            ))
        }
        None => None,
    };

    let mut pending = Vec::with_capacity(message.attachments.len());
    for mut attachment in message.attachments.drain(..) {
        pending.push(match attachment.message.take() {
            Some(nested) => Pending::Message(embedded_message(
                *nested, decoder, types, detector,
            )?),
            None => Pending::File(attachment),
        });
    }

    Ok((body, pending))
}

/// Synthesise a `message/rfc822` part for an embedded message.
fn embedded_message(
    message: TnefMessage,
    decoder: &dyn ContainerDecoder,
    types: &dyn ExtensionLookup,
    detector: &dyn CharsetDetector,
) -> Result<MemoryPart, tnef::Error> {
    let subject = message.subject().unwrap_or("").to_owned();
    let text = message.body.clone().unwrap_or_default();

    let (body, attachments) = prepare(message, decoder, types, detector)?;
    let children = body
        .into_iter()
        .chain(attachments.into_iter().map(|pending| match pending {
            Pending::File(attachment) => attachment_part(attachment, types),
            Pending::Message(part) => part,
        }))
        .collect();

    let rendered = format!(
        "Subject: {}\r\nMIME-Version: 1.0\r\n\r\n{}",
        subject.replace(|c| '\r' == c || '\n' == c, " "),
        text
    );
    Ok(MemoryPart::new(ContentType::new("message", "rfc822"), rendered)
        .with_child(MemoryPart::multipart(
            ContentType::new("multipart", "mixed"),
            children,
        )))
}

fn attachment_part(
    mut attachment: Attachment,
    types: &dyn ExtensionLookup,
) -> MemoryPart {
    let filename = attachment.filename().map(str::to_owned);
    let content_type = attachment
        .mime_tag()
        .and_then(parse_content_type)
        .or_else(|| {
            filename
                .as_deref()
                .and_then(|f| types.mime_type_for_filename(f))
                .and_then(|t| parse_content_type(&t))
        })
        .unwrap_or_else(ContentType::octet_stream);

    let data = match attachment.data.take() {
        Some(data) => data,
        None => attachment.content().map(<[u8]>::to_vec).unwrap_or_default(),
    };

    MemoryPart::new(content_type, data).with_disposition(
        ContentDisposition::attachment(filename.as_deref()),
    )
}
