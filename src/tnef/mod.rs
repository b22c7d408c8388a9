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

//! Decoding of Microsoft TNEF (`application/ms-tnef`, "winmail.dat")
//! containers.
//!
//! A TNEF stream is a sequence of attributes, each tagged as belonging to the
//! message or to the current attachment. Most of the interesting information
//! is in the MAPI property blocks carried by two of those attributes.

use std::io;

use thiserror::Error;

#[cfg(test)]
pub mod builder;
pub mod convert;
pub mod mapi;
mod reader;
pub mod rtf;

pub use self::reader::{read, MAX_NESTING};

use self::mapi::{Property, PropValue};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a TNEF stream (signature {0:#010x})")]
    BadSignature(u32),
    #[error("Truncated TNEF stream")]
    Truncated,
    #[error("Bad checksum on TNEF attribute {0:#06x}")]
    BadChecksum(u16),
    #[error("Unknown TNEF attribute level {0}")]
    BadLevel(u8),
    #[error("Malformed MAPI property block")]
    BadProperties,
    #[error("Malformed compressed RTF: {0}")]
    BadRtf(&'static str),
    #[error("Embedded messages nested too deeply")]
    TooDeep,
    #[error("Cannot convert {0}: {1}")]
    Conversion(&'static str, &'static str),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub const LVL_MESSAGE: u8 = 1;
pub const LVL_ATTACHMENT: u8 = 2;

// Attribute ids, without the type in the upper 16 bits
pub const ATT_FROM: u16 = 0x8000;
pub const ATT_SUBJECT: u16 = 0x8004;
pub const ATT_DATE_SENT: u16 = 0x8005;
pub const ATT_DATE_RECD: u16 = 0x8006;
pub const ATT_MESSAGE_CLASS: u16 = 0x8008;
pub const ATT_MESSAGE_ID: u16 = 0x8009;
pub const ATT_BODY: u16 = 0x800C;
pub const ATT_ATTACH_DATA: u16 = 0x800F;
pub const ATT_ATTACH_TITLE: u16 = 0x8010;
pub const ATT_ATTACH_REND_DATA: u16 = 0x9002;
pub const ATT_MSG_PROPS: u16 = 0x9003;
pub const ATT_ATTACHMENT: u16 = 0x9005;
pub const ATT_TNEF_VERSION: u16 = 0x9006;
pub const ATT_OEM_CODEPAGE: u16 = 0x9007;

/// A TNEF attribute other than the property blocks, which are parsed into
/// the `properties` of their owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    pub id: u16,
    pub data: Vec<u8>,
}

/// What kind of object a message class describes, as far as the bridge is
/// concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Contact,
    /// A read receipt; `true` if the message was actually read.
    ReadReceipt(bool),
    Other,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TnefMessage {
    pub key: u16,
    /// Attribute strings, already decoded from the OEM codepage.
    pub message_class: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub attributes: Vec<Attribute>,
    pub properties: Vec<Property>,
    pub attachments: Vec<Attachment>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attachment {
    pub title: Option<String>,
    pub data: Option<Vec<u8>>,
    pub attributes: Vec<Attribute>,
    pub properties: Vec<Property>,
    /// An embedded message, if this attachment is one.
    pub message: Option<Box<TnefMessage>>,
}

impl TnefMessage {
    pub fn property(&self, id: u16) -> Option<&Property> {
        mapi::find(&self.properties, id)
    }

    pub fn string_property(&self, id: u16) -> Option<&str> {
        mapi::find_str(&self.properties, id)
    }

    /// The message class from the attribute, or else from the property.
    pub fn class(&self) -> Option<&str> {
        self.message_class
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.string_property(mapi::PR_MESSAGE_CLASS))
    }

    pub fn kind(&self) -> MessageKind {
        let class = match self.class() {
            Some(class) => class.to_ascii_uppercase(),
            None => return MessageKind::Other,
        };

        if class.starts_with("IPM.CONTACT") {
            MessageKind::Contact
        } else if class.starts_with("REPORT.IPM.NOTE.IPNRN") {
            MessageKind::ReadReceipt(true)
        } else if class.starts_with("REPORT.IPM.NOTE.IPNNRN") {
            MessageKind::ReadReceipt(false)
        } else {
            MessageKind::Other
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.string_property(mapi::PR_SUBJECT)
            .or_else(|| self.subject.as_deref().filter(|s| !s.is_empty()))
    }

    /// The raw `PR_RTF_COMPRESSED` body, if any.
    pub fn compressed_rtf(&self) -> Option<&[u8]> {
        self.property(mapi::PR_RTF_COMPRESSED)
            .and_then(Property::as_bytes)
    }
}

impl Attachment {
    pub fn property(&self, id: u16) -> Option<&Property> {
        mapi::find(&self.properties, id)
    }

    /// The best available file name.
    pub fn filename(&self) -> Option<&str> {
        mapi::find_str(&self.properties, mapi::PR_ATTACH_LONG_FILENAME)
            .or_else(|| self.title.as_deref().filter(|s| !s.trim().is_empty()))
            .or_else(|| {
                mapi::find_str(&self.properties, mapi::PR_ATTACH_FILENAME)
            })
            .or_else(|| mapi::find_str(&self.properties, mapi::PR_DISPLAY_NAME))
    }

    /// The MIME type Outlook recorded for the attachment.
    pub fn mime_tag(&self) -> Option<&str> {
        mapi::find_str(&self.properties, mapi::PR_ATTACH_MIME_TAG)
    }

    /// The file content, from the attribute or else the data property.
    pub fn content(&self) -> Option<&[u8]> {
        self.data.as_deref().or_else(|| {
            match self.property(mapi::PR_ATTACH_DATA_OBJ)?.value()? {
                &PropValue::Binary(ref data) => Some(data.as_slice()),
                _ => None,
            }
        })
    }
}
