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

use std::cell::OnceCell;
use std::fmt;
use std::io::{self, Read};

use bitflags::bitflags;
use chrono::prelude::*;

pub use super::header::{ContentDisposition, ContentType};

/// Access to one node of a pre-parsed message content tree.
///
/// Implementations are usually views over some backing storage; content is
/// only read when the walker needs it. All content is returned with any
/// transfer encoding already removed.
pub trait Part {
    /// The declared content type, if any.
    fn content_type(&self) -> Option<ContentType>;

    /// The declared content disposition, if any.
    fn content_disposition(&self) -> Option<ContentDisposition> {
        None
    }

    /// The `Content-ID`, without angle brackets.
    fn content_id(&self) -> Option<String> {
        None
    }

    /// The declared size of the content in bytes, if known.
    fn size(&self) -> Option<u64> {
        None
    }

    /// Open the (transfer-decoded) content for reading.
    fn open(&self) -> io::Result<Box<dyn Read + '_>>;

    /// The number of directly enclosed parts.
    ///
    /// Only meaningful for multipart nodes. A negative value indicates the
    /// enclosed parts could not be determined.
    fn enclosed_count(&self) -> i64 {
        0
    }

    /// Access the enclosed part at the 0-based `index`.
    fn enclosed_part(&self, index: usize) -> io::Result<Box<dyn Part + '_>> {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no enclosed part {}", index),
        ))
    }

    /// The cache for this part's sequence id.
    ///
    /// The walker fills it in exactly once; it is never changed afterwards.
    fn sequence_id_slot(&self) -> &OnceCell<String>;

    /// The sequence id assigned to this part, if it has been walked.
    fn sequence_id(&self) -> Option<&str> {
        self.sequence_id_slot().get().map(String::as_str)
    }

    /// The raw (not yet header-decoded) file name of this part.
    ///
    /// This comes from the `filename` disposition parameter if there is one,
    /// and the `name` content type parameter otherwise.
    fn raw_filename(&self) -> Option<String> {
        self.content_disposition()
            .and_then(|cd| cd.filename().map(str::to_owned))
            .or_else(|| {
                self.content_type().and_then(|ct| {
                    ct.parm("name")
                        .filter(|n| !n.trim().is_empty())
                        .map(str::to_owned)
                })
            })
    }

    /// Read the entire content into memory.
    fn read_content(&self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.open()?.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl<'a, P: Part + ?Sized> Part for &'a P {
    fn content_type(&self) -> Option<ContentType> {
        (**self).content_type()
    }

    fn content_disposition(&self) -> Option<ContentDisposition> {
        (**self).content_disposition()
    }

    fn content_id(&self) -> Option<String> {
        (**self).content_id()
    }

    fn size(&self) -> Option<u64> {
        (**self).size()
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        (**self).open()
    }

    fn enclosed_count(&self) -> i64 {
        (**self).enclosed_count()
    }

    fn enclosed_part(&self, index: usize) -> io::Result<Box<dyn Part + '_>> {
        (**self).enclosed_part(index)
    }

    fn sequence_id_slot(&self) -> &OnceCell<String> {
        (**self).sequence_id_slot()
    }
}

/// A part held entirely in memory.
///
/// This is what the container bridge produces for the content it decodes, and
/// is also convenient for callers which already have a parsed tree in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryPart {
    content_type: Option<ContentType>,
    content_disposition: Option<ContentDisposition>,
    content_id: Option<String>,
    data: Vec<u8>,
    children: Vec<MemoryPart>,
    sequence_id: OnceCell<String>,
}

impl MemoryPart {
    pub fn new(content_type: ContentType, data: impl Into<Vec<u8>>) -> Self {
        MemoryPart {
            content_type: Some(content_type),
            data: data.into(),
            ..MemoryPart::default()
        }
    }

    /// Create a part from a raw `Content-Type` value.
    pub fn parse(content_type: &str, data: impl Into<Vec<u8>>) -> Self {
        MemoryPart::new(ContentType::parse_or_default(content_type), data)
    }

    /// Create a part with no declared content type.
    pub fn untyped(data: impl Into<Vec<u8>>) -> Self {
        MemoryPart {
            data: data.into(),
            ..MemoryPart::default()
        }
    }

    pub fn multipart(
        content_type: ContentType,
        children: Vec<MemoryPart>,
    ) -> Self {
        MemoryPart {
            content_type: Some(content_type),
            children,
            ..MemoryPart::default()
        }
    }

    pub fn with_disposition(mut self, cd: ContentDisposition) -> Self {
        self.content_disposition = Some(cd);
        self
    }

    /// Set the disposition from a raw `Content-Disposition` value.
    pub fn with_raw_disposition(mut self, cd: &str) -> Self {
        self.content_disposition = super::header::parse_content_disposition(cd);
        self
    }

    pub fn with_content_id(mut self, id: &str) -> Self {
        let id = id.trim().trim_start_matches('<').trim_end_matches('>');
        self.content_id = Some(id.to_owned());
        self
    }

    pub fn with_child(mut self, child: MemoryPart) -> Self {
        self.children.push(child);
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn children(&self) -> &[MemoryPart] {
        &self.children
    }
}

impl Part for MemoryPart {
    fn content_type(&self) -> Option<ContentType> {
        self.content_type.clone()
    }

    fn content_disposition(&self) -> Option<ContentDisposition> {
        self.content_disposition.clone()
    }

    fn content_id(&self) -> Option<String> {
        self.content_id.clone()
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn open(&self) -> io::Result<Box<dyn Read + '_>> {
        Ok(Box::new(&self.data[..]))
    }

    fn enclosed_count(&self) -> i64 {
        self.children.len() as i64
    }

    fn enclosed_part(&self, index: usize) -> io::Result<Box<dyn Part + '_>> {
        match self.children.get(index) {
            Some(child) => Ok(Box::new(child)),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no enclosed part {}", index),
            )),
        }
    }

    fn sequence_id_slot(&self) -> &OnceCell<String> {
        &self.sequence_id
    }

    fn read_content(&self) -> io::Result<Vec<u8>> {
        Ok(self.data.clone())
    }
}

bitflags! {
    /// The system flags of a stored message.
    #[derive(Default)]
    pub struct SystemFlags: u32 {
        const ANSWERED = 1 << 0;
        const DELETED = 1 << 1;
        const DRAFT = 1 << 2;
        const FLAGGED = 1 << 3;
        const RECENT = 1 << 4;
        const SEEN = 1 << 5;
        const USER = 1 << 6;
        const SPAM = 1 << 7;
        const FORWARDED = 1 << 8;
        const READ_ACK = 1 << 9;
    }
}

/// The priority of a message, as conveyed by `X-Priority`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Highest = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Lowest = 5,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

impl Priority {
    /// Interpret an `X-Priority` header value such as `1 (Highest)`.
    pub fn from_x_priority(value: &str) -> Self {
        match value.trim().chars().next() {
            Some('1') => Priority::Highest,
            Some('2') => Priority::High,
            Some('4') => Priority::Low,
            Some('5') => Priority::Lowest,
            _ => Priority::Normal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailAddress {
    pub personal: Option<String>,
    pub address: String,
}

impl EmailAddress {
    pub fn new(address: &str) -> Self {
        EmailAddress {
            personal: None,
            address: address.to_owned(),
        }
    }

    pub fn with_personal(address: &str, personal: &str) -> Self {
        EmailAddress {
            personal: Some(personal.to_owned()),
            address: address.to_owned(),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.personal {
            Some(ref personal) => {
                write!(f, "\"{}\" <{}>", personal.replace('"', "\\\""), self.address)
            }
            None => write!(f, "{}", self.address),
        }
    }
}

/// The header-level facts of a message, as stored alongside it.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub bcc: Vec<EmailAddress>,
    /// The raw subject, possibly containing encoded words.
    pub subject: Option<String>,
    pub sent_date: Option<DateTime<FixedOffset>>,
    pub received_date: Option<DateTime<Utc>>,
    /// The system flags, if they were loaded.
    pub flags: Option<SystemFlags>,
    pub user_flags: Vec<String>,
    pub color_label: u8,
    pub priority: Priority,
    /// The reference to the message this one was derived from, such as the
    /// original of a forward.
    pub message_reference: Option<String>,
    /// Where a disposition notification (read receipt) is requested to go.
    pub disposition_notification_to: Option<EmailAddress>,
    /// The state of the `\Seen` flag before the message was last opened.
    pub previously_seen: Option<bool>,
    /// All headers in their original order.
    pub headers: Vec<(String, String)>,
}

impl Envelope {
    /// Look up the first header named `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
            .map(|&(_, ref v)| v.as_str())
    }
}

/// A message handed to the walker.
pub struct Message<'a> {
    /// Identity of the message in its store, used for diagnostics.
    pub mail_id: Option<String>,
    /// The folder the message lives in, used for diagnostics.
    pub folder: Option<String>,
    pub envelope: Envelope,
    /// The root content part, borrowed for the duration of the walk.
    pub body: Option<&'a dyn Part>,
}

impl<'a> Message<'a> {
    pub fn new(envelope: Envelope, body: &'a dyn Part) -> Self {
        Message {
            mail_id: None,
            folder: None,
            envelope,
            body: Some(body),
        }
    }

    pub fn with_location(mut self, folder: &str, mail_id: &str) -> Self {
        self.folder = Some(folder.to_owned());
        self.mail_id = Some(mail_id.to_owned());
        self
    }
}

impl fmt::Debug for Message<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Message")
            .field("mail_id", &self.mail_id)
            .field("folder", &self.folder)
            .field("envelope", &self.envelope)
            .field("body", &self.body.map(|_| "<part>"))
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn memory_part_accessors() {
        let part = MemoryPart::parse("text/plain; name=\"a.txt\"", "hello")
            .with_content_id("<cid@x>");
        assert_eq!(Some(5), part.size());
        assert_eq!(b"hello".to_vec(), part.read_content().unwrap());
        assert_eq!(Some("cid@x".to_owned()), part.content_id());
        assert_eq!(Some("a.txt".to_owned()), part.raw_filename());
        assert_eq!(0, part.enclosed_count());
        assert!(part.enclosed_part(0).is_err());

        let part = part.with_raw_disposition("attachment; filename=b.txt");
        assert_eq!(Some("b.txt".to_owned()), part.raw_filename());
    }

    #[test]
    fn memory_part_children() {
        let mp = MemoryPart::multipart(
            ContentType::new("multipart", "mixed"),
            vec![MemoryPart::parse("text/plain", "a")],
        )
        .with_child(MemoryPart::parse("text/html", "<b/>"));

        assert_eq!(2, mp.enclosed_count());
        let second = mp.enclosed_part(1).unwrap();
        assert_eq!(
            "text/html",
            second.content_type().unwrap().base_type()
        );
        assert!(mp.enclosed_part(2).is_err());
    }

    #[test]
    fn sequence_id_is_assigned_once() {
        let part = MemoryPart::untyped("x");
        assert_eq!(None, part.sequence_id());
        assert_eq!("1.2", part.sequence_id_slot().get_or_init(|| "1.2".to_owned()));
        assert_eq!("1.2", part.sequence_id_slot().get_or_init(|| "9".to_owned()));
        assert_eq!(Some("1.2"), part.sequence_id());
    }

    #[test]
    fn parse_priority() {
        assert_eq!(Priority::Highest, Priority::from_x_priority("1 (Highest)"));
        assert_eq!(Priority::Low, Priority::from_x_priority(" 4"));
        assert_eq!(Priority::Normal, Priority::from_x_priority("urgent"));
    }

    #[test]
    fn format_address() {
        assert_eq!("a@b.c", EmailAddress::new("a@b.c").to_string());
        assert_eq!(
            "\"Jo \\\"J\\\"\" <a@b.c>",
            EmailAddress::with_personal("a@b.c", "Jo \"J\"").to_string()
        );
    }
}
