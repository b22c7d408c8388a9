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

//! Decides which handler callback a part is routed to, and how parts are
//! named.

use super::encoded_word::try_decode_header_value;
use super::header::ContentType;
use super::mime_types::ExtensionLookup;

/// The dispatch bucket of a part, determined from its content type alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    /// Plain text and its legacy rich relatives.
    Text,
    Html,
    Multipart,
    Image,
    /// An encapsulated `message/rfc822`.
    Message,
    /// A proprietary container which is unpacked by the bridge.
    Container,
    /// Reports and structured objects which handlers usually treat specially.
    Special,
    Other,
}

const TEXT_SUBTYPES: &[&str] = &["plain", "enriched", "richtext", "rtf"];

const CONTAINER_TYPES: &[(&str, &str)] = &[
    ("application", "ms-tnef"),
    ("application", "vnd.ms-tnef"),
];

const SPECIAL_TYPES: &[(&str, &str)] = &[
    ("message", "delivery-status"),
    ("message", "disposition-notification"),
    ("text", "rfc822-headers"),
    ("text", "x-vcard"),
    ("text", "vcard"),
    ("text", "directory"),
    ("text", "calendar"),
    ("text", "x-vcalendar"),
    ("application", "ics"),
];

fn is_any(ct: &ContentType, set: &[(&str, &str)]) -> bool {
    set.iter().any(|&(typ, subtype)| ct.is(typ, subtype))
}

impl PartKind {
    pub fn of(ct: &ContentType) -> Self {
        let subtype = ct.subtype.to_ascii_lowercase();

        if ct.is_type("text") && TEXT_SUBTYPES.contains(&subtype.as_str()) {
            PartKind::Text
        } else if ct.is_type("text")
            && (subtype.starts_with("htm") || "xhtml" == subtype)
        {
            PartKind::Html
        } else if ct.is_type("multipart") {
            PartKind::Multipart
        } else if ct.is_type("image") {
            PartKind::Image
        } else if ct.is("message", "rfc822") {
            PartKind::Message
        } else if is_any(ct, CONTAINER_TYPES) {
            PartKind::Container
        } else if is_any(ct, SPECIAL_TYPES) {
            PartKind::Special
        } else {
            PartKind::Other
        }
    }
}

/// Compute the sequence id of the part at 1-based `position` under `prefix`.
pub fn sequence_id(prefix: &str, position: usize) -> String {
    if prefix.is_empty() {
        position.to_string()
    } else {
        format!("{}.{}", prefix, position)
    }
}

/// Produce the file name reported for a part.
///
/// A declared name is header-decoded, falling back to the raw value if it
/// cannot be decoded. Parts without a usable name get one synthesised from
/// their sequence id and the preferred extension of their type, for example
/// `Part_1.2.pdf`.
pub fn display_filename(
    raw: Option<&str>,
    sequence_id: &str,
    base_type: &str,
    types: &dyn ExtensionLookup,
) -> String {
    if let Some(raw) = raw {
        match try_decode_header_value(raw) {
            Some(decoded) => {
                let decoded = decoded.trim();
                if !decoded.is_empty() {
                    return decoded.to_owned();
                }
            }
            None => return raw.to_owned(),
        }
    }

    let ext = types
        .extensions(base_type)
        .into_iter()
        .next()
        .unwrap_or_else(|| "dat".to_owned());
    format!("Part_{}.{}", sequence_id, ext)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mime::mime_types::BuiltinTypes;

    fn kind(ct: &str) -> PartKind {
        PartKind::of(&ContentType::parse_or_default(ct))
    }

    #[test]
    fn classification() {
        assert_eq!(PartKind::Text, kind("text/plain; charset=utf-8"));
        assert_eq!(PartKind::Text, kind("TEXT/Enriched"));
        assert_eq!(PartKind::Text, kind("text/richtext"));
        assert_eq!(PartKind::Text, kind("text/rtf"));
        assert_eq!(PartKind::Html, kind("text/html"));
        assert_eq!(PartKind::Html, kind("text/htm"));
        assert_eq!(PartKind::Html, kind("text/xhtml"));
        assert_eq!(PartKind::Multipart, kind("multipart/alternative"));
        assert_eq!(PartKind::Multipart, kind("multipart/x-whatever"));
        assert_eq!(PartKind::Image, kind("image/svg+xml"));
        assert_eq!(PartKind::Message, kind("message/rfc822"));
        assert_eq!(PartKind::Container, kind("application/ms-tnef"));
        assert_eq!(PartKind::Container, kind("application/vnd.ms-tnef"));
        assert_eq!(PartKind::Special, kind("message/delivery-status"));
        assert_eq!(PartKind::Special, kind("text/vcard"));
        assert_eq!(PartKind::Special, kind("text/calendar; method=REQUEST"));
        assert_eq!(PartKind::Special, kind("application/ics"));
        assert_eq!(PartKind::Other, kind("text/csv"));
        assert_eq!(PartKind::Other, kind("message/partial"));
        assert_eq!(PartKind::Other, kind("application/pdf"));
        assert_eq!(PartKind::Other, kind("garbage"));
    }

    #[test]
    fn sequence_ids() {
        assert_eq!("1", sequence_id("", 1));
        assert_eq!("1.3", sequence_id("1", 3));
        assert_eq!("2.1.10", sequence_id("2.1", 10));
    }

    #[test]
    fn filenames() {
        assert_eq!(
            "Grüße.pdf",
            display_filename(
                Some("=?UTF-8?Q?Gr=C3=BC=C3=9Fe.pdf?="),
                "2",
                "application/pdf",
                &BuiltinTypes
            )
        );
        assert_eq!(
            "Part_1.2.pdf",
            display_filename(None, "1.2", "application/pdf", &BuiltinTypes)
        );
        assert_eq!(
            "Part_3.dat",
            display_filename(Some("  "), "3", "x-foo/bar", &BuiltinTypes)
        );
    }

    #[test]
    fn undecodable_filename_is_kept_verbatim() {
        assert_eq!(
            " =?x-bogus?Q?foo?=.pdf ",
            display_filename(
                Some(" =?x-bogus?Q?foo?=.pdf "),
                "2",
                "application/pdf",
                &BuiltinTypes
            )
        );
    }
}
