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

use chrono::prelude::*;

use super::model::*;
use super::uuencode::UuFile;

/// Returned by a `Handler` callback to stop the walk.
///
/// Once any callback halts, no more part-level callbacks are made, but
/// `message_end` is still called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Halt;

/// The result of every `Handler` callback other than `message_end`.
pub type Flow = Result<(), Halt>;

/// Facts about a part which is reported as a whole, rather than as decoded
/// text.
#[derive(Clone, Copy)]
pub struct PartInfo<'a> {
    pub part: &'a dyn Part,
    /// The `type/subtype` of the part, lower-case.
    pub base_type: &'a str,
    pub inline: bool,
    /// The decoded or synthesised file name.
    pub filename: &'a str,
    pub sequence_id: &'a str,
}

/// A text part which has been decoded for display.
#[derive(Clone, Copy)]
pub struct InlineText<'a> {
    pub part: &'a dyn Part,
    pub content_type: &'a ContentType,
    pub text: &'a str,
    /// The declared size of the part, or the number of bytes read if the size
    /// was not declared.
    pub size: u64,
    pub filename: &'a str,
    pub sequence_id: &'a str,
}

/// A file which was found uuencoded inside a text part.
#[derive(Clone, Copy)]
pub struct UuAttachment<'a> {
    pub file: &'a UuFile,
    /// The type implied by the file name, or `application/octet-stream`.
    pub base_type: &'a str,
    pub sequence_id: &'a str,
}

/// Receives the events produced by walking a message.
///
/// Envelope callbacks are made first, in the order they are declared here,
/// followed by the part callbacks in pre-order, and finally `message_end`.
/// Every method has a default implementation which does nothing and continues
/// the walk.
#[allow(unused_variables)]
pub trait Handler {
    fn from(&mut self, addresses: &[EmailAddress]) -> Flow {
        Ok(())
    }

    fn to_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        Ok(())
    }

    fn cc_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        Ok(())
    }

    fn bcc_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        Ok(())
    }

    /// Receives the header-decoded subject. Called with an empty string if
    /// the message has no subject.
    fn subject(&mut self, subject: &str) -> Flow {
        Ok(())
    }

    fn sent_date(&mut self, date: DateTime<FixedOffset>) -> Flow {
        Ok(())
    }

    fn received_date(&mut self, date: DateTime<Utc>) -> Flow {
        Ok(())
    }

    fn system_flags(&mut self, flags: SystemFlags) -> Flow {
        Ok(())
    }

    fn user_flags(&mut self, flags: &[String]) -> Flow {
        Ok(())
    }

    fn color_label(&mut self, label: u8) -> Flow {
        Ok(())
    }

    fn priority(&mut self, priority: Priority) -> Flow {
        Ok(())
    }

    fn content_id(&mut self, content_id: &str) -> Flow {
        Ok(())
    }

    fn message_reference(&mut self, reference: &str) -> Flow {
        Ok(())
    }

    /// The message requests a disposition notification be sent to `to`.
    ///
    /// `seen` is whether the message had already been seen when the request
    /// was evaluated.
    fn disposition_notification(
        &mut self,
        to: &EmailAddress,
        seen: bool,
    ) -> Flow {
        Ok(())
    }

    fn headers(&mut self, headers: &[(String, String)]) -> Flow {
        Ok(())
    }

    fn inline_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        Ok(())
    }

    /// An inline text part which contained uuencoded files. `text` holds
    /// everything outside the encoded files.
    fn inline_uuencoded_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        Ok(())
    }

    fn inline_uuencoded_attachment(
        &mut self,
        attachment: &UuAttachment<'_>,
    ) -> Flow {
        Ok(())
    }

    fn inline_html(&mut self, html: &InlineText<'_>) -> Flow {
        Ok(())
    }

    /// The start of a multipart with `count` enclosed parts, which will be
    /// reported next.
    fn multipart(
        &mut self,
        part: &dyn Part,
        count: usize,
        sequence_id: &str,
    ) -> Flow {
        Ok(())
    }

    fn image_part(
        &mut self,
        image: &PartInfo<'_>,
        content_id: Option<&str>,
    ) -> Flow {
        Ok(())
    }

    fn nested_message(&mut self, part: &dyn Part, sequence_id: &str) -> Flow {
        Ok(())
    }

    fn attachment(&mut self, attachment: &PartInfo<'_>) -> Flow {
        Ok(())
    }

    /// Delivery reports, disposition notifications, raw header dumps, vCards
    /// and calendar objects.
    fn special_part(&mut self, special: &PartInfo<'_>) -> Flow {
        Ok(())
    }

    /// Always the final callback of a successful parse, whether or not the
    /// walk was halted.
    fn message_end(&mut self, message: &Message<'_>) {}
}
