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

//! A `Handler` which prints every event as a line of text.

use std::io::{self, Write};

use chrono::prelude::*;

use mimewalk::{
    EmailAddress, Flow, Halt, Handler, InlineText, Message, Part, PartInfo,
    Priority, SystemFlags, UuAttachment,
};

pub struct Dump<'a> {
    out: &'a mut dyn Write,
    error: Option<io::Error>,
}

impl<'a> Dump<'a> {
    pub fn new(out: &'a mut dyn Write) -> Self {
        Dump { out, error: None }
    }

    /// The first write error, if any. Writing stops at the first error.
    pub fn into_error(self) -> Option<io::Error> {
        self.error
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) -> Flow {
        let result = self
            .out
            .write_fmt(args)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = result {
            self.error = Some(e);
            return Err(Halt);
        }

        Ok(())
    }

    fn text(&mut self, label: &str, text: &InlineText<'_>) -> Flow {
        self.line(format_args!(
            "{} {} {} ({} bytes, {})",
            text.sequence_id,
            label,
            text.filename,
            text.size,
            text.content_type.base_type(),
        ))?;
        for line in text.text.lines() {
            self.line(format_args!("    | {}", line))?;
        }
        Ok(())
    }

    fn part(&mut self, label: &str, info: &PartInfo<'_>) -> Flow {
        self.line(format_args!(
            "{} {} {} ({}, {}{})",
            info.sequence_id,
            label,
            info.filename,
            info.base_type,
            if info.inline { "inline" } else { "attachment" },
            info.part
                .size()
                .map(|s| format!(", {} bytes", s))
                .unwrap_or_default(),
        ))
    }

    fn addresses(&mut self, label: &str, addresses: &[EmailAddress]) -> Flow {
        if addresses.is_empty() {
            return Ok(());
        }

        let joined = addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.line(format_args!("{}: {}", label, joined))
    }
}

impl Handler for Dump<'_> {
    fn from(&mut self, addresses: &[EmailAddress]) -> Flow {
        self.addresses("From", addresses)
    }

    fn to_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        self.addresses("To", addresses)
    }

    fn cc_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        self.addresses("Cc", addresses)
    }

    fn bcc_recipients(&mut self, addresses: &[EmailAddress]) -> Flow {
        self.addresses("Bcc", addresses)
    }

    fn subject(&mut self, subject: &str) -> Flow {
        self.line(format_args!("Subject: {}", subject))
    }

    fn sent_date(&mut self, date: DateTime<FixedOffset>) -> Flow {
        self.line(format_args!("Date: {}", date.to_rfc2822()))
    }

    fn received_date(&mut self, date: DateTime<Utc>) -> Flow {
        self.line(format_args!("Received: {}", date.to_rfc3339()))
    }

    fn system_flags(&mut self, flags: SystemFlags) -> Flow {
        if flags.is_empty() {
            Ok(())
        } else {
            self.line(format_args!("Flags: {:?}", flags))
        }
    }

    fn priority(&mut self, priority: Priority) -> Flow {
        if Priority::Normal == priority {
            Ok(())
        } else {
            self.line(format_args!("Priority: {:?}", priority))
        }
    }

    fn content_id(&mut self, content_id: &str) -> Flow {
        self.line(format_args!("Content-ID: <{}>", content_id))
    }

    fn disposition_notification(
        &mut self,
        to: &EmailAddress,
        seen: bool,
    ) -> Flow {
        self.line(format_args!(
            "Read receipt requested by {}{}",
            to,
            if seen { " (already seen)" } else { "" }
        ))
    }

    fn inline_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        self.text("text", text)
    }

    fn inline_uuencoded_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        self.text("text+uu", text)
    }

    fn inline_uuencoded_attachment(
        &mut self,
        attachment: &UuAttachment<'_>,
    ) -> Flow {
        self.line(format_args!(
            "{} uuencoded {} ({}, mode {:o}, {} bytes)",
            attachment.sequence_id,
            attachment.file.filename,
            attachment.base_type,
            attachment.file.mode,
            attachment.file.data.len(),
        ))
    }

    fn inline_html(&mut self, html: &InlineText<'_>) -> Flow {
        self.text("html", html)
    }

    fn multipart(
        &mut self,
        part: &dyn Part,
        count: usize,
        sequence_id: &str,
    ) -> Flow {
        let base_type = part
            .content_type()
            .map(|ct| ct.base_type())
            .unwrap_or_default();
        self.line(format_args!(
            "{} {} with {} parts",
            sequence_id, base_type, count
        ))
    }

    fn image_part(
        &mut self,
        image: &PartInfo<'_>,
        content_id: Option<&str>,
    ) -> Flow {
        self.part("image", image)?;
        if let Some(content_id) = content_id {
            self.line(format_args!("    Content-ID: <{}>", content_id))?;
        }
        Ok(())
    }

    fn nested_message(&mut self, _: &dyn Part, sequence_id: &str) -> Flow {
        self.line(format_args!("{} message/rfc822", sequence_id))
    }

    fn attachment(&mut self, attachment: &PartInfo<'_>) -> Flow {
        self.part("attachment", attachment)
    }

    fn special_part(&mut self, special: &PartInfo<'_>) -> Flow {
        self.part("special", special)
    }

    fn message_end(&mut self, message: &Message<'_>) {
        let _ = self.line(format_args!(
            "-- end of {}",
            message.mail_id.as_deref().unwrap_or("message")
        ));
    }
}
