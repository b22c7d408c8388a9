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

//! Conversion of TNEF objects which have standard MIME equivalents.

use std::fmt::Write as _;

use super::mapi::{self, Property};
use super::{Error, TnefMessage};
use crate::mime::header::{ContentDisposition, ContentType};
use crate::mime::model::MemoryPart;

/// Convert a contact (`IPM.Contact`) into a `multipart/mixed` holding a
/// single `text/vcard` attachment.
pub fn contact_to_vcard(message: &TnefMessage) -> Result<MemoryPart, Error> {
    let props = &message.properties;
    let given = mapi::find_str(props, mapi::PR_GIVEN_NAME);
    let surname = mapi::find_str(props, mapi::PR_SURNAME);

    let full_name = mapi::find_str(props, mapi::PR_DISPLAY_NAME)
        .map(str::to_owned)
        .or_else(|| match (given, surname) {
            (Some(g), Some(s)) => Some(format!("{} {}", g, s)),
            (Some(n), None) | (None, Some(n)) => Some(n.to_owned()),
            (None, None) => None,
        })
        .or_else(|| message.subject().map(str::to_owned))
        .ok_or(Error::Conversion("contact", "no name"))?;

    let email = props
        .iter()
        .find(|p| p.is_named(mapi::PSETID_ADDRESS, mapi::LID_EMAIL1_ADDRESS))
        .and_then(Property::as_str)
        .or_else(|| mapi::find_str(props, mapi::PR_EMAIL_ADDRESS))
        .filter(|s| !s.trim().is_empty());

    let mut card = String::new();
    line(&mut card, "BEGIN", "VCARD");
    line(&mut card, "VERSION", "3.0");
    line(&mut card, "FN", &escape(&full_name));
    line(
        &mut card,
        "N",
        &format!(
            "{};{};;;",
            escape(surname.unwrap_or("")),
            escape(given.unwrap_or(""))
        ),
    );
    optional(&mut card, "ORG", mapi::find_str(props, mapi::PR_COMPANY_NAME));
    optional(&mut card, "TITLE", mapi::find_str(props, mapi::PR_TITLE));
    optional(&mut card, "EMAIL;TYPE=INTERNET", email);
    optional(
        &mut card,
        "TEL;TYPE=WORK",
        mapi::find_str(props, mapi::PR_BUSINESS_TELEPHONE_NUMBER),
    );
    optional(
        &mut card,
        "TEL;TYPE=HOME",
        mapi::find_str(props, mapi::PR_HOME_TELEPHONE_NUMBER),
    );
    optional(
        &mut card,
        "TEL;TYPE=CELL",
        mapi::find_str(props, mapi::PR_MOBILE_TELEPHONE_NUMBER),
    );
    optional(
        &mut card,
        "NOTE",
        mapi::find_str(props, mapi::PR_BODY).or(message.body.as_deref()),
    );
    line(&mut card, "END", "VCARD");

    let filename = format!("{}.vcf", full_name.replace(|c| '/' == c || '\\' == c, "_"));
    let vcard = MemoryPart::new(
        ContentType::new("text", "vcard").with_parm("charset", "utf-8"),
        card,
    )
    .with_disposition(ContentDisposition::attachment(Some(&filename)));

    Ok(MemoryPart::multipart(
        ContentType::new("multipart", "mixed"),
        vec![vcard],
    ))
}

fn line(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, "{}:{}\r\n", name, value);
}

fn optional(out: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        line(out, name, &escape(value));
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' | ',' | ';' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            '\n' => escaped.push_str("\\n"),
            '\r' => (),
            ch => escaped.push(ch),
        }
    }
    escaped
}

/// Convert a read receipt (`REPORT.IPM.Note.IPNRN` or `IPNNRN`) into an RFC
/// 8098 `multipart/report`.
pub fn read_receipt_to_report(
    message: &TnefMessage,
    displayed: bool,
) -> Result<MemoryPart, Error> {
    let recipient = message
        .string_property(mapi::PR_SENDER_EMAIL_ADDRESS)
        .or_else(|| {
            message.string_property(mapi::PR_SENT_REPRESENTING_EMAIL_ADDRESS)
        })
        .map(one_line)
        .ok_or(Error::Conversion("read receipt", "no recipient"))?;
    let recipient_name = message
        .string_property(mapi::PR_SENDER_NAME)
        .map(one_line)
        .unwrap_or_else(|| recipient.clone());
    let original_subject = message
        .string_property(mapi::PR_ORIGINAL_SUBJECT)
        .or_else(|| message.subject())
        .map(one_line)
        .unwrap_or_default();
    let disposition = if displayed { "displayed" } else { "deleted" };

    let mut human = String::new();
    let _ = write!(
        human,
        "Your message\r\n\r\n  Subject: {}\r\n\r\nwas {} by {}.\r\n",
        original_subject,
        if displayed { "read" } else { "deleted without being read" },
        recipient_name
    );

    let mut mdn = String::new();
    let _ = write!(
        mdn,
        "Reporting-UA: {}; TNEF\r\n\
         Final-Recipient: rfc822; {}\r\n\
         Disposition: manual-action/MDN-sent-manually; {}\r\n",
        env!("CARGO_PKG_NAME"),
        recipient,
        disposition
    );

    Ok(MemoryPart::multipart(
        ContentType::new("multipart", "report")
            .with_parm("report-type", "disposition-notification"),
        vec![
            MemoryPart::new(
                ContentType::new("text", "plain").with_parm("charset", "utf-8"),
                human,
            ),
            MemoryPart::new(
                ContentType::new("message", "disposition-notification"),
                mdn,
            ),
        ],
    ))
}

fn one_line(s: &str) -> String {
    s.replace(|c| '\r' == c || '\n' == c, " ")
}
