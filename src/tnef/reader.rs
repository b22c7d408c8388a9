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

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use encoding_rs::{Encoding, WINDOWS_1252};
use log::{debug, warn};

use super::mapi::{self, PropValue};
use super::*;

const SIGNATURE: u32 = 0x223E_9F78;

/// How deeply embedded messages may nest before the stream is rejected.
pub const MAX_NESTING: u32 = 8;

/// Decode a TNEF stream.
pub fn read(data: &[u8]) -> Result<TnefMessage, Error> {
    read_nested(data, 0)
}

fn read_nested(data: &[u8], depth: u32) -> Result<TnefMessage, Error> {
    if depth > MAX_NESTING {
        return Err(Error::TooDeep);
    }

    let mut r = Cursor::new(data);
    let signature = r.read_u32::<LittleEndian>()?;
    if SIGNATURE != signature {
        return Err(Error::BadSignature(signature));
    }

    let mut message = TnefMessage {
        key: r.read_u16::<LittleEndian>()?,
        ..TnefMessage::default()
    };
    let mut codepage: &'static Encoding = WINDOWS_1252;

    while (r.position() as usize) < data.len() {
        let level = r.read_u8()?;
        // The upper 16 bits are the attribute's data type, which is implied
        // by the id anyway.
        let id = (r.read_u32::<LittleEndian>()? & 0xFFFF) as u16;
        let len = r.read_u32::<LittleEndian>()? as usize;
        if len > data.len() - r.position() as usize {
            return Err(Error::Truncated);
        }

        let mut value = vec![0u8; len];
        r.read_exact(&mut value)?;
        let checksum = r.read_u16::<LittleEndian>()?;
        let sum = value
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
        if sum != checksum {
            return Err(Error::BadChecksum(id));
        }

        match level {
            LVL_MESSAGE => {
                message_attribute(&mut message, &mut codepage, id, value)?
            }
            LVL_ATTACHMENT => attachment_attribute(
                &mut message,
                codepage,
                id,
                value,
                depth,
            )?,
            _ => return Err(Error::BadLevel(level)),
        }
    }

    debug!(
        "read TNEF message class {:?} with {} attachments",
        message.class(),
        message.attachments.len()
    );
    Ok(message)
}

fn message_attribute(
    message: &mut TnefMessage,
    codepage: &mut &'static Encoding,
    id: u16,
    value: Vec<u8>,
) -> Result<(), Error> {
    match id {
        ATT_OEM_CODEPAGE => {
            if value.len() >= 4 {
                *codepage =
                    codepage_encoding(LittleEndian::read_u32(&value[..4]));
            }
        }
        ATT_MESSAGE_CLASS => {
            message.message_class =
                Some(mapi::decode_string8(&value, *codepage))
        }
        ATT_SUBJECT => {
            message.subject = Some(mapi::decode_string8(&value, *codepage))
        }
        ATT_BODY => {
            message.body = Some(mapi::decode_string8(&value, *codepage))
        }
        ATT_MSG_PROPS => message
            .properties
            .extend(mapi::parse_properties(&value, *codepage)?),
        _ => message.attributes.push(Attribute { id, data: value }),
    }

    Ok(())
}

fn attachment_attribute(
    message: &mut TnefMessage,
    codepage: &'static Encoding,
    id: u16,
    value: Vec<u8>,
    depth: u32,
) -> Result<(), Error> {
    // attAttachRendData starts each attachment; tolerate streams which
    // omit it.
    if ATT_ATTACH_REND_DATA == id || message.attachments.is_empty() {
        message.attachments.push(Attachment::default());
    }

    let attachment = match message.attachments.last_mut() {
        Some(attachment) => attachment,
        None => return Ok(()),
    };

    match id {
        ATT_ATTACH_TITLE => {
            attachment.title = Some(mapi::decode_string8(&value, codepage))
        }
        ATT_ATTACH_DATA => attachment.data = Some(value),
        ATT_ATTACHMENT => {
            let props = mapi::parse_properties(&value, codepage)?;
            for prop in &props {
                if let Some(&PropValue::Object { iid, ref data }) = prop.value() {
                    if mapi::PR_ATTACH_DATA_OBJ == prop.id
                        && mapi::IID_IMESSAGE == iid
                    {
                        attachment.message =
                            Some(Box::new(read_nested(data, depth + 1)?));
                    }
                }
            }
            attachment.properties.extend(props);
        }
        _ => attachment.attributes.push(Attribute { id, data: value }),
    }

    Ok(())
}

fn codepage_encoding(cp: u32) -> &'static Encoding {
    let label = match cp {
        65001 => "utf-8".to_owned(),
        932 => "shift_jis".to_owned(),
        936 => "gbk".to_owned(),
        949 => "euc-kr".to_owned(),
        950 => "big5".to_owned(),
        20866 => "koi8-r".to_owned(),
        28591..=28606 => format!("iso-8859-{}", cp - 28590),
        cp => format!("windows-{}", cp),
    };

    Encoding::for_label_no_replacement(label.as_bytes()).unwrap_or_else(|| {
        warn!("unsupported TNEF codepage {}", cp);
        WINDOWS_1252
    })
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;
    use crate::tnef::builder::{PropsBuilder, TnefBuilder};

    #[test]
    fn read_message_with_attachment() {
        let data = TnefBuilder::new()
            .message_class("IPM.Microsoft Mail.Note")
            .subject("Quarterly")
            .message_props(
                PropsBuilder::new().string(mapi::PR_SUBJECT, "Quarterly report"),
            )
            .attachment("report.pdf", b"%PDF-1.4")
            .attachment_props(
                PropsBuilder::new()
                    .string(mapi::PR_ATTACH_LONG_FILENAME, "Quarterly report.pdf")
                    .string(mapi::PR_ATTACH_MIME_TAG, "application/pdf"),
            )
            .build();

        let message = read(&data).unwrap();
        assert_eq!(Some("IPM.Microsoft Mail.Note"), message.class());
        assert_eq!(MessageKind::Other, message.kind());
        assert_eq!(Some("Quarterly report"), message.subject());
        assert_eq!(1, message.attachments.len());

        let attachment = &message.attachments[0];
        assert_eq!(Some("Quarterly report.pdf"), attachment.filename());
        assert_eq!(Some("application/pdf"), attachment.mime_tag());
        assert_eq!(Some(&b"%PDF-1.4"[..]), attachment.content());
        assert!(attachment.message.is_none());
    }

    #[test]
    fn message_kinds() {
        let kind = |class: &str| {
            read(&TnefBuilder::new().message_class(class).build())
                .unwrap()
                .kind()
        };

        assert_eq!(MessageKind::Contact, kind("IPM.Contact"));
        assert_eq!(
            MessageKind::ReadReceipt(true),
            kind("REPORT.IPM.Note.IPNRN")
        );
        assert_eq!(
            MessageKind::ReadReceipt(false),
            kind("Report.IPM.Note.IPNNRN")
        );
        assert_eq!(MessageKind::Other, kind("IPM.Note"));
    }

    #[test]
    fn codepage_applies_to_later_strings() {
        let data = TnefBuilder::new()
            .oem_codepage(1251)
            .raw_attribute(LVL_MESSAGE, 0x0001_8004, b"\xcf\xf0\xe8\xe2\xe5\xf2\0")
            .build();
        assert_eq!(Some("Привет"), read(&data).unwrap().subject.as_deref());
    }

    #[test]
    fn embedded_message() {
        let inner = TnefBuilder::new()
            .message_class("IPM.Note")
            .subject("Inner")
            .build();
        let data = TnefBuilder::new()
            .attachment("Inner", b"")
            .attachment_props(
                PropsBuilder::new()
                    .long(mapi::PR_ATTACH_METHOD, 5)
                    .object(mapi::PR_ATTACH_DATA_OBJ, mapi::IID_IMESSAGE, &inner),
            )
            .build();

        let message = read(&data).unwrap();
        let attachment = &message.attachments[0];
        assert_eq!(
            Some("Inner"),
            attachment.message.as_ref().and_then(|m| m.subject())
        );
    }

    #[test]
    fn reject_bad_streams() {
        assert_matches!(Err(Error::BadSignature(0)), read(&[0u8; 8]));
        assert_matches!(Err(Error::Io(_)), read(&[0x78, 0x9F]));

        let mut data = TnefBuilder::new().subject("hello").build();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert_matches!(Err(Error::BadChecksum(ATT_SUBJECT)), read(&data));

        let data = TnefBuilder::new().raw_attribute(7, 0x8004, b"x").build();
        assert_matches!(Err(Error::BadLevel(7)), read(&data));

        let mut data = TnefBuilder::new().subject("hello").build();
        data.truncate(data.len() - 4);
        assert_matches!(Err(Error::Truncated), read(&data));
    }

    #[test]
    fn reject_deep_nesting() {
        let mut data = TnefBuilder::new().subject("bottom").build();
        for _ in 0..=MAX_NESTING {
            data = TnefBuilder::new()
                .attachment("nested", b"")
                .attachment_props(PropsBuilder::new().object(
                    mapi::PR_ATTACH_DATA_OBJ,
                    mapi::IID_IMESSAGE,
                    &data,
                ))
                .build();
        }

        assert_matches!(Err(Error::TooDeep), read(&data));
    }

    proptest! {
        #[test]
        fn read_never_panics(
            body in prop::collection::vec(any::<u8>(), 0..300)
        ) {
            let mut data = vec![0x78, 0x9F, 0x3E, 0x22, 0x01, 0x00];
            data.extend_from_slice(&body);
            let _ = read(&data);
        }
    }
}
