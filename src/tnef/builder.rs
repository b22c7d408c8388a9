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

//! Writes TNEF streams, so tests can build fixtures without binary blobs.

use byteorder::{LittleEndian, WriteBytesExt};
use encoding_rs::WINDOWS_1252;

use super::mapi::*;
use super::*;

const SIGNATURE: u32 = 0x223E_9F78;

// Attribute ids including their data type
const ATT_ID_MESSAGE_CLASS: u32 = 0x0007_8008;
const ATT_ID_SUBJECT: u32 = 0x0001_8004;
const ATT_ID_ATTACH_REND_DATA: u32 = 0x0006_9002;
const ATT_ID_ATTACH_TITLE: u32 = 0x0001_8010;
const ATT_ID_ATTACH_DATA: u32 = 0x0006_800F;
const ATT_ID_MSG_PROPS: u32 = 0x0006_9003;
const ATT_ID_ATTACHMENT: u32 = 0x0006_9005;
const ATT_ID_OEM_CODEPAGE: u32 = 0x0006_9007;
const ATT_ID_TNEF_VERSION: u32 = 0x0008_9006;

pub struct TnefBuilder {
    out: Vec<u8>,
}

impl TnefBuilder {
    pub fn new() -> Self {
        let mut out = Vec::new();
        out.write_u32::<LittleEndian>(SIGNATURE).unwrap();
        out.write_u16::<LittleEndian>(0x0101).unwrap();
        TnefBuilder { out }.raw_attribute(
            LVL_MESSAGE,
            ATT_ID_TNEF_VERSION,
            &[0x00, 0x00, 0x01, 0x00],
        )
    }

    pub fn raw_attribute(mut self, level: u8, id: u32, data: &[u8]) -> Self {
        self.out.push(level);
        self.out.write_u32::<LittleEndian>(id).unwrap();
        self.out
            .write_u32::<LittleEndian>(data.len() as u32)
            .unwrap();
        self.out.extend_from_slice(data);
        let sum = data
            .iter()
            .fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)));
        self.out.write_u16::<LittleEndian>(sum).unwrap();
        self
    }

    pub fn oem_codepage(self, cp: u32) -> Self {
        let mut data = Vec::new();
        data.write_u32::<LittleEndian>(cp).unwrap();
        data.write_u32::<LittleEndian>(0).unwrap();
        self.raw_attribute(LVL_MESSAGE, ATT_ID_OEM_CODEPAGE, &data)
    }

    pub fn message_class(self, class: &str) -> Self {
        self.raw_attribute(LVL_MESSAGE, ATT_ID_MESSAGE_CLASS, &sz(class))
    }

    pub fn subject(self, subject: &str) -> Self {
        self.raw_attribute(LVL_MESSAGE, ATT_ID_SUBJECT, &sz(subject))
    }

    pub fn message_props(self, props: PropsBuilder) -> Self {
        self.raw_attribute(LVL_MESSAGE, ATT_ID_MSG_PROPS, &props.build())
    }

    /// Start a new attachment with the given title and data.
    pub fn attachment(self, title: &str, data: &[u8]) -> Self {
        self.raw_attribute(LVL_ATTACHMENT, ATT_ID_ATTACH_REND_DATA, &[0u8; 14])
            .raw_attribute(LVL_ATTACHMENT, ATT_ID_ATTACH_TITLE, &sz(title))
            .raw_attribute(LVL_ATTACHMENT, ATT_ID_ATTACH_DATA, data)
    }

    /// Add properties to the current attachment.
    pub fn attachment_props(self, props: PropsBuilder) -> Self {
        self.raw_attribute(LVL_ATTACHMENT, ATT_ID_ATTACHMENT, &props.build())
    }

    pub fn build(self) -> Vec<u8> {
        self.out
    }
}

fn sz(s: &str) -> Vec<u8> {
    let mut data = WINDOWS_1252.encode(s).0.into_owned();
    data.push(0);
    data
}

fn utf16z(s: &str) -> Vec<u8> {
    let mut data = Vec::new();
    for unit in s.encode_utf16().chain(Some(0)) {
        data.write_u16::<LittleEndian>(unit).unwrap();
    }
    data
}

#[derive(Default)]
pub struct PropsBuilder {
    count: u32,
    out: Vec<u8>,
}

impl PropsBuilder {
    pub fn new() -> Self {
        PropsBuilder::default()
    }

    fn tag(mut self, typ: u16, id: u16) -> Self {
        self.count += 1;
        self.out.write_u16::<LittleEndian>(typ).unwrap();
        self.out.write_u16::<LittleEndian>(id).unwrap();
        self
    }

    fn padded(mut self, data: &[u8]) -> Self {
        // One value
        self.out.write_u32::<LittleEndian>(1).unwrap();
        self.out
            .write_u32::<LittleEndian>(data.len() as u32)
            .unwrap();
        self.out.extend_from_slice(data);
        while 0 != self.out.len() % 4 {
            self.out.push(0);
        }
        self
    }

    pub fn string(self, id: u16, value: &str) -> Self {
        self.tag(PT_STRING8, id).padded(&sz(value))
    }

    pub fn unicode(self, id: u16, value: &str) -> Self {
        self.tag(PT_UNICODE, id).padded(&utf16z(value))
    }

    pub fn binary(self, id: u16, value: &[u8]) -> Self {
        self.tag(PT_BINARY, id).padded(value)
    }

    pub fn long(mut self, id: u16, value: i32) -> Self {
        self = self.tag(PT_LONG, id);
        self.out.write_i32::<LittleEndian>(value).unwrap();
        self
    }

    pub fn object(self, id: u16, iid: Guid, data: &[u8]) -> Self {
        let mut value = iid.0.to_vec();
        value.extend_from_slice(data);
        self.tag(PT_OBJECT, id).padded(&value)
    }

    /// A `PT_STRING8` named property identified by `lid` in `guid`.
    pub fn named_string(mut self, guid: Guid, lid: u32, value: &str) -> Self {
        let id = 0x8000 + self.count as u16;
        self = self.tag(PT_STRING8, id);
        self.out.extend_from_slice(&guid.0);
        self.out.write_u32::<LittleEndian>(0).unwrap();
        self.out.write_u32::<LittleEndian>(lid).unwrap();
        self.padded(&sz(value))
    }

    pub fn build(self) -> Vec<u8> {
        let mut block = Vec::with_capacity(4 + self.out.len());
        block.write_u32::<LittleEndian>(self.count).unwrap();
        block.extend_from_slice(&self.out);
        block
    }
}
