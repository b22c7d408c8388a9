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

//! MAPI property blocks, as found in the `attMsgProps` and `attAttachment`
//! attributes of a TNEF stream.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use encoding_rs::{Encoding, UTF_16LE};

use super::Error;

pub const PT_SHORT: u16 = 0x0002;
pub const PT_LONG: u16 = 0x0003;
pub const PT_FLOAT: u16 = 0x0004;
pub const PT_DOUBLE: u16 = 0x0005;
pub const PT_CURRENCY: u16 = 0x0006;
pub const PT_APPTIME: u16 = 0x0007;
pub const PT_ERROR: u16 = 0x000A;
pub const PT_BOOLEAN: u16 = 0x000B;
pub const PT_OBJECT: u16 = 0x000D;
pub const PT_I8: u16 = 0x0014;
pub const PT_STRING8: u16 = 0x001E;
pub const PT_UNICODE: u16 = 0x001F;
pub const PT_SYSTIME: u16 = 0x0040;
pub const PT_CLSID: u16 = 0x0048;
pub const PT_BINARY: u16 = 0x0102;
const MV_FLAG: u16 = 0x1000;

pub const PR_MESSAGE_CLASS: u16 = 0x001A;
pub const PR_SUBJECT: u16 = 0x0037;
pub const PR_ORIGINAL_SUBJECT: u16 = 0x0049;
pub const PR_SENT_REPRESENTING_EMAIL_ADDRESS: u16 = 0x0065;
pub const PR_SENDER_NAME: u16 = 0x0C1A;
pub const PR_SENDER_EMAIL_ADDRESS: u16 = 0x0C1F;
pub const PR_BODY: u16 = 0x1000;
pub const PR_RTF_COMPRESSED: u16 = 0x1009;
pub const PR_DISPLAY_NAME: u16 = 0x3001;
pub const PR_EMAIL_ADDRESS: u16 = 0x3003;
pub const PR_ATTACH_DATA_OBJ: u16 = 0x3701;
pub const PR_ATTACH_FILENAME: u16 = 0x3704;
pub const PR_ATTACH_METHOD: u16 = 0x3705;
pub const PR_ATTACH_LONG_FILENAME: u16 = 0x3707;
pub const PR_ATTACH_MIME_TAG: u16 = 0x370E;
pub const PR_GIVEN_NAME: u16 = 0x3A06;
pub const PR_BUSINESS_TELEPHONE_NUMBER: u16 = 0x3A08;
pub const PR_HOME_TELEPHONE_NUMBER: u16 = 0x3A09;
pub const PR_SURNAME: u16 = 0x3A11;
pub const PR_COMPANY_NAME: u16 = 0x3A16;
pub const PR_TITLE: u16 = 0x3A17;
pub const PR_MOBILE_TELEPHONE_NUMBER: u16 = 0x3A1C;

/// Property set holding contact addresses (`PSETID_Address`).
pub const PSETID_ADDRESS: Guid = Guid([
    0x04, 0x20, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x46,
]);
/// `PidLidEmail1EmailAddress` within `PSETID_ADDRESS`.
pub const LID_EMAIL1_ADDRESS: u32 = 0x8083;

/// The interface id marking a `PT_OBJECT` value as an embedded message.
pub const IID_IMESSAGE: Guid = Guid([
    0x07, 0x03, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x46,
]);

/// A GUID in its on-the-wire byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Guid(pub [u8; 16]);

/// The name of a named property (id `>= 0x8000`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropName {
    Id(Guid, u32),
    Name(Guid, String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    Short(i16),
    Long(i32),
    Boolean(bool),
    Float(f32),
    Double(f64),
    /// Currency, application time and other 64-bit values.
    I8(i64),
    /// A `FILETIME`: 100ns units since 1601-01-01.
    SysTime(u64),
    Error(u32),
    Clsid(Guid),
    String(String),
    Binary(Vec<u8>),
    Object { iid: Guid, data: Vec<u8> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    pub id: u16,
    pub typ: u16,
    pub name: Option<PropName>,
    /// One value, or any number for multi-valued properties.
    pub values: Vec<PropValue>,
}

impl Property {
    pub fn value(&self) -> Option<&PropValue> {
        self.values.first()
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.value() {
            Some(&PropValue::String(ref s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self.value() {
            Some(&PropValue::Binary(ref b)) => Some(b),
            Some(&PropValue::Object { ref data, .. }) => Some(data),
            _ => None,
        }
    }

    pub fn is_named(&self, guid: Guid, lid: u32) -> bool {
        self.name == Some(PropName::Id(guid, lid))
    }
}

/// Look up the non-named property `id` in `props`.
pub fn find(props: &[Property], id: u16) -> Option<&Property> {
    props.iter().find(|p| p.id == id && p.name.is_none())
}

/// Look up a non-empty string property.
pub fn find_str(props: &[Property], id: u16) -> Option<&str> {
    find(props, id)
        .and_then(Property::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Parse a MAPI property block.
///
/// `PT_STRING8` values are decoded with `codepage`.
pub fn parse_properties(
    data: &[u8],
    codepage: &'static Encoding,
) -> Result<Vec<Property>, Error> {
    let mut r = Cursor::new(data);
    let count = r.read_u32::<LittleEndian>()? as usize;
    // Each property needs at least 8 bytes
    if count > data.len() / 8 {
        return Err(Error::BadProperties);
    }

    let mut props = Vec::with_capacity(count);
    for _ in 0..count {
        props.push(parse_property(&mut r, codepage)?);
    }

    Ok(props)
}

fn parse_property(
    r: &mut Cursor<&[u8]>,
    codepage: &'static Encoding,
) -> Result<Property, Error> {
    let typ = r.read_u16::<LittleEndian>()?;
    let id = r.read_u16::<LittleEndian>()?;

    let name = if id >= 0x8000 {
        let guid = read_guid(r)?;
        match r.read_u32::<LittleEndian>()? {
            0 => Some(PropName::Id(guid, r.read_u32::<LittleEndian>()?)),
            1 => {
                let raw = read_padded(r)?;
                Some(PropName::Name(guid, decode_utf16(&raw)))
            }
            _ => return Err(Error::BadProperties),
        }
    } else {
        None
    };

    let base_type = typ & !MV_FLAG;
    let count = if typ & MV_FLAG != 0 || is_variable(base_type) {
        let count = r.read_u32::<LittleEndian>()? as usize;
        if count > remaining(r) / 4 + 1 {
            return Err(Error::BadProperties);
        }
        count
    } else {
        1
    };

    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(parse_value(r, base_type, codepage)?);
    }

    Ok(Property {
        id,
        typ,
        name,
        values,
    })
}

fn is_variable(typ: u16) -> bool {
    PT_STRING8 == typ || PT_UNICODE == typ || PT_BINARY == typ || PT_OBJECT == typ
}

fn parse_value(
    r: &mut Cursor<&[u8]>,
    typ: u16,
    codepage: &'static Encoding,
) -> Result<PropValue, Error> {
    // Fixed-size values are all padded to at least 4 bytes
    Ok(match typ {
        PT_SHORT => {
            let v = r.read_i16::<LittleEndian>()?;
            r.read_u16::<LittleEndian>()?;
            PropValue::Short(v)
        }
        PT_LONG => PropValue::Long(r.read_i32::<LittleEndian>()?),
        PT_BOOLEAN => PropValue::Boolean(r.read_u32::<LittleEndian>()? != 0),
        PT_FLOAT => PropValue::Float(r.read_f32::<LittleEndian>()?),
        PT_ERROR => PropValue::Error(r.read_u32::<LittleEndian>()?),
        PT_DOUBLE => PropValue::Double(r.read_f64::<LittleEndian>()?),
        PT_CURRENCY | PT_APPTIME | PT_I8 => {
            PropValue::I8(r.read_i64::<LittleEndian>()?)
        }
        PT_SYSTIME => PropValue::SysTime(r.read_u64::<LittleEndian>()?),
        PT_CLSID => PropValue::Clsid(read_guid(r)?),
        PT_STRING8 => {
            let raw = read_padded(r)?;
            PropValue::String(decode_string8(&raw, codepage))
        }
        PT_UNICODE => PropValue::String(decode_utf16(&read_padded(r)?)),
        PT_BINARY => PropValue::Binary(read_padded(r)?),
        PT_OBJECT => {
            let raw = read_padded(r)?;
            if raw.len() < 16 {
                return Err(Error::BadProperties);
            }
            let mut iid = [0u8; 16];
            iid.copy_from_slice(&raw[..16]);
            PropValue::Object {
                iid: Guid(iid),
                data: raw[16..].to_vec(),
            }
        }
        _ => return Err(Error::BadProperties),
    })
}

fn remaining(r: &Cursor<&[u8]>) -> usize {
    r.get_ref().len().saturating_sub(r.position() as usize)
}

fn read_guid(r: &mut Cursor<&[u8]>) -> Result<Guid, Error> {
    let mut guid = [0u8; 16];
    r.read_exact(&mut guid)?;
    Ok(Guid(guid))
}

/// Read a length-prefixed value padded to a multiple of 4 bytes.
fn read_padded(r: &mut Cursor<&[u8]>) -> Result<Vec<u8>, Error> {
    let len = r.read_u32::<LittleEndian>()? as usize;
    if len > remaining(r) {
        return Err(Error::Truncated);
    }

    let mut data = vec![0u8; len];
    r.read_exact(&mut data)?;
    let padding = (4 - len % 4) % 4;
    let padding = padding.min(remaining(r));
    r.set_position(r.position() + padding as u64);
    Ok(data)
}

/// Decode an 8-bit string, dropping the NUL terminator.
pub fn decode_string8(raw: &[u8], codepage: &'static Encoding) -> String {
    let end = memchr::memchr(0, raw).unwrap_or(raw.len());
    codepage.decode_without_bom_handling(&raw[..end]).0.into_owned()
}

fn decode_utf16(raw: &[u8]) -> String {
    let s = UTF_16LE.decode_without_bom_handling(raw).0;
    s.trim_end_matches('\0').to_owned()
}
