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

//! Decompression of the "compressed RTF" (LZFu) format in which Outlook stores
//! message bodies.

use byteorder::{ByteOrder, LittleEndian};
use lazy_static::lazy_static;

use super::Error;

const COMPRESSED: u32 = 0x7546_5A4C; // "LZFu"
const UNCOMPRESSED: u32 = 0x414C_454D; // "MELA"

const HEADER_SIZE: usize = 16;
const DICT_SIZE: usize = 4096;

// Upper bound on what we will decompress, regardless of what the header
// claims.
const MAX_RAW_SIZE: usize = 64 * 1024 * 1024;

const PREBUF: &[u8] = b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}\
{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor \
MS Sans SerifSymbolArialTimes New RomanCourier\
{\\colortbl\\red0\\green0\\blue0\r\n\\par \
\\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

lazy_static! {
    static ref CRC_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        for (n, entry) in table.iter_mut().enumerate() {
            let mut c = n as u32;
            for _ in 0..8 {
                c = if c & 1 != 0 {
                    0xEDB8_8320 ^ (c >> 1)
                } else {
                    c >> 1
                };
            }
            *entry = c;
        }
        table
    };
}

/// The CRC used by compressed RTF: CRC-32 without the initial and final
/// inversion.
fn crc(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, &b| {
        CRC_TABLE[((crc ^ u32::from(b)) & 0xFF) as usize] ^ (crc >> 8)
    })
}

/// Decompress a `PR_RTF_COMPRESSED` property value into raw RTF.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, Error> {
    if data.len() < HEADER_SIZE {
        return Err(Error::BadRtf("truncated header"));
    }

    let comp_size = LittleEndian::read_u32(&data[0..4]) as usize;
    let raw_size = LittleEndian::read_u32(&data[4..8]) as usize;
    let magic = LittleEndian::read_u32(&data[8..12]);
    let expected_crc = LittleEndian::read_u32(&data[12..16]);

    if raw_size > MAX_RAW_SIZE {
        return Err(Error::BadRtf("implausible size"));
    }

    // comp_size counts everything after itself
    let end = comp_size.saturating_add(4).min(data.len());
    let body = &data[HEADER_SIZE..end.max(HEADER_SIZE)];

    match magic {
        UNCOMPRESSED => {
            if body.len() < raw_size {
                return Err(Error::BadRtf("truncated content"));
            }
            Ok(body[..raw_size].to_vec())
        }

        COMPRESSED => {
            if crc(body) != expected_crc {
                return Err(Error::BadRtf("CRC mismatch"));
            }
            Ok(lzfu(body, raw_size))
        }

        _ => Err(Error::BadRtf("unknown compression type")),
    }
}

fn lzfu(body: &[u8], raw_size: usize) -> Vec<u8> {
    let mut dict = [0u8; DICT_SIZE];
    dict[..PREBUF.len()].copy_from_slice(PREBUF);
    let mut write_pos = PREBUF.len();

    let mut out = Vec::with_capacity(raw_size);
    let mut input = body.iter().copied();

    'outer: while out.len() < raw_size {
        let control = match input.next() {
            Some(c) => c,
            None => break,
        };

        for bit in 0..8 {
            if out.len() >= raw_size {
                break 'outer;
            }

            if control & (1 << bit) == 0 {
                let b = match input.next() {
                    Some(b) => b,
                    None => break 'outer,
                };
                out.push(b);
                dict[write_pos] = b;
                write_pos = (write_pos + 1) % DICT_SIZE;
            } else {
                let (hi, lo) = match (input.next(), input.next()) {
                    (Some(hi), Some(lo)) => (hi, lo),
                    _ => break 'outer,
                };
                let reference = u16::from(hi) << 8 | u16::from(lo);
                let mut read_pos = usize::from(reference >> 4);
                let len = usize::from(reference & 0xF) + 2;

                if read_pos == write_pos {
                    break 'outer;
                }

                for _ in 0..len {
                    let b = dict[read_pos];
                    out.push(b);
                    dict[write_pos] = b;
                    read_pos = (read_pos + 1) % DICT_SIZE;
                    write_pos = (write_pos + 1) % DICT_SIZE;
                }
            }
        }
    }

    out.truncate(raw_size);
    out
}

/// Wrap `rtf` in the uncompressed form of the container.
#[cfg(test)]
pub fn store_uncompressed(rtf: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_SIZE];
    LittleEndian::write_u32(&mut out[0..4], (rtf.len() + 12) as u32);
    LittleEndian::write_u32(&mut out[4..8], rtf.len() as u32);
    LittleEndian::write_u32(&mut out[8..12], UNCOMPRESSED);
    out.extend_from_slice(rtf);
    out
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    // The example from MS-OXRTFCP section 4.1
    const COMPRESSED_EXAMPLE: &[u8] = &[
        0x2d, 0x00, 0x00, 0x00, 0x2b, 0x00, 0x00, 0x00, 0x4c, 0x5a, 0x46, 0x75,
        0xf1, 0xc5, 0xc7, 0xa7, 0x03, 0x00, 0x0a, 0x00, 0x72, 0x63, 0x70, 0x67,
        0x31, 0x32, 0x35, 0x42, 0x32, 0x0a, 0xf3, 0x20, 0x68, 0x65, 0x6c, 0x09,
        0x00, 0x20, 0x62, 0x77, 0x05, 0xb0, 0x6c, 0x64, 0x7d, 0x0a, 0x80, 0x0f,
        0xa0,
    ];

    #[test]
    fn prebuf_size() {
        assert_eq!(207, PREBUF.len());
    }

    #[test]
    fn decompress_reference_example() {
        assert_eq!(
            b"{\\rtf1\\ansi\\ansicpg1252\\pard hello world}\r\n".to_vec(),
            decompress(COMPRESSED_EXAMPLE).unwrap()
        );
    }

    #[test]
    fn bad_crc_is_rejected() {
        let mut data = COMPRESSED_EXAMPLE.to_vec();
        data[20] ^= 1;
        assert_matches!(Err(Error::BadRtf(_)), decompress(&data));
    }

    #[test]
    fn uncompressed_form() {
        let stored = store_uncompressed(b"{\\rtf1 hi}");
        assert_eq!(b"{\\rtf1 hi}".to_vec(), decompress(&stored).unwrap());
    }

    #[test]
    fn garbage_is_rejected() {
        assert_matches!(Err(Error::BadRtf(_)), decompress(b"short"));
        assert_matches!(
            Err(Error::BadRtf(_)),
            decompress(&[0u8; 32])
        );
    }

    proptest! {
        #[test]
        fn decompress_never_panics(
            data in prop::collection::vec(any::<u8>(), 0..200)
        ) {
            let _ = decompress(&data);

            // Also with a valid header, so the decoder itself is exercised
            let mut framed = vec![0u8; HEADER_SIZE];
            LittleEndian::write_u32(&mut framed[0..4], data.len() as u32 + 12);
            LittleEndian::write_u32(&mut framed[4..8], 1000);
            LittleEndian::write_u32(&mut framed[8..12], COMPRESSED);
            LittleEndian::write_u32(&mut framed[12..16], crc(&data));
            framed.extend_from_slice(&data);
            assert!(decompress(&framed).unwrap().len() <= 1000);
        }
    }
}
