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

//! Detection and extraction of uuencoded files embedded in plain text.
//!
//! Some mail agents, mostly ones predating MIME, "attach" files by pasting
//! them into the body between a `begin <mode> <name>` line and an `end` line.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    static ref BEGIN_LINE: Regex =
        Regex::new(r"^begin ([0-7]{3,4}) (.*\S)\s*$").unwrap();
}

/// A file recovered from uuencoded text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UuFile {
    pub filename: String,
    /// The Unix permission bits from the `begin` line.
    pub mode: u32,
    pub data: Vec<u8>,
}

/// The result of splitting text containing uuencoded files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UuSplit {
    /// The text with the encoded files removed.
    pub text: String,
    pub files: Vec<UuFile>,
}

/// Search `text` for uuencoded files.
///
/// Returns `None` if `text` contains no complete, well-formed encoded file.
/// At most `max_files` files are extracted; any further ones are left in the
/// text.
pub fn split(text: &str, max_files: usize) -> Option<UuSplit> {
    if max_files == 0 || !text.contains("begin ") {
        return None;
    }

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut offset = 0;
    for line in &lines {
        offsets.push(offset);
        offset += line.len();
    }
    offsets.push(offset);

    let mut outside: Vec<&str> = Vec::new();
    let mut files = Vec::new();
    let mut chunk_start = 0;
    let mut ix = 0;

    while ix < lines.len() {
        if files.len() < max_files {
            if let Some((file, consumed)) = decode_at(&lines[ix..]) {
                outside.push(&text[offsets[chunk_start]..offsets[ix]]);
                files.push(file);
                ix += consumed;
                chunk_start = ix;
                continue;
            }
        }

        ix += 1;
    }

    if files.is_empty() {
        return None;
    }

    outside.push(&text[offsets[chunk_start]..]);
    debug!("extracted {} uuencoded files from text", files.len());

    Some(UuSplit {
        text: join_outside(&outside),
        files,
    })
}

/// Join the text found between encoded files, collapsing the line breaks at
/// each seam into one.
fn join_outside(chunks: &[&str]) -> String {
    let last = chunks.len().saturating_sub(1);
    chunks
        .iter()
        .enumerate()
        .map(|(ix, chunk)| {
            let mut chunk: &str = chunk;
            if ix > 0 {
                chunk = chunk.trim_start_matches(|c| '\r' == c || '\n' == c);
            }
            if ix < last {
                chunk = chunk.trim_end_matches(|c| '\r' == c || '\n' == c);
            }
            chunk
        })
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Try to decode a file starting at the first of `lines`.
///
/// Returns the file and the number of lines it occupied, including the
/// `begin` and `end` lines.
fn decode_at(lines: &[&str]) -> Option<(UuFile, usize)> {
    let begin = BEGIN_LINE.captures(lines.first()?.trim_end())?;
    let mode = u32::from_str_radix(begin.get(1)?.as_str(), 8).ok()?;
    let filename = begin.get(2)?.as_str().to_owned();

    let mut data = Vec::new();
    for (ix, line) in lines.iter().enumerate().skip(1) {
        let line = line.trim_end_matches(|c| '\r' == c || '\n' == c);
        if "end" == line.trim_end() {
            return Some((
                UuFile {
                    filename,
                    mode,
                    data,
                },
                ix + 1,
            ));
        }

        decode_line(line, &mut data)?;
    }

    // No `end` line
    None
}

fn sixbit(ch: u8) -> Option<u8> {
    if (b' '..=b'`').contains(&ch) {
        Some((ch - b' ') & 0x3F)
    } else {
        None
    }
}

/// Decode one line of uuencoded data, appending it to `out`.
///
/// Returns `None` if the line is not valid uuencoded data.
fn decode_line(line: &str, out: &mut Vec<u8>) -> Option<()> {
    let line = line.as_bytes();
    let (&len_char, body) = match line.split_first() {
        Some(split) => split,
        // Tolerate blank lines, typically from a mangled `` ` `` line
        None => return Some(()),
    };

    let len = sixbit(len_char)? as usize;
    // Encoders may strip trailing spaces, so the body can be short, but it
    // can never be longer than a full line plus some padding.
    if body.len() > (len + 2) / 3 * 4 + 4 {
        return None;
    }

    let mut decoded = Vec::with_capacity(len + 2);
    for group in body.chunks(4) {
        let mut c = [0u8; 4];
        for (dst, &src) in c.iter_mut().zip(group) {
            *dst = sixbit(src)?;
        }

        decoded.push(c[0] << 2 | c[1] >> 4);
        decoded.push(c[1] << 4 | c[2] >> 2);
        decoded.push(c[2] << 6 | c[3]);
    }

    decoded.resize(len, 0);
    out.extend_from_slice(&decoded);
    Some(())
}
