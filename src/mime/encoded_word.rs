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

//! Decoding of header values which may contain RFC 2047 "encoded words", such
//! as subjects and file names.

use std::borrow::Cow;
use std::str;

use encoding_rs::Encoding;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref ENCODED_WORD: Regex =
        Regex::new(r"^=\?([!->@-~]*)\?([!->@-~]*)\?([!->@-~]*)\?=$").unwrap();
    static ref LOOKS_ENCODED: Regex =
        Regex::new(r"=\?[^?\s]+\?[bBqQ]\?").unwrap();
    static ref Q_WORD_WITH_SPACES: Regex =
        Regex::new(r"=\?[^?\s]+\?[qQ]\?[^?]*?\?=").unwrap();
    static ref UNTERMINATED_WORD: Regex =
        Regex::new(r"=\?[^?\s]+\?[bBqQ]\?[^?\s]*$").unwrap();
}

/// Test if `word` (in its entirety) is an RFC 2047 "encoded word".
///
/// If it is, decode it and return its decoded value.
///
/// Returns `None` if it is not an encoded word or if it could not be decoded.
/// As with Thunderbird, encoded words longer than the 75 characters RFC 2047
/// allows are accepted.
pub fn ew_decode(word: &str) -> Option<String> {
    let captures = ENCODED_WORD.captures(word)?;

    let charset = captures.get(1)?.as_str();
    let transfer_encoding = captures.get(2)?.as_str();
    let content = captures.get(3)?.as_str().as_bytes();

    let content: Cow<[u8]> = match transfer_encoding {
        "q" | "Q" => Cow::Owned(q_decode(content)),
        "b" | "B" => Cow::Owned(base64::decode(content).ok()?),
        _ => return None,
    };

    // RFC 2231 allows a language suffix on the charset
    let charset = charset.split('*').next().unwrap_or(charset);
    Some(
        Encoding::for_label_no_replacement(charset.as_bytes())?
            .decode_with_bom_removal(&content)
            .0
            .into_owned(),
    )
}

/// The "Q" encoding from RFC 2047, which is quoted-printable with `_` standing
/// for ASCII space and no soft line breaks.
fn q_decode(content: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::with_capacity(content.len());
    let mut ix = 0;
    while ix < content.len() {
        match content[ix] {
            b'_' => decoded.push(b' '),
            b'=' if ix + 2 < content.len() => {
                match str::from_utf8(&content[ix + 1..ix + 3])
                    .ok()
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                {
                    Some(b) => {
                        decoded.push(b);
                        ix += 3;
                        continue;
                    }
                    None => decoded.push(b'='),
                }
            }
            b => decoded.push(b),
        }
        ix += 1;
    }

    decoded
}

/// Decode all encoded words in `text`, an unstructured header value.
///
/// Linear whitespace between two adjacent encoded words is removed; all other
/// whitespace is preserved.
///
/// The second element of the result is false if anything that looked like an
/// encoded word could not be decoded. Such words are passed through verbatim.
pub fn ew_decode_unstructured(text: &str) -> (String, bool) {
    let mut decoded = String::with_capacity(text.len());
    let mut clean = true;
    let mut pending_space = "";
    let mut prev_encoded = false;

    for (is_space, chunk) in split_whitespace_runs(text) {
        if is_space {
            pending_space = chunk;
            continue;
        }

        match ew_decode(chunk) {
            Some(word) => {
                if !prev_encoded {
                    decoded.push_str(pending_space);
                }
                decoded.push_str(&word);
                prev_encoded = true;
            }
            None => {
                clean &= !LOOKS_ENCODED.is_match(chunk);
                decoded.push_str(pending_space);
                decoded.push_str(chunk);
                prev_encoded = false;
            }
        }
        pending_space = "";
    }

    decoded.push_str(pending_space);
    (decoded, clean)
}

fn split_whitespace_runs(text: &str) -> Vec<(bool, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut in_space = None;
    for (ix, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match in_space {
            Some(prev) if prev != is_space => {
                runs.push((prev, &text[start..ix]));
                start = ix;
            }
            _ => (),
        }
        in_space = Some(is_space);
    }

    if let Some(prev) = in_space {
        runs.push((prev, &text[start..]));
    }

    runs
}

/// Remove header folding, turning each line break and the whitespace after it
/// into a single space.
pub fn unfold(s: &str) -> Cow<str> {
    if memchr::memchr2(b'\r', b'\n', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }

    let mut unfolded = String::with_capacity(s.len());
    let mut is_unfolding = false;
    for ch in s.chars() {
        if is_unfolding {
            if ' ' == ch || '\t' == ch || '\r' == ch || '\n' == ch {
                continue;
            }
            is_unfolding = false;
            unfolded.push(ch);
        } else if '\r' == ch || '\n' == ch {
            unfolded.push(' ');
            is_unfolding = true;
        } else {
            unfolded.push(ch);
        }
    }

    Cow::Owned(unfolded)
}

/// Attempt to fix up common breakage in encoded words produced by sloppy
/// agents so that `ew_decode_unstructured` can make sense of them.
///
/// - Adjacent words with no whitespace between them (`?==?`).
/// - Literal spaces inside a Q-encoded payload.
/// - A missing `?=` on the last word of the value.
fn repair(s: &str) -> Cow<str> {
    let mut s = Cow::Borrowed(s);

    if s.contains("?==?") {
        s = Cow::Owned(s.replace("?==?", "?= =?"));
    }

    if Q_WORD_WITH_SPACES
        .find_iter(&s)
        .any(|m| m.as_str().contains(char::is_whitespace))
    {
        let fixed = Q_WORD_WITH_SPACES
            .replace_all(&s, |c: &regex::Captures| {
                c[0].replace(char::is_whitespace, "_")
            })
            .into_owned();
        s = Cow::Owned(fixed);
    }

    if UNTERMINATED_WORD.is_match(s.trim_end()) {
        let mut fixed = s.trim_end().to_owned();
        fixed.push_str("?=");
        s = Cow::Owned(fixed);
    }

    s
}

/// Fully decode a raw header value: unfold it, repair malformed encoded words,
/// and decode them.
///
/// Returns `None` if some encoded word could not be decoded even after repair.
pub fn try_decode_header_value(raw: &str) -> Option<String> {
    let unfolded = unfold(raw);
    let unfolded = unfolded.trim();
    if !unfolded.contains("=?") {
        return Some(unfolded.to_owned());
    }

    let (decoded, clean) = ew_decode_unstructured(&repair(unfolded));
    if clean {
        Some(decoded)
    } else {
        None
    }
}

/// Like `try_decode_header_value`, but returns `raw` unchanged on failure.
pub fn decode_header_value(raw: &str) -> String {
    try_decode_header_value(raw).unwrap_or_else(|| raw.to_owned())
}
