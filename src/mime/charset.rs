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

//! Charset resolution for text-bearing parts.
//!
//! A declared charset is used whenever `encoding_rs` knows it. Otherwise the
//! content is sniffed (for `text/*`) or assumed to be in the configured
//! default charset (for anything else).

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::debug;

use super::header::ContentType;
use crate::support::diagnostic::Diagnostics;

/// Guesses the charset of a byte stream.
pub trait CharsetDetector: Send + Sync {
    /// Return the label of the most likely charset of `data`.
    fn detect(&self, data: &[u8]) -> String;
}

/// Detects byte-order marks and UTF-8, and otherwise assumes `windows-1252`,
/// which is what nearly all legacy mail in the wild without a declared charset
/// actually uses.
#[derive(Clone, Copy, Debug, Default)]
pub struct SniffingDetector;

impl CharsetDetector for SniffingDetector {
    fn detect(&self, data: &[u8]) -> String {
        if let Some((encoding, _)) = Encoding::for_bom(data) {
            encoding.name().to_owned()
        } else if data.is_ascii() {
            "US-ASCII".to_owned()
        } else if std::str::from_utf8(data).is_ok() {
            UTF_8.name().to_owned()
        } else {
            WINDOWS_1252.name().to_owned()
        }
    }
}

fn lookup(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label_no_replacement(label.trim().as_bytes())
}

/// Determine the encoding to use to decode `data`, the content of a part of
/// type `ct`.
///
/// An unsupported declared charset is reported to `diagnostics` and otherwise
/// treated as if no charset had been declared.
pub fn resolve_charset(
    ct: &ContentType,
    data: &[u8],
    detector: &dyn CharsetDetector,
    diagnostics: &dyn Diagnostics,
    default_charset: &str,
) -> &'static Encoding {
    if let Some(declared) = ct.charset() {
        if let Some(encoding) = lookup(declared) {
            return encoding;
        }

        diagnostics.unsupported_charset(declared);
    }

    let label = if ct.is_type("text") {
        detector.detect(data)
    } else {
        default_charset.to_owned()
    };

    let encoding = lookup(&label).unwrap_or(WINDOWS_1252);
    debug!(
        "charset for {} resolved to {} (no usable declaration)",
        ct.base_type(),
        encoding.name()
    );
    encoding
}

/// Decode `data` to a string, stripping any byte-order mark.
pub fn decode_text(encoding: &'static Encoding, data: &[u8]) -> String {
    encoding.decode_with_bom_removal(data).0.into_owned()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::support::diagnostic::{CharsetCounters, NoDiagnostics};

    fn resolve(ct: &str, data: &[u8], diagnostics: &dyn Diagnostics) -> String {
        resolve_charset(
            &ContentType::parse_or_default(ct),
            data,
            &SniffingDetector,
            diagnostics,
            "ISO-8859-2",
        )
        .name()
        .to_owned()
    }

    #[test]
    fn declared_charset_wins() {
        assert_eq!(
            "Shift_JIS",
            resolve("text/plain; charset=shift-jis", b"\xff\xfe", &NoDiagnostics)
        );
        assert_eq!(
            "UTF-8",
            resolve("text/plain; charset=\" utf-8 \"", b"\xe6", &NoDiagnostics)
        );
    }

    #[test]
    fn unsupported_charset_falls_back_to_sniffing() {
        let counters = CharsetCounters::new();
        assert_eq!(
            "UTF-8",
            resolve(
                "text/plain; charset=x-klingon",
                "Qapla’".as_bytes(),
                &counters
            )
        );
        assert_eq!(1, counters.count("x-klingon"));

        assert_eq!(
            "windows-1252",
            resolve("text/plain; charset=utf-7", b"caf\xe9", &counters)
        );
        assert_eq!(1, counters.count("utf-7"));
    }

    #[test]
    fn sniffing() {
        assert_eq!("windows-1252", resolve("text/plain", b"hello", &NoDiagnostics));
        assert_eq!("UTF-16LE", resolve("text/plain", b"\xff\xfeh\0", &NoDiagnostics));
        assert_eq!(
            "UTF-8",
            resolve("text/html", "<p>naïve</p>".as_bytes(), &NoDiagnostics)
        );
        assert_eq!("windows-1252", resolve("text/plain", b"na\xefve", &NoDiagnostics));
    }

    #[test]
    fn non_text_uses_default() {
        assert_eq!(
            "ISO-8859-2",
            resolve("application/octet-stream", "naïve".as_bytes(), &NoDiagnostics)
        );
    }

    #[test]
    fn decoding_strips_bom() {
        assert_eq!("hi", decode_text(UTF_8, b"\xef\xbb\xbfhi"));
        assert_eq!("café", decode_text(WINDOWS_1252, b"caf\xe9"));
    }
}
