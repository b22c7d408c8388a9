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

//! Parsing of the structured MIME header values the walker needs to interpret
//! a part: `Content-Type` and `Content-Disposition`.
//!
//! This is deliberately forgiving. Anything after the last parameter that can
//! be understood is ignored, unquoted parameter values may contain characters
//! which are not strictly allowed in tokens, and type names, disposition
//! tokens and parameter names are all lower-cased.

use std::fmt;

use nom::{
    branch::alt,
    bytes::complete::{is_not, take, take_while1},
    character::complete::{char, multispace0},
    combinator::map,
    multi::{fold_many0, many0},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentType {
    pub typ: String,
    pub subtype: String,
    pub parms: Vec<(String, String)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentDisposition {
    pub disposition: String,
    pub parms: Vec<(String, String)>,
}

impl ContentType {
    pub fn new(typ: &str, subtype: &str) -> Self {
        ContentType {
            typ: typ.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parms: vec![],
        }
    }

    pub fn octet_stream() -> Self {
        ContentType::new("application", "octet-stream")
    }

    /// Parse `s`, falling back to `application/octet-stream` if it is not a
    /// usable content type.
    pub fn parse_or_default(s: &str) -> Self {
        parse_content_type(s).unwrap_or_else(ContentType::octet_stream)
    }

    pub fn with_parm(mut self, name: &str, value: &str) -> Self {
        self.parms.retain(|&(ref n, _)| !n.eq_ignore_ascii_case(name));
        self.parms
            .push((name.to_ascii_lowercase(), value.to_owned()));
        self
    }

    /// The `type/subtype` form without parameters.
    pub fn base_type(&self) -> String {
        format!("{}/{}", self.typ, self.subtype)
    }

    pub fn is_type(&self, typ: &str) -> bool {
        self.typ.eq_ignore_ascii_case(typ)
    }

    pub fn is(&self, typ: &str, subtype: &str) -> bool {
        self.is_type(typ) && self.subtype.eq_ignore_ascii_case(subtype)
    }

    pub fn parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.parms, name)
    }

    pub fn charset(&self) -> Option<&str> {
        self.parm("charset")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

impl ContentDisposition {
    pub fn new(disposition: &str) -> Self {
        ContentDisposition {
            disposition: disposition.to_ascii_lowercase(),
            parms: vec![],
        }
    }

    pub fn attachment(filename: Option<&str>) -> Self {
        let cd = ContentDisposition::new("attachment");
        match filename {
            Some(filename) => cd.with_parm("filename", filename),
            None => cd,
        }
    }

    pub fn with_parm(mut self, name: &str, value: &str) -> Self {
        self.parms.retain(|&(ref n, _)| !n.eq_ignore_ascii_case(name));
        self.parms
            .push((name.to_ascii_lowercase(), value.to_owned()));
        self
    }

    pub fn parm(&self, name: &str) -> Option<&str> {
        find_parm(&self.parms, name)
    }

    pub fn filename(&self) -> Option<&str> {
        self.parm("filename").filter(|s| !s.trim().is_empty())
    }
}

fn find_parm<'a>(parms: &'a [(String, String)], name: &str) -> Option<&'a str> {
    parms
        .iter()
        .find(|&&(ref n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, ref v)| v.as_str())
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.typ, self.subtype)?;
        write_parms(f, &self.parms)
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.disposition)?;
        write_parms(f, &self.parms)
    }
}

fn write_parms(
    f: &mut fmt::Formatter,
    parms: &[(String, String)],
) -> fmt::Result {
    for &(ref name, ref value) in parms {
        if !value.is_empty() && value.chars().all(is_token_char) {
            write!(f, "; {}={}", name, value)?;
        } else {
            write!(f, "; {}=\"", name)?;
            for ch in value.chars() {
                if '"' == ch || '\\' == ch {
                    write!(f, "\\")?;
                }
                write!(f, "{}", ch)?;
            }
            write!(f, "\"")?;
        }
    }

    Ok(())
}

fn is_token_char(ch: char) -> bool {
    ch.is_ascii()
        && !ch.is_ascii_control()
        && !ch.is_ascii_whitespace()
        && !"()<>@,;:\\\"/[]?=".contains(ch)
}

// RFC 2045 token
fn token(i: &str) -> IResult<&str, &str> {
    take_while1(is_token_char)(i)
}

// RFC 2822 quoted-string, without the folding subtleties since values handed
// to us have already been unfolded.
fn quoted_string(i: &str) -> IResult<&str, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((is_not("\\\""), preceded(char('\\'), take(1usize)))),
            String::new(),
            |mut acc: String, item: &str| {
                acc.push_str(item);
                acc
            },
        ),
        char('"'),
    )(i)
}

// Not all agents quote values that need it, so accept anything up to the next
// parameter delimiter.
fn bare_value(i: &str) -> IResult<&str, String> {
    map(is_not(";\""), |s: &str| s.trim_end().to_owned())(i)
}

fn parameter(i: &str) -> IResult<&str, (String, String)> {
    preceded(
        tuple((multispace0, char(';'), multispace0)),
        separated_pair(
            map(token, str::to_ascii_lowercase),
            tuple((multispace0, char('='), multispace0)),
            alt((quoted_string, bare_value)),
        ),
    )(i)
}

fn content_type(i: &str) -> IResult<&str, ContentType> {
    map(
        tuple((
            multispace0,
            token,
            multispace0,
            char('/'),
            multispace0,
            token,
            many0(parameter),
        )),
        |(_, typ, _, _, _, subtype, parms)| ContentType {
            typ: typ.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            parms: fold_rfc2231(parms),
        },
    )(i)
}

fn content_disposition(i: &str) -> IResult<&str, ContentDisposition> {
    map(
        tuple((multispace0, token, many0(parameter))),
        |(_, disposition, parms)| ContentDisposition {
            disposition: disposition.to_ascii_lowercase(),
            parms: fold_rfc2231(parms),
        },
    )(i)
}

/// Parse a `Content-Type` header value.
///
/// Returns `None` if the value does not even start with `type/subtype`.
pub fn parse_content_type(value: &str) -> Option<ContentType> {
    content_type(value).ok().map(|(_, ct)| ct)
}

/// Parse a `Content-Disposition` header value.
pub fn parse_content_disposition(value: &str) -> Option<ContentDisposition> {
    content_disposition(value).ok().map(|(_, cd)| cd)
}

/// Merge RFC 2231 continuations (`name*0`, `name*1*`, ...) and decode
/// extended values (`name*=charset'lang'%xx`) into plain parameters.
///
/// Parameters not using RFC 2231 syntax pass through unchanged. Merged
/// parameters take the position of their first section.
fn fold_rfc2231(parms: Vec<(String, String)>) -> Vec<(String, String)> {
    if !parms.iter().any(|&(ref n, _)| n.contains('*')) {
        return parms;
    }

    let mut order: Vec<String> = Vec::new();
    let mut plain: Vec<(String, String)> = Vec::new();
    let mut extended: Vec<(String, Vec<Section>)> = Vec::new();

    for (name, value) in parms {
        let star = match name.find('*') {
            None => {
                order.push(name.clone());
                plain.push((name, value));
                continue;
            }
            Some(star) => star,
        };

        let base = name[..star].to_owned();
        let rest = &name[star + 1..];
        let encoded = rest.ends_with('*') || rest.is_empty();
        let index = rest.trim_end_matches('*').parse::<u32>().unwrap_or(0);

        if !order.contains(&base) {
            order.push(base.clone());
        }

        let section = Section {
            index,
            encoded,
            value,
        };
        match extended.iter_mut().find(|entry| entry.0 == base) {
            Some(entry) => entry.1.push(section),
            None => extended.push((base, vec![section])),
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for name in order {
        // An extended parameter takes precedence over a plain one of the same
        // name.
        if let Some(pos) = extended.iter().position(|&(ref n, _)| *n == name)
        {
            let (_, mut sections) = extended.swap_remove(pos);
            sections.sort_by_key(|s| s.index);
            out.push((name, join_sections(&sections)));
        } else if let Some(pos) = plain.iter().position(|&(ref n, _)| *n == name)
        {
            out.push(plain.swap_remove(pos));
        }
    }

    out
}

struct Section {
    index: u32,
    encoded: bool,
    value: String,
}

fn join_sections(sections: &[Section]) -> String {
    let mut charset = None;
    let mut bytes = Vec::new();
    for (ix, section) in sections.iter().enumerate() {
        let mut value = section.value.as_str();
        if section.encoded {
            if 0 == ix {
                let mut split = value.splitn(3, '\'');
                if let (Some(cs), Some(_lang), Some(rest)) =
                    (split.next(), split.next(), split.next())
                {
                    charset = Some(cs.to_owned()).filter(|c| !c.is_empty());
                    value = rest;
                }
            }
            bytes.extend(percent_encoding::percent_decode_str(value));
        } else {
            bytes.extend_from_slice(value.as_bytes());
        }
    }

    let encoding = charset
        .and_then(|cs| {
            encoding_rs::Encoding::for_label_no_replacement(cs.as_bytes())
        })
        .unwrap_or(encoding_rs::UTF_8);
    encoding.decode_without_bom_handling(&bytes).0.into_owned()
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parse_simple_content_type() {
        let ct = parse_content_type("text/plain").unwrap();
        assert_eq!("text", ct.typ);
        assert_eq!("plain", ct.subtype);
        assert!(ct.parms.is_empty());

        let ct = parse_content_type(" Text / HTML ").unwrap();
        assert_eq!("text/html", ct.base_type());
    }

    #[test]
    fn parse_content_type_parms() {
        let ct = parse_content_type(
            "multipart/mixed; boundary=\"=_a\\\"b\"; Charset=UTF-8",
        )
        .unwrap();
        assert_eq!("multipart/mixed", ct.base_type());
        assert_eq!(Some("=_a\"b"), ct.parm("boundary"));
        assert_eq!(Some("UTF-8"), ct.charset());
        assert_eq!(Some("UTF-8"), ct.parm("CHARSET"));
    }

    #[test]
    fn parse_sloppy_parms() {
        let ct =
            parse_content_type("application/pdf; name=my report.pdf ;;; junk")
                .unwrap();
        assert_eq!(Some("my report.pdf"), ct.parm("name"));

        let ct = parse_content_type("text/plain; charset=").unwrap();
        assert_eq!(None, ct.charset());
    }

    #[test]
    fn reject_garbage_content_type() {
        assert_eq!(None, parse_content_type(""));
        assert_eq!(None, parse_content_type("text"));
        assert_eq!(None, parse_content_type("/plain"));
        assert_eq!(
            "application/octet-stream",
            ContentType::parse_or_default("garbage").base_type()
        );
    }

    #[test]
    fn parse_disposition() {
        let cd = parse_content_disposition(
            "Attachment; filename=\"foo bar.txt\"; size=42",
        )
        .unwrap();
        assert_eq!("attachment", cd.disposition);
        assert_eq!(Some("foo bar.txt"), cd.filename());
        assert_eq!(Some("42"), cd.parm("size"));

        let cd = parse_content_disposition("inline").unwrap();
        assert_eq!("inline", cd.disposition);
        assert_eq!(None, cd.filename());
    }

    #[test]
    fn parse_rfc2231() {
        let cd = parse_content_disposition(
            "attachment; filename*=iso-8859-1'en'f%F8%F8.txt",
        )
        .unwrap();
        assert_eq!(Some("føø.txt"), cd.filename());

        let cd = parse_content_disposition(
            "attachment; filename*0=\"long \"; filename*1*=na%C3%AFve; \
             filename*2=\".txt\"",
        )
        .unwrap();
        assert_eq!(Some("long naïve.txt"), cd.filename());

        let cd = parse_content_disposition(
            "attachment; filename=\"fallback.txt\"; \
             filename*=UTF-8''%E2%82%AC.txt",
        )
        .unwrap();
        assert_eq!(Some("€.txt"), cd.filename());
        assert_eq!(1, cd.parms.len());
    }

    #[test]
    fn rfc2231_bad_escapes_are_literal() {
        let cd = parse_content_disposition(
            "attachment; filename*=UTF-8''a%zzb%41%4",
        )
        .unwrap();
        assert_eq!(Some("a%zzbA%4"), cd.filename());
    }

    #[test]
    fn display_round_trips_quoting() {
        let ct = ContentType::new("Text", "Plain")
            .with_parm("charset", "utf-8")
            .with_parm("name", "a \"b\".txt");
        assert_eq!(
            "text/plain; charset=utf-8; name=\"a \\\"b\\\".txt\"",
            ct.to_string()
        );
        assert_eq!(ct, parse_content_type(&ct.to_string()).unwrap());

        assert_eq!(
            "attachment; filename=x.bin",
            ContentDisposition::attachment(Some("x.bin")).to_string()
        );
    }

    proptest! {
        #[test]
        fn parse_content_type_never_panics(s in ".*") {
            parse_content_type(&s);
            parse_content_disposition(&s);
        }
    }
}
