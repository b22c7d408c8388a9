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

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// Configuration for a `MessageParser`.
///
/// This is typically stored in a TOML file, though every field has a sensible
/// default so an empty file (or no file at all) is a valid configuration.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ParserConfig {
    /// How to decide whether a part is inline or an attachment.
    pub inline_policy: InlinePolicy,

    /// The charset assumed for non-text content which nonetheless needs to be
    /// decoded as text and declares no usable charset of its own.
    pub default_charset: String,

    /// The maximum multipart nesting depth.
    ///
    /// Multiparts nested deeper than this are reported as plain attachments
    /// and are not descended into.
    pub max_depth: u32,

    /// The maximum number of parts dispatched in one parse.
    ///
    /// When the limit is reached, body traversal stops as if the handler had
    /// requested a halt.
    pub max_parts: u32,

    /// The maximum number of uuencoded files split out of a single text part.
    pub max_uuencoded_attachments: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            inline_policy: InlinePolicy::default(),
            default_charset: "ISO-8859-1".to_owned(),
            max_depth: 20,
            max_parts: 1000,
            max_uuencoded_attachments: 64,
        }
    }
}

/// Decides how parts lacking an explicit `inline` disposition are classified.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InlinePolicy {
    /// Inline if the disposition is `inline`, or if there is neither a
    /// disposition nor a file name.
    Lenient,
    /// Inline only if there is no file name, and the disposition is either
    /// `inline` or absent.
    Strict,
}

impl Default for InlinePolicy {
    fn default() -> Self {
        InlinePolicy::Lenient
    }
}

impl InlinePolicy {
    pub fn is_inline(
        self,
        disposition: Option<&str>,
        has_filename: bool,
    ) -> bool {
        let explicit_inline =
            disposition.map_or(false, |d| d.eq_ignore_ascii_case("inline"));
        match self {
            InlinePolicy::Lenient => {
                explicit_inline || (disposition.is_none() && !has_filename)
            }
            InlinePolicy::Strict => {
                (explicit_inline || disposition.is_none()) && !has_filename
            }
        }
    }
}

impl ParserConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_config_is_default() {
        assert_eq!(
            ParserConfig::default(),
            ParserConfig::from_toml_str("").unwrap()
        );
    }

    #[test]
    fn parse_full_config() {
        let config = ParserConfig::from_toml_str(
            r#"
inline_policy = "strict"
default_charset = "windows-1252"
max_depth = 4
max_parts = 50
max_uuencoded_attachments = 2
"#,
        )
        .unwrap();
        assert_eq!(InlinePolicy::Strict, config.inline_policy);
        assert_eq!("windows-1252", config.default_charset);
        assert_eq!(4, config.max_depth);
        assert_eq!(50, config.max_parts);
        assert_eq!(2, config.max_uuencoded_attachments);
    }

    #[test]
    fn bad_policy_is_rejected() {
        assert_matches!(
            Err(Error::Config(_)),
            ParserConfig::from_toml_str("inline_policy = \"sloppy\"")
        );
    }

    #[test]
    fn lenient_policy() {
        let p = InlinePolicy::Lenient;
        assert!(p.is_inline(Some("inline"), false));
        assert!(p.is_inline(Some("INLINE"), true));
        assert!(p.is_inline(None, false));
        assert!(!p.is_inline(None, true));
        assert!(!p.is_inline(Some("attachment"), false));
    }

    #[test]
    fn strict_policy() {
        let p = InlinePolicy::Strict;
        assert!(p.is_inline(Some("Inline"), false));
        assert!(!p.is_inline(Some("inline"), true));
        assert!(p.is_inline(None, false));
        assert!(!p.is_inline(None, true));
        assert!(!p.is_inline(Some("attachment"), false));
    }
}
