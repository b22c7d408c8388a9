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

/// Maps between MIME types and file name extensions.
pub trait ExtensionLookup: Send + Sync {
    /// Return the known extensions (without leading `.`) for `base_type`,
    /// most preferred first.
    fn extensions(&self, base_type: &str) -> Vec<String>;

    /// Return the MIME type for a file with extension `ext`, if known.
    fn mime_type(&self, ext: &str) -> Option<String>;

    /// Return the MIME type for `filename` based on its extension.
    fn mime_type_for_filename(&self, filename: &str) -> Option<String> {
        let dot = filename.rfind('.')?;
        let ext = &filename[dot + 1..];
        if ext.is_empty() {
            None
        } else {
            self.mime_type(ext)
        }
    }
}

/// A static table of common types.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinTypes;

// (type, extension). The first entry for a type is its preferred extension;
// the first entry for an extension is its preferred type.
static TABLE: &[(&str, &str)] = &[
    ("application/msword", "doc"),
    ("application/octet-stream", "bin"),
    ("application/ms-tnef", "dat"),
    ("application/vnd.ms-tnef", "dat"),
    ("application/pdf", "pdf"),
    ("application/pgp-signature", "asc"),
    ("application/pkcs7-signature", "p7s"),
    ("application/pkcs7-mime", "p7m"),
    ("application/postscript", "ps"),
    ("application/postscript", "eps"),
    ("application/rtf", "rtf"),
    ("application/vnd.ms-excel", "xls"),
    ("application/vnd.ms-powerpoint", "ppt"),
    ("application/vnd.ms-outlook", "msg"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsx",
    ),
    (
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "pptx",
    ),
    ("application/vnd.oasis.opendocument.text", "odt"),
    ("application/vnd.oasis.opendocument.spreadsheet", "ods"),
    ("application/gzip", "gz"),
    ("application/x-gzip", "gz"),
    ("application/x-tar", "tar"),
    ("application/zip", "zip"),
    ("application/x-zip-compressed", "zip"),
    ("application/x-7z-compressed", "7z"),
    ("application/json", "json"),
    ("application/xml", "xml"),
    ("audio/mpeg", "mp3"),
    ("audio/ogg", "ogg"),
    ("audio/wav", "wav"),
    ("image/bmp", "bmp"),
    ("image/gif", "gif"),
    ("image/jpeg", "jpg"),
    ("image/jpeg", "jpeg"),
    ("image/jpeg", "jpe"),
    ("image/pjpeg", "jpg"),
    ("image/png", "png"),
    ("image/svg+xml", "svg"),
    ("image/tiff", "tif"),
    ("image/tiff", "tiff"),
    ("image/webp", "webp"),
    ("image/x-icon", "ico"),
    ("message/rfc822", "eml"),
    ("text/calendar", "ics"),
    ("application/ics", "ics"),
    ("text/x-vcalendar", "vcs"),
    ("text/css", "css"),
    ("text/csv", "csv"),
    ("text/html", "html"),
    ("text/html", "htm"),
    ("text/plain", "txt"),
    ("text/plain", "text"),
    ("text/plain", "log"),
    ("text/richtext", "rtx"),
    ("text/rtf", "rtf"),
    ("text/enriched", "txt"),
    ("text/rfc822-headers", "txt"),
    ("message/delivery-status", "txt"),
    ("message/disposition-notification", "txt"),
    ("text/vcard", "vcf"),
    ("text/x-vcard", "vcf"),
    ("text/directory", "vcf"),
    ("text/xml", "xml"),
    ("video/mp4", "mp4"),
    ("video/mpeg", "mpeg"),
    ("video/quicktime", "mov"),
];

impl ExtensionLookup for BuiltinTypes {
    fn extensions(&self, base_type: &str) -> Vec<String> {
        TABLE
            .iter()
            .filter(|&&(typ, _)| typ.eq_ignore_ascii_case(base_type.trim()))
            .map(|&(_, ext)| ext.to_owned())
            .collect()
    }

    fn mime_type(&self, ext: &str) -> Option<String> {
        TABLE
            .iter()
            .find(|&&(_, e)| e.eq_ignore_ascii_case(ext.trim()))
            .map(|&(typ, _)| typ.to_owned())
    }
}
