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

//! A `Handler` which records everything it is told, for tests.

use chrono::prelude::*;

use super::handler::*;
use super::model::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    From(Vec<String>),
    To(Vec<String>),
    Cc(Vec<String>),
    Bcc(Vec<String>),
    Subject(String),
    SentDate(DateTime<FixedOffset>),
    ReceivedDate(DateTime<Utc>),
    SystemFlags(SystemFlags),
    UserFlags(Vec<String>),
    ColorLabel(u8),
    Priority(Priority),
    ContentId(String),
    MessageReference(String),
    DispositionNotification(String, bool),
    Headers(usize),

    PlainText {
        seq: String,
        text: String,
        size: u64,
        filename: String,
    },
    UuText {
        seq: String,
        text: String,
    },
    UuAttachment {
        seq: String,
        filename: String,
        base_type: String,
        data: Vec<u8>,
    },
    Html {
        seq: String,
        text: String,
    },
    Multipart {
        seq: String,
        count: usize,
    },
    Image {
        seq: String,
        base_type: String,
        inline: bool,
        filename: String,
        content_id: Option<String>,
    },
    NestedMessage {
        seq: String,
    },
    Attachment {
        seq: String,
        base_type: String,
        inline: bool,
        filename: String,
    },
    Special {
        seq: String,
        base_type: String,
        filename: String,
    },
    End,
}

impl Event {
    pub fn is_envelope(&self) -> bool {
        match *self {
            Event::From(..)
            | Event::To(..)
            | Event::Cc(..)
            | Event::Bcc(..)
            | Event::Subject(..)
            | Event::SentDate(..)
            | Event::ReceivedDate(..)
            | Event::SystemFlags(..)
            | Event::UserFlags(..)
            | Event::ColorLabel(..)
            | Event::Priority(..)
            | Event::ContentId(..)
            | Event::MessageReference(..)
            | Event::DispositionNotification(..)
            | Event::Headers(..) => true,
            _ => false,
        }
    }

    /// Shorthand for an attachment event.
    pub fn attachment(
        seq: &str,
        base_type: &str,
        inline: bool,
        filename: &str,
    ) -> Self {
        Event::Attachment {
            seq: seq.to_owned(),
            base_type: base_type.to_owned(),
            inline,
            filename: filename.to_owned(),
        }
    }

    pub fn multipart(seq: &str, count: usize) -> Self {
        Event::Multipart {
            seq: seq.to_owned(),
            count,
        }
    }
}

#[derive(Default)]
pub struct Recorder {
    pub events: Vec<Event>,
    halt_when: Option<Box<dyn Fn(&Event) -> bool>>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    /// Create a recorder which halts after recording an event matching
    /// `pred`.
    pub fn halting_on(pred: impl Fn(&Event) -> bool + 'static) -> Self {
        Recorder {
            events: Vec::new(),
            halt_when: Some(Box::new(pred)),
        }
    }

    /// The recorded events other than the envelope.
    pub fn body(&self) -> Vec<Event> {
        self.events
            .iter()
            .filter(|e| !e.is_envelope())
            .cloned()
            .collect()
    }

    fn record(&mut self, event: Event) -> Flow {
        let halt = self.halt_when.as_ref().map_or(false, |pred| pred(&event));
        self.events.push(event);
        if halt {
            Err(Halt)
        } else {
            Ok(())
        }
    }
}

fn addresses(addresses: &[EmailAddress]) -> Vec<String> {
    addresses.iter().map(ToString::to_string).collect()
}

impl Handler for Recorder {
    fn from(&mut self, a: &[EmailAddress]) -> Flow {
        self.record(Event::From(addresses(a)))
    }

    fn to_recipients(&mut self, a: &[EmailAddress]) -> Flow {
        self.record(Event::To(addresses(a)))
    }

    fn cc_recipients(&mut self, a: &[EmailAddress]) -> Flow {
        self.record(Event::Cc(addresses(a)))
    }

    fn bcc_recipients(&mut self, a: &[EmailAddress]) -> Flow {
        self.record(Event::Bcc(addresses(a)))
    }

    fn subject(&mut self, subject: &str) -> Flow {
        self.record(Event::Subject(subject.to_owned()))
    }

    fn sent_date(&mut self, date: DateTime<FixedOffset>) -> Flow {
        self.record(Event::SentDate(date))
    }

    fn received_date(&mut self, date: DateTime<Utc>) -> Flow {
        self.record(Event::ReceivedDate(date))
    }

    fn system_flags(&mut self, flags: SystemFlags) -> Flow {
        self.record(Event::SystemFlags(flags))
    }

    fn user_flags(&mut self, flags: &[String]) -> Flow {
        self.record(Event::UserFlags(flags.to_vec()))
    }

    fn color_label(&mut self, label: u8) -> Flow {
        self.record(Event::ColorLabel(label))
    }

    fn priority(&mut self, priority: Priority) -> Flow {
        self.record(Event::Priority(priority))
    }

    fn content_id(&mut self, content_id: &str) -> Flow {
        self.record(Event::ContentId(content_id.to_owned()))
    }

    fn message_reference(&mut self, reference: &str) -> Flow {
        self.record(Event::MessageReference(reference.to_owned()))
    }

    fn disposition_notification(
        &mut self,
        to: &EmailAddress,
        seen: bool,
    ) -> Flow {
        self.record(Event::DispositionNotification(to.to_string(), seen))
    }

    fn headers(&mut self, headers: &[(String, String)]) -> Flow {
        self.record(Event::Headers(headers.len()))
    }

    fn inline_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        self.record(Event::PlainText {
            seq: text.sequence_id.to_owned(),
            text: text.text.to_owned(),
            size: text.size,
            filename: text.filename.to_owned(),
        })
    }

    fn inline_uuencoded_plain_text(&mut self, text: &InlineText<'_>) -> Flow {
        self.record(Event::UuText {
            seq: text.sequence_id.to_owned(),
            text: text.text.to_owned(),
        })
    }

    fn inline_uuencoded_attachment(
        &mut self,
        attachment: &UuAttachment<'_>,
    ) -> Flow {
        self.record(Event::UuAttachment {
            seq: attachment.sequence_id.to_owned(),
            filename: attachment.file.filename.clone(),
            base_type: attachment.base_type.to_owned(),
            data: attachment.file.data.clone(),
        })
    }

    fn inline_html(&mut self, html: &InlineText<'_>) -> Flow {
        self.record(Event::Html {
            seq: html.sequence_id.to_owned(),
            text: html.text.to_owned(),
        })
    }

    fn multipart(
        &mut self,
        _: &dyn Part,
        count: usize,
        sequence_id: &str,
    ) -> Flow {
        self.record(Event::multipart(sequence_id, count))
    }

    fn image_part(
        &mut self,
        image: &PartInfo<'_>,
        content_id: Option<&str>,
    ) -> Flow {
        self.record(Event::Image {
            seq: image.sequence_id.to_owned(),
            base_type: image.base_type.to_owned(),
            inline: image.inline,
            filename: image.filename.to_owned(),
            content_id: content_id.map(str::to_owned),
        })
    }

    fn nested_message(&mut self, _: &dyn Part, sequence_id: &str) -> Flow {
        self.record(Event::NestedMessage {
            seq: sequence_id.to_owned(),
        })
    }

    fn attachment(&mut self, a: &PartInfo<'_>) -> Flow {
        self.record(Event::attachment(
            a.sequence_id,
            a.base_type,
            a.inline,
            a.filename,
        ))
    }

    fn special_part(&mut self, special: &PartInfo<'_>) -> Flow {
        self.record(Event::Special {
            seq: special.sequence_id.to_owned(),
            base_type: special.base_type.to_owned(),
            filename: special.filename.to_owned(),
        })
    }

    fn message_end(&mut self, _: &Message<'_>) {
        self.events.push(Event::End);
    }
}
