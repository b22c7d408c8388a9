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

//! Reports the header-level facts of a message, before any of its content is
//! looked at.

use super::encoded_word::decode_header_value;
use super::handler::Handler;
use super::model::*;

/// Emit the envelope callbacks for `message`, whose root part is `body`.
///
/// All callbacks are made even if one of them halts; the return value
/// indicates whether any did.
pub fn emit(message: &Message<'_>, body: &dyn Part, handler: &mut dyn Handler) -> bool {
    let env = &message.envelope;
    let mut halted = false;

    halted |= handler.from(&env.from).is_err();
    halted |= handler.to_recipients(&env.to).is_err();
    halted |= handler.cc_recipients(&env.cc).is_err();
    halted |= handler.bcc_recipients(&env.bcc).is_err();

    let subject = env
        .subject
        .as_deref()
        .map(decode_header_value)
        .unwrap_or_default();
    halted |= handler.subject(&subject).is_err();

    if let Some(date) = env.sent_date {
        halted |= handler.sent_date(date).is_err();
    }
    if let Some(date) = env.received_date {
        halted |= handler.received_date(date).is_err();
    }

    halted |= handler.system_flags(env.flags.unwrap_or_default()).is_err();
    halted |= handler.user_flags(&env.user_flags).is_err();
    halted |= handler.color_label(env.color_label).is_err();
    halted |= handler.priority(env.priority).is_err();

    if let Some(content_id) = body.content_id() {
        halted |= handler.content_id(&content_id).is_err();
    }
    if let Some(ref reference) = env.message_reference {
        halted |= handler.message_reference(reference).is_err();
    }

    if let Some(ref to) = env.disposition_notification_to {
        // The flag as it was when the request was evaluated reflects the
        // user's intent better than the current one.
        let seen = env
            .previously_seen
            .or_else(|| env.flags.map(|f| f.contains(SystemFlags::SEEN)));
        if let Some(seen) = seen {
            halted |= handler.disposition_notification(to, seen).is_err();
        }
    }

    halted |= handler.headers(&env.headers).is_err();
    halted
}
