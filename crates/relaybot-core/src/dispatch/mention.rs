//! Mention-prefix handling for group messages.
//!
//! Group messages arrive as `@BotName<delimiter>content`. The platform's
//! wide space is the preferred delimiter; a plain ASCII space is the
//! fallback when no wide space is present.

/// Delimiters the platform inserts after a mention.
pub const WIDE_SPACES: [char; 2] = ['\u{2005}', '\u{3000}'];

/// Marks a quoted reply, i.e. a user quoting an earlier bot message.
pub const QUOTED_REPLY_MARKER: &str = "」\n- - - - - - - - - - - - - - -";

/// Return the message content after the mention prefix.
pub fn strip_mention(body: &str) -> &str {
    if let Some((_, rest)) = body.split_once(WIDE_SPACES) {
        return rest;
    }
    if let Some((_, rest)) = body.split_once(' ') {
        return rest;
    }
    body
}

pub fn is_quoted_reply(content: &str) -> bool {
    content.contains(QUOTED_REPLY_MARKER)
}
