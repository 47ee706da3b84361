//! Comment text normalizer.
//!
//! Strips the boilerplate that Jira and mail gateways wrap around a
//! comment before it is worth classifying:
//! 1. `!filename!` attachment embeds
//! 2. the "An email has been sent for this issue:" header
//! 3. everything after "Reply above this line"
//! 4. `{color:...}` / `{color}` markup
//! 5. Outlook safelink wrappers
//!
//! Every stage is a pure `&str -> String` transform. A missing marker is a
//! no-op, never an error. Stages never trim whitespace; callers decide.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::webhook::WebhookEvent;

/// Header Jira prepends to comments created from inbound email.
pub const EMAIL_HEADER_MARKER: &str = "An email has been sent for this issue:";

/// Separator mail clients put above the quoted thread.
pub const REPLY_MARKER: &str = "Reply above this line";

static COLOR_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{color(?::[^{}]*)?\}").expect("color tag regex"));

// Angle-bracket wrapper (optionally inside `[...]`) or Jira `[text|url]` link markup.
static SAFELINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\[?<https?://[^>\s]*safelinks\.protection\.outlook\.com[^>\s]*>\]?|\[[^\[\]|]*\|https?://[^\]\s]*safelinks\.protection\.outlook\.com[^\]\s]*\]",
    )
    .expect("safelink regex")
});

/// Per-event inputs the stages need.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeContext<'a> {
    pub issue_key: &'a str,
    /// Filename of the latest attachment on the issue, if any.
    pub attachment_filename: Option<&'a str>,
}

impl<'a> NormalizeContext<'a> {
    pub fn from_event(event: &'a WebhookEvent) -> Self {
        Self {
            issue_key: &event.issue.issue_key,
            attachment_filename: event.latest_attachment().map(|a| a.filename.as_str()),
        }
    }
}

/// A normalizer stage, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Attachment,
    EmailHeader,
    ReplyTruncation,
    ColorTags,
    Safelinks,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Attachment,
        Stage::EmailHeader,
        Stage::ReplyTruncation,
        Stage::ColorTags,
        Stage::Safelinks,
    ];

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Attachment => "attachment_handled",
            Self::EmailHeader => "email_marker_handled",
            Self::ReplyTruncation => "reply_truncated",
            Self::ColorTags => "tags_stripped",
            Self::Safelinks => "links_stripped",
        }
    }

    pub fn apply(&self, text: &str, ctx: &NormalizeContext<'_>) -> String {
        match self {
            Self::Attachment => strip_attachment_markup(text, ctx.attachment_filename),
            Self::EmailHeader => strip_email_header(text, ctx.issue_key),
            Self::ReplyTruncation => truncate_at_reply_marker(text),
            Self::ColorTags => strip_color_tags(text),
            Self::Safelinks => strip_safelinks(text),
        }
    }
}

/// Run every stage over `raw` in order.
///
/// `on_stage` is called after each stage with the stage and its output.
pub fn normalize<F>(raw: &str, ctx: &NormalizeContext<'_>, mut on_stage: F) -> String
where
    F: FnMut(Stage, &str),
{
    Stage::ALL.iter().fold(raw.to_string(), |text, &stage| {
        let next = stage.apply(&text, ctx);
        debug!(
            stage = stage.label(),
            before = text.len(),
            after = next.len(),
            "Normalizer stage applied"
        );
        on_stage(stage, &next);
        next
    })
}

/// Remove a `!filename!` embed.
///
/// Only applies when `filename` literally occurs in `text`; then everything
/// from the first `!` to the last `!` (inclusive) is removed. With fewer
/// than two `!` the text is returned unchanged.
pub fn strip_attachment_markup(text: &str, filename: Option<&str>) -> String {
    let Some(filename) = filename.filter(|f| !f.is_empty()) else {
        return text.to_string();
    };
    if !text.contains(filename) {
        return text.to_string();
    }
    match (text.find('!'), text.rfind('!')) {
        (Some(first), Some(last)) if first < last => {
            format!("{}{}", &text[..first], &text[last + 1..])
        }
        _ => text.to_string(),
    }
}

/// Drop the email-notification header up to and including the issue key.
///
/// Applies only when `text` starts with [`EMAIL_HEADER_MARKER`] and the key
/// occurs after the marker.
pub fn strip_email_header(text: &str, issue_key: &str) -> String {
    if issue_key.is_empty() {
        return text.to_string();
    }
    let Some(rest) = text.strip_prefix(EMAIL_HEADER_MARKER) else {
        return text.to_string();
    };
    match rest.find(issue_key) {
        Some(pos) => rest[pos + issue_key.len()..].to_string(),
        None => text.to_string(),
    }
}

/// Keep text up to and including the first [`REPLY_MARKER`].
pub fn truncate_at_reply_marker(text: &str) -> String {
    match text.find(REPLY_MARKER) {
        Some(pos) => text[..pos + REPLY_MARKER.len()].to_string(),
        None => text.to_string(),
    }
}

/// Remove all `{color:...}` and `{color}` tags.
///
/// Repeats until no tag is left, since removing a nested tag can join its
/// surroundings into a new one.
pub fn strip_color_tags(text: &str) -> String {
    let mut out = text.to_string();
    while COLOR_TAG.is_match(&out) {
        out = COLOR_TAG.replace_all(&out, "").into_owned();
    }
    out
}

/// Remove Outlook safelink wrappers.
pub fn strip_safelinks(text: &str) -> String {
    SAFELINK.replace_all(text, "").into_owned()
}
