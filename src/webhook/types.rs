//! Domain types derived from an inbound issue-comment webhook.

use std::cmp::Ordering;

use serde::Serialize;

/// Assignee name used when the issue has nobody assigned.
pub const UNASSIGNED: &str = "Unassigned";

/// Issue-level facts carried into the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueEvent {
    pub project_key: String,
    pub issue_key: String,
    pub reporter_name: String,
    /// Display name of the assignee, or [`UNASSIGNED`].
    pub assignee_name: String,
}

/// The comment that triggered the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: String,
    pub raw_body: String,
}

/// An attachment on the issue. Only the filename of the latest one is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
}

/// A fully parsed webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookEvent {
    pub issue: IssueEvent,
    pub comment: Comment,
    pub attachments: Vec<Attachment>,
}

impl WebhookEvent {
    /// The most recent attachment on the issue, if any.
    pub fn latest_attachment(&self) -> Option<&Attachment> {
        latest_attachment(&self.attachments)
    }
}

/// Total order on attachment ids.
///
/// Numeric ids compare numerically and sort before every non-numeric id;
/// non-numeric ids compare lexically among themselves.
pub fn compare_attachment_ids(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Select the attachment with the maximum id.
///
/// When several attachments share the maximum id the last one in payload
/// order is returned.
pub fn latest_attachment(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments
        .iter()
        .max_by(|a, b| compare_attachment_ids(&a.id, &b.id))
}
