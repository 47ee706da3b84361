//! Inbound issue-comment webhooks: payload parsing and domain types.

pub mod payload;
pub mod types;

pub use payload::parse_webhook;
pub use types::{Attachment, Comment, IssueEvent, UNASSIGNED, WebhookEvent, latest_attachment};
