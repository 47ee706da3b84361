//! JSON payload parsing for issue-comment webhooks.
//!
//! Every field the pipeline relies on is optional at the serde level and
//! validated explicitly afterwards, so a malformed delivery is reported with
//! the path of the first missing field instead of a serde position.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PayloadError;
use crate::webhook::types::{Attachment, Comment, IssueEvent, UNASSIGNED, WebhookEvent};

#[derive(Debug, Deserialize)]
struct RawPayload {
    issue: Option<RawIssue>,
    comment: Option<RawComment>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: Option<String>,
    fields: Option<RawFields>,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    project: Option<RawProject>,
    reporter: Option<RawUser>,
    #[serde(default)]
    assignee: Option<RawUser>,
    #[serde(default)]
    attachment: Option<Vec<RawAttachment>>,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawAttachment {
    id: Option<Value>,
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawComment {
    id: Option<Value>,
    body: Option<String>,
}

fn required<T>(value: Option<T>, path: &str) -> Result<T, PayloadError> {
    value.ok_or_else(|| PayloadError::MissingField(path.to_string()))
}

/// Ids arrive as strings from Jira Cloud and as numbers from some proxies.
fn id_to_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a webhook body into a [`WebhookEvent`].
pub fn parse_webhook(body: &[u8]) -> Result<WebhookEvent, PayloadError> {
    let raw: RawPayload =
        serde_json::from_slice(body).map_err(|e| PayloadError::InvalidJson(e.to_string()))?;

    let issue = required(raw.issue, "issue")?;
    let issue_key = required(issue.key, "issue.key")?;
    let fields = required(issue.fields, "issue.fields")?;
    let project = required(fields.project, "issue.fields.project")?;
    let project_key = required(project.key, "issue.fields.project.key")?;
    let reporter = required(fields.reporter, "issue.fields.reporter")?;
    let reporter_name = required(reporter.display_name, "issue.fields.reporter.displayName")?;
    let assignee_name = fields
        .assignee
        .and_then(|a| a.display_name)
        .unwrap_or_else(|| UNASSIGNED.to_string());

    // Attachments without a filename cannot match anything; drop them.
    let attachments = fields
        .attachment
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| {
            Some(Attachment {
                id: id_to_string(a.id)?,
                filename: a.filename?,
            })
        })
        .collect();

    let comment = required(raw.comment, "comment")?;
    let comment_id = required(id_to_string(comment.id), "comment.id")?;
    let raw_body = required(comment.body, "comment.body")?;

    Ok(WebhookEvent {
        issue: IssueEvent {
            project_key,
            issue_key,
            reporter_name,
            assignee_name,
        },
        comment: Comment {
            id: comment_id,
            raw_body,
        },
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_payload() -> serde_json::Value {
        serde_json::json!({
            "webhookEvent": "comment_created",
            "issue": {
                "key": "OPS-12",
                "fields": {
                    "project": {"key": "OPS"},
                    "reporter": {"displayName": "Dana Reporter"},
                    "assignee": {"displayName": "Sam Assignee"},
                    "attachment": [
                        {"id": "10001", "filename": "trace.log"},
                        {"id": "10004", "filename": "screenshot.png"}
                    ]
                }
            },
            "comment": {"id": "20931", "body": "This is still broken."}
        })
    }

    #[test]
    fn parses_full_payload() {
        let body = serde_json::to_vec(&full_payload()).unwrap();
        let event = parse_webhook(&body).unwrap();

        assert_eq!(event.issue.project_key, "OPS");
        assert_eq!(event.issue.issue_key, "OPS-12");
        assert_eq!(event.issue.reporter_name, "Dana Reporter");
        assert_eq!(event.issue.assignee_name, "Sam Assignee");
        assert_eq!(event.comment.id, "20931");
        assert_eq!(event.comment.raw_body, "This is still broken.");
        assert_eq!(event.attachments.len(), 2);
        assert_eq!(
            event.latest_attachment().map(|a| a.filename.as_str()),
            Some("screenshot.png")
        );
    }

    #[test]
    fn null_assignee_defaults_to_unassigned() {
        let mut payload = full_payload();
        payload["issue"]["fields"]["assignee"] = serde_json::Value::Null;
        let event = parse_webhook(&serde_json::to_vec(&payload).unwrap()).unwrap();
        assert_eq!(event.issue.assignee_name, UNASSIGNED);
    }

    #[test]
    fn null_attachment_list_is_empty() {
        let mut payload = full_payload();
        payload["issue"]["fields"]["attachment"] = serde_json::Value::Null;
        let event = parse_webhook(&serde_json::to_vec(&payload).unwrap()).unwrap();
        assert!(event.attachments.is_empty());
        assert!(event.latest_attachment().is_none());
    }

    #[test]
    fn numeric_ids_are_accepted() {
        let mut payload = full_payload();
        payload["comment"]["id"] = serde_json::json!(20931);
        payload["issue"]["fields"]["attachment"] = serde_json::json!([{"id": 5, "filename": "a.txt"}]);
        let event = parse_webhook(&serde_json::to_vec(&payload).unwrap()).unwrap();
        assert_eq!(event.comment.id, "20931");
        assert_eq!(event.attachments[0].id, "5");
    }

    #[test]
    fn missing_reporter_is_reported_with_path() {
        let mut payload = full_payload();
        payload["issue"]["fields"]
            .as_object_mut()
            .unwrap()
            .remove("reporter");
        let err = parse_webhook(&serde_json::to_vec(&payload).unwrap()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField(ref p) if p == "issue.fields.reporter"));
    }

    #[test]
    fn missing_comment_body_is_reported() {
        let mut payload = full_payload();
        payload["comment"].as_object_mut().unwrap().remove("body");
        let err = parse_webhook(&serde_json::to_vec(&payload).unwrap()).unwrap_err();
        assert!(matches!(err, PayloadError::MissingField(ref p) if p == "comment.body"));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = parse_webhook(b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJson(_)));
    }
}
