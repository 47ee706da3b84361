//! Negative-comment alerts.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::ServiceError;
use crate::sentiment::SentimentLabel;
use crate::webhook::IssueEvent;

/// A pub/sub notification topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), ServiceError>;
}

/// Plain-text alert describing a negative comment.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertMessage {
    pub label: SentimentLabel,
    pub project_key: String,
    pub issue_key: String,
    pub assignee_name: String,
    pub reporter_name: String,
    pub comment: String,
}

impl AlertMessage {
    pub fn new(issue: &IssueEvent, label: SentimentLabel, comment: &str) -> Self {
        Self {
            label,
            project_key: issue.project_key.clone(),
            issue_key: issue.issue_key.clone(),
            assignee_name: issue.assignee_name.clone(),
            reporter_name: issue.reporter_name.clone(),
            comment: comment.to_string(),
        }
    }
}

impl fmt::Display for AlertMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Negative Comment")?;
        writeln!(f, "Sentiment: {}", self.label)?;
        writeln!(f, "Project: {}", self.project_key)?;
        writeln!(f, "Issue: {}", self.issue_key)?;
        writeln!(f, "Assignee: {}", self.assignee_name)?;
        writeln!(f, "Reporter: {}", self.reporter_name)?;
        write!(f, "Comment: {}", self.comment)
    }
}

/// Whether a classification result warrants an alert.
pub fn should_notify(label: Option<SentimentLabel>) -> bool {
    label.is_some_and(|l| l.is_negative())
}

/// Publishes alerts, swallowing failures.
pub struct Notifier {
    publisher: Arc<dyn Publisher>,
}

impl Notifier {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    /// Publish `message` to `topic`. Returns `false` if publishing failed.
    pub async fn notify(&self, topic: &str, message: &str) -> bool {
        match self.publisher.publish(topic, message).await {
            Ok(()) => {
                info!(topic, "Alert published");
                true
            }
            Err(e) => {
                error!(topic, error = %e, "Failed to publish alert");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, topic: &str, message: &str) -> Result<(), ServiceError> {
            if self.fail {
                return Err(ServiceError::AuthFailed {
                    service: "sns".into(),
                    status: 403,
                    message: "not authorized".into(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((topic.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn issue() -> IssueEvent {
        IssueEvent {
            project_key: "OPS".into(),
            issue_key: "OPS-7".into(),
            reporter_name: "Dana".into(),
            assignee_name: "Unassigned".into(),
        }
    }

    #[test]
    fn alert_lists_every_field() {
        let alert = AlertMessage::new(&issue(), SentimentLabel::Negative, "Still broken.");
        assert_eq!(
            alert.to_string(),
            "Negative Comment\nSentiment: NEGATIVE\nProject: OPS\nIssue: OPS-7\n\
             Assignee: Unassigned\nReporter: Dana\nComment: Still broken."
        );
    }

    #[test]
    fn only_negative_notifies() {
        assert!(should_notify(Some(SentimentLabel::Negative)));
        assert!(!should_notify(Some(SentimentLabel::Positive)));
        assert!(!should_notify(Some(SentimentLabel::Neutral)));
        assert!(!should_notify(Some(SentimentLabel::Mixed)));
        assert!(!should_notify(None));
    }

    #[tokio::test]
    async fn notify_reports_success() {
        let publisher = Arc::new(RecordingPublisher::default());
        let notifier = Notifier::new(Arc::clone(&publisher) as Arc<dyn Publisher>);
        assert!(notifier.notify("arn:topic", "hello").await);
        assert_eq!(
            publisher.sent.lock().unwrap().as_slice(),
            &[("arn:topic".to_string(), "hello".to_string())]
        );
    }

    #[tokio::test]
    async fn notify_swallows_failure() {
        let publisher = Arc::new(RecordingPublisher {
            fail: true,
            ..RecordingPublisher::default()
        });
        let notifier = Notifier::new(publisher);
        assert!(!notifier.notify("arn:topic", "hello").await);
    }
}
