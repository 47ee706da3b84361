//! Webhook request handler: the linear comment pipeline.
//!
//! ```text
//! ParseReceived → AttachmentHandled → EmailMarkerHandled → ReplyTruncated
//!   → TagsStripped → LinksStripped → Paraphrased → Classified
//!   → NotifiedOrSkipped → Acknowledged
//! ```
//!
//! Only parsing can fail. Every later state is reached unconditionally and
//! the caller always gets [`Acknowledgment::received`].

use serde::Serialize;
use tracing::{debug, info};

use crate::error::PayloadError;
use crate::normalize::{NormalizeContext, Stage, normalize};
use crate::notify::{AlertMessage, Notifier, should_notify};
use crate::paraphrase::Paraphraser;
use crate::sentiment::{SentimentClassifier, SentimentResult};
use crate::webhook::{WebhookEvent, parse_webhook};

/// Pipeline states, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    ParseReceived,
    AttachmentHandled,
    EmailMarkerHandled,
    ReplyTruncated,
    TagsStripped,
    LinksStripped,
    Paraphrased,
    Classified,
    NotifiedOrSkipped,
    Acknowledged,
}

impl HandlerState {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ParseReceived => "parse_received",
            Self::AttachmentHandled => "attachment_handled",
            Self::EmailMarkerHandled => "email_marker_handled",
            Self::ReplyTruncated => "reply_truncated",
            Self::TagsStripped => "tags_stripped",
            Self::LinksStripped => "links_stripped",
            Self::Paraphrased => "paraphrased",
            Self::Classified => "classified",
            Self::NotifiedOrSkipped => "notified_or_skipped",
            Self::Acknowledged => "acknowledged",
        }
    }

    fn after_stage(stage: Stage) -> Self {
        match stage {
            Stage::Attachment => Self::AttachmentHandled,
            Stage::EmailHeader => Self::EmailMarkerHandled,
            Stage::ReplyTruncation => Self::ReplyTruncated,
            Stage::ColorTags => Self::TagsStripped,
            Stage::Safelinks => Self::LinksStripped,
        }
    }
}

/// Fixed response body returned to the webhook sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Acknowledgment {
    pub status: &'static str,
}

impl Acknowledgment {
    pub const fn received() -> Self {
        Self { status: "received" }
    }
}

/// Handler configuration.
#[derive(Debug, Clone, Default)]
pub struct HandlerConfig {
    /// Topic alerts are published to.
    pub topic_arn: String,
    /// Project keys whose comments are acknowledged without analysis.
    pub excluded_projects: Vec<String>,
}

impl HandlerConfig {
    pub fn is_excluded(&self, project_key: &str) -> bool {
        self.excluded_projects
            .iter()
            .any(|p| p.eq_ignore_ascii_case(project_key))
    }
}

/// What happened to one webhook delivery. Internal only; never sent back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerReport {
    pub issue_key: String,
    pub cleaned_text: String,
    pub sentiment: Option<SentimentResult>,
    pub notified: bool,
    /// Set when the project is excluded and analysis was skipped.
    pub skipped: bool,
}

/// Orchestrates normalize → paraphrase → classify → notify.
pub struct WebhookHandler {
    config: HandlerConfig,
    paraphraser: Option<Paraphraser>,
    classifier: SentimentClassifier,
    notifier: Notifier,
}

impl WebhookHandler {
    pub fn new(
        config: HandlerConfig,
        paraphraser: Option<Paraphraser>,
        classifier: SentimentClassifier,
        notifier: Notifier,
    ) -> Self {
        Self {
            config,
            paraphraser,
            classifier,
            notifier,
        }
    }

    /// Parse and process a raw webhook body.
    pub async fn handle(&self, body: &[u8]) -> Result<HandlerReport, PayloadError> {
        let event = parse_webhook(body)?;
        transition(&event, HandlerState::ParseReceived);
        Ok(self.process(&event).await)
    }

    /// Run the pipeline for an already parsed event.
    pub async fn process(&self, event: &WebhookEvent) -> HandlerReport {
        let issue = &event.issue;
        info!(
            project = %issue.project_key,
            issue_key = %issue.issue_key,
            comment_id = %event.comment.id,
            "Processing comment"
        );

        if self.config.is_excluded(&issue.project_key) {
            info!(project = %issue.project_key, "Project excluded from analysis");
            transition(event, HandlerState::Acknowledged);
            return HandlerReport {
                issue_key: issue.issue_key.clone(),
                cleaned_text: String::new(),
                sentiment: None,
                notified: false,
                skipped: true,
            };
        }

        let ctx = NormalizeContext::from_event(event);
        let normalized = normalize(&event.comment.raw_body, &ctx, |stage, _| {
            transition(event, HandlerState::after_stage(stage))
        });
        let mut text = normalized.trim().to_string();

        if let Some(paraphraser) = &self.paraphraser
            && !text.is_empty()
        {
            text = paraphraser.paraphrase(&text).await;
        }
        transition(event, HandlerState::Paraphrased);

        let sentiment = self.classifier.classify(&text).await;
        transition(event, HandlerState::Classified);
        match &sentiment {
            Some(result) => info!(
                issue_key = %issue.issue_key,
                label = %result.label,
                chunks = result.chunks,
                "Comment classified"
            ),
            None => info!(issue_key = %issue.issue_key, "No sentiment for comment"),
        }

        let notified = match sentiment.as_ref().map(|s| s.label) {
            Some(label) if should_notify(Some(label)) => {
                let alert = AlertMessage::new(issue, label, &text);
                self.notifier
                    .notify(&self.config.topic_arn, &alert.to_string())
                    .await
            }
            _ => false,
        };
        transition(event, HandlerState::NotifiedOrSkipped);
        transition(event, HandlerState::Acknowledged);

        HandlerReport {
            issue_key: issue.issue_key.clone(),
            cleaned_text: text,
            sentiment,
            notified,
            skipped: false,
        }
    }
}

fn transition(event: &WebhookEvent, state: HandlerState) {
    debug!(issue_key = %event.issue.issue_key, state = state.label(), "Handler state");
}
