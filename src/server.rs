//! HTTP surface: the webhook endpoint and a health check.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::aws::{AwsClient, AwsCredentials, BedrockClient, ComprehendClient, SnsClient};
use crate::config::AppConfig;
use crate::handler::{Acknowledgment, WebhookHandler};
use crate::notify::Notifier;
use crate::paraphrase::Paraphraser;
use crate::sentiment::SentimentClassifier;

/// Service name reported by the health check.
pub const SERVICE_NAME: &str = "sentiment-webhook";

/// Wire the AWS-backed handler described by `config`.
pub fn build_handler(
    config: &AppConfig,
    credentials: Arc<AwsCredentials>,
) -> crate::error::Result<WebhookHandler> {
    let aws = AwsClient::new(credentials, &config.region, config.http_timeout)?;

    let classifier = SentimentClassifier::new(
        Arc::new(ComprehendClient::new(aws.clone(), &config.comprehend_endpoint)),
        config.classifier(),
    );
    let paraphraser = config.paraphrase_enabled.then(|| {
        Paraphraser::new(
            Arc::new(BedrockClient::new(aws.clone(), &config.bedrock_endpoint)),
            config.paraphrase(),
        )
    });
    let notifier = Notifier::new(Arc::new(SnsClient::new(aws, &config.sns_endpoint)));

    Ok(WebhookHandler::new(
        config.handler(),
        paraphraser,
        classifier,
        notifier,
    ))
}

/// Build the Axum router for the webhook service.
pub fn webhook_routes(handler: Arc<WebhookHandler>) -> Router {
    Router::new()
        .route("/webhook", post(receive_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

async fn receive_webhook(
    State(handler): State<Arc<WebhookHandler>>,
    body: Bytes,
) -> impl IntoResponse {
    let request_id = Uuid::new_v4();
    let span = info_span!("webhook", %request_id);

    async move {
        match handler.handle(&body).await {
            Ok(report) => {
                info!(
                    issue_key = %report.issue_key,
                    label = report.sentiment.as_ref().map(|s| s.label.as_str()).unwrap_or("none"),
                    notified = report.notified,
                    "Webhook acknowledged"
                );
                (
                    StatusCode::OK,
                    Json(serde_json::json!(Acknowledgment::received())),
                )
            }
            Err(e) => {
                warn!(error = %e, "Rejected webhook payload");
                (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "status": "rejected",
                        "error": e.to_string()
                    })),
                )
            }
        }
    }
    .instrument(span)
    .await
}
