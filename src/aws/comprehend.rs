//! Amazon Comprehend sentiment client.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::client::{AwsClient, AwsResponse, service_error};
use crate::error::ServiceError;
use crate::sentiment::{SentimentDetection, SentimentLabel, SentimentScores, SentimentService};

const SERVICE: &str = "comprehend";
const TARGET_PREFIX: &str = "Comprehend_20171127";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentRequest<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchDetectSentimentRequest<'a> {
    text_list: &'a [String],
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireScores {
    #[serde(default)]
    positive: f32,
    #[serde(default)]
    negative: f32,
    #[serde(default)]
    neutral: f32,
    #[serde(default)]
    mixed: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectSentimentResponse {
    sentiment: String,
    sentiment_score: WireScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchItemResult {
    index: usize,
    sentiment: String,
    sentiment_score: WireScores,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchItemError {
    index: usize,
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchDetectSentimentResponse {
    #[serde(default)]
    result_list: Vec<BatchItemResult>,
    #[serde(default)]
    error_list: Vec<BatchItemError>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

fn invalid(reason: impl Into<String>) -> ServiceError {
    ServiceError::InvalidResponse {
        service: SERVICE.to_string(),
        reason: reason.into(),
    }
}

fn to_detection(sentiment: &str, scores: WireScores) -> Result<SentimentDetection, ServiceError> {
    let label = SentimentLabel::parse(sentiment)
        .ok_or_else(|| invalid(format!("unknown sentiment label {sentiment:?}")))?;
    Ok(SentimentDetection {
        label,
        scores: SentimentScores {
            positive: scores.positive,
            negative: scores.negative,
            neutral: scores.neutral,
            mixed: scores.mixed,
        },
    })
}

/// Map a Comprehend error response, preferring the `x-amzn-ErrorType` header
/// over the `__type` field of the body.
fn error_from_response(response: AwsResponse) -> ServiceError {
    let parsed: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
    let code = response.error_type.or_else(|| {
        parsed
            .error_type
            .map(|t| t.rsplit('#').next().unwrap_or_default().to_string())
    });
    let message = parsed.message.unwrap_or(response.body);
    service_error(SERVICE, response.status, code.as_deref(), message)
}

/// [`SentimentService`] backed by Amazon Comprehend.
pub struct ComprehendClient {
    aws: AwsClient,
    endpoint: String,
}

impl ComprehendClient {
    pub fn new(aws: AwsClient, endpoint: impl Into<String>) -> Self {
        Self {
            aws,
            endpoint: endpoint.into(),
        }
    }

    async fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp, ServiceError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_vec(request).map_err(|e| ServiceError::RequestFailed {
            service: SERVICE.to_string(),
            reason: format!("Failed to encode request: {e}"),
        })?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let response = self
            .aws
            .post(
                SERVICE,
                &self.endpoint,
                &[("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())],
                body,
            )
            .await?;

        if !response.is_success() {
            return Err(error_from_response(response));
        }
        serde_json::from_str(&response.body)
            .map_err(|e| invalid(format!("{operation}: {e}")))
    }
}

#[async_trait]
impl SentimentService for ComprehendClient {
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SentimentDetection, ServiceError> {
        let response: DetectSentimentResponse = self
            .call(
                "DetectSentiment",
                &DetectSentimentRequest {
                    text,
                    language_code,
                },
            )
            .await?;
        to_detection(&response.sentiment, response.sentiment_score)
    }

    async fn batch_detect_sentiment(
        &self,
        texts: &[String],
        language_code: &str,
    ) -> Result<Vec<Result<SentimentDetection, ServiceError>>, ServiceError> {
        let response: BatchDetectSentimentResponse = self
            .call(
                "BatchDetectSentiment",
                &BatchDetectSentimentRequest {
                    text_list: texts,
                    language_code,
                },
            )
            .await?;

        let mut slots: Vec<Option<Result<SentimentDetection, ServiceError>>> =
            (0..texts.len()).map(|_| None).collect();
        for item in response.result_list {
            if let Some(slot) = slots.get_mut(item.index) {
                *slot = Some(to_detection(&item.sentiment, item.sentiment_score));
            }
        }
        for item in response.error_list {
            warn!(index = item.index, code = %item.error_code, "Batch item failed");
            if let Some(slot) = slots.get_mut(item.index) {
                *slot = Some(Err(service_error(
                    SERVICE,
                    reqwest::StatusCode::OK,
                    Some(&item.error_code),
                    item.error_message,
                )));
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| slot.unwrap_or_else(|| Err(invalid(format!("no result for item {i}")))))
            .collect())
    }
}
