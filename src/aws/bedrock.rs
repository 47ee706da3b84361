//! Amazon Bedrock runtime client for Titan text models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::{AwsClient, service_error};
use super::sigv4::uri_encode;
use crate::error::ServiceError;
use crate::paraphrase::{GenerationRequest, TextGenerator};

const SERVICE: &str = "bedrock";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanRequest<'a> {
    input_text: &'a str,
    text_generation_config: TitanConfig<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TitanConfig<'a> {
    max_token_count: u32,
    stop_sequences: &'a [String],
    temperature: f32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TitanResult {
    #[serde(default)]
    output_text: String,
}

#[derive(Debug, Deserialize)]
struct TitanResponse {
    #[serde(default)]
    results: Vec<TitanResult>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(alias = "Message", default)]
    message: Option<String>,
}

/// [`TextGenerator`] backed by the Bedrock `InvokeModel` API.
pub struct BedrockClient {
    aws: AwsClient,
    endpoint: String,
}

impl BedrockClient {
    pub fn new(aws: AwsClient, endpoint: impl Into<String>) -> Self {
        Self {
            aws,
            endpoint: endpoint.into(),
        }
    }

    fn invoke_url(&self, model_id: &str) -> String {
        format!(
            "{}/model/{}/invoke",
            self.endpoint.trim_end_matches('/'),
            uri_encode(model_id, true)
        )
    }
}

#[async_trait]
impl TextGenerator for BedrockClient {
    async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<String, ServiceError> {
        let body = serde_json::to_vec(&TitanRequest {
            input_text: &request.prompt,
            text_generation_config: TitanConfig {
                max_token_count: request.max_tokens,
                stop_sequences: &request.stop_sequences,
                temperature: request.temperature,
                top_p: 1.0,
            },
        })
        .map_err(|e| ServiceError::RequestFailed {
            service: SERVICE.to_string(),
            reason: format!("Failed to encode request: {e}"),
        })?;

        let response = self
            .aws
            .post(
                SERVICE,
                &self.invoke_url(model_id),
                &[
                    ("content-type", "application/json"),
                    ("accept", "application/json"),
                ],
                body,
            )
            .await?;

        if !response.is_success() {
            let parsed: ErrorBody = serde_json::from_str(&response.body).unwrap_or_default();
            let message = parsed.message.unwrap_or(response.body);
            return Err(service_error(
                SERVICE,
                response.status,
                response.error_type.as_deref(),
                message,
            ));
        }

        let parsed: TitanResponse =
            serde_json::from_str(&response.body).map_err(|e| ServiceError::InvalidResponse {
                service: SERVICE.to_string(),
                reason: e.to_string(),
            })?;
        parsed
            .results
            .into_iter()
            .next()
            .map(|r| r.output_text)
            .ok_or_else(|| ServiceError::InvalidResponse {
                service: SERVICE.to_string(),
                reason: "response contained no results".to_string(),
            })
    }
}
