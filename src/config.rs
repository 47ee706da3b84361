//! Configuration types.

use std::str::FromStr;
use std::time::Duration;

use crate::aws::regional_endpoint;
use crate::error::ConfigError;
use crate::handler::HandlerConfig;
use crate::paraphrase::ParaphraseConfig;
use crate::sentiment::ClassifierConfig;

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Region for Comprehend, Bedrock and SNS.
    pub region: String,
    /// Topic that receives negative-comment alerts.
    pub topic_arn: String,
    pub language_code: String,
    /// Classifier threshold and chunk window, in bytes.
    pub chunk_bytes: usize,
    /// Project keys whose comments are acknowledged without analysis.
    pub excluded_projects: Vec<String>,
    pub paraphrase_enabled: bool,
    pub paraphrase_model_id: String,
    pub paraphrase_max_tokens: u32,
    pub port: u16,
    /// Timeout applied to every outbound AWS request.
    pub http_timeout: Duration,
    pub comprehend_endpoint: String,
    pub bedrock_endpoint: String,
    pub sns_endpoint: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let region = get("AWS_REGION").unwrap_or_else(|| "ap-south-1".to_string());
        let topic_arn =
            get("SNS_TOPIC_ARN").ok_or_else(|| ConfigError::MissingEnvVar("SNS_TOPIC_ARN".into()))?;

        let classifier_defaults = ClassifierConfig::default();
        let paraphrase_defaults = ParaphraseConfig::default();

        let chunk_bytes = parse_or(get("SENTIMENT_CHUNK_BYTES"), "SENTIMENT_CHUNK_BYTES", classifier_defaults.chunk_bytes)?;
        if chunk_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "SENTIMENT_CHUNK_BYTES".into(),
                message: "must be greater than zero".into(),
            });
        }

        let excluded_projects = get("SENTIMENT_EXCLUDED_PROJECTS")
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let endpoint = |key: &str, prefix: &str| {
            get(key)
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|| regional_endpoint(prefix, &region))
        };

        Ok(Self {
            topic_arn,
            language_code: get("SENTIMENT_LANGUAGE").unwrap_or(classifier_defaults.language_code),
            chunk_bytes,
            excluded_projects,
            paraphrase_enabled: parse_bool(get("PARAPHRASE_ENABLED"), "PARAPHRASE_ENABLED")?,
            paraphrase_model_id: get("PARAPHRASE_MODEL_ID").unwrap_or(paraphrase_defaults.model_id),
            paraphrase_max_tokens: parse_or(
                get("PARAPHRASE_MAX_TOKENS"),
                "PARAPHRASE_MAX_TOKENS",
                paraphrase_defaults.max_tokens,
            )?,
            port: parse_or(get("WEBHOOK_PORT"), "WEBHOOK_PORT", 8080)?,
            http_timeout: Duration::from_secs(parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 30)?),
            comprehend_endpoint: endpoint("COMPREHEND_ENDPOINT", "comprehend"),
            bedrock_endpoint: endpoint("BEDROCK_ENDPOINT", "bedrock-runtime"),
            sns_endpoint: endpoint("SNS_ENDPOINT", "sns"),
            region,
        })
    }

    pub fn classifier(&self) -> ClassifierConfig {
        ClassifierConfig {
            chunk_bytes: self.chunk_bytes,
            language_code: self.language_code.clone(),
            ..ClassifierConfig::default()
        }
    }

    pub fn paraphrase(&self) -> ParaphraseConfig {
        ParaphraseConfig {
            model_id: self.paraphrase_model_id.clone(),
            max_tokens: self.paraphrase_max_tokens,
            ..ParaphraseConfig::default()
        }
    }

    pub fn handler(&self) -> HandlerConfig {
        HandlerConfig {
            topic_arn: self.topic_arn.clone(),
            excluded_projects: self.excluded_projects.clone(),
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(v) => v.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{v:?}: {e}"),
        }),
        None => Ok(default),
    }
}

fn parse_bool(value: Option<String>, key: &str) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{v:?} is not a boolean"),
            }),
        },
    }
}
