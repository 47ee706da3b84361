//! Sentiment detection: labels, scores, and the service seam.

pub mod classifier;

pub use classifier::{ClassifierConfig, SentimentClassifier, split_into_chunks};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Overall sentiment of a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl SentimentLabel {
    /// Parse a service label, ignoring case.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "POSITIVE" => Some(Self::Positive),
            "NEGATIVE" => Some(Self::Negative),
            "NEUTRAL" => Some(Self::Neutral),
            "MIXED" => Some(Self::Mixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POSITIVE",
            Self::Negative => "NEGATIVE",
            Self::Neutral => "NEUTRAL",
            Self::Mixed => "MIXED",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, Self::Negative)
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence per sentiment category, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f32,
    pub negative: f32,
    pub neutral: f32,
    pub mixed: f32,
}

impl SentimentScores {
    /// Scores in tie-break order: positive, negative, neutral, mixed.
    fn ordered(&self) -> [(SentimentLabel, f32); 4] {
        [
            (SentimentLabel::Positive, self.positive),
            (SentimentLabel::Negative, self.negative),
            (SentimentLabel::Neutral, self.neutral),
            (SentimentLabel::Mixed, self.mixed),
        ]
    }

    /// The category with the highest score.
    ///
    /// Ties go to the category that comes first in the order positive,
    /// negative, neutral, mixed.
    pub fn dominant_label(&self) -> SentimentLabel {
        let mut best = (SentimentLabel::Positive, self.positive);
        for (label, score) in self.ordered().into_iter().skip(1) {
            if score > best.1 {
                best = (label, score);
            }
        }
        best.0
    }

    /// Component-wise arithmetic mean. `None` for an empty slice.
    pub fn average(scores: &[SentimentScores]) -> Option<SentimentScores> {
        if scores.is_empty() {
            return None;
        }
        let n = scores.len() as f32;
        let sum = scores.iter().fold(SentimentScores::default(), |acc, s| SentimentScores {
            positive: acc.positive + s.positive,
            negative: acc.negative + s.negative,
            neutral: acc.neutral + s.neutral,
            mixed: acc.mixed + s.mixed,
        });
        Some(SentimentScores {
            positive: sum.positive / n,
            negative: sum.negative / n,
            neutral: sum.neutral / n,
            mixed: sum.mixed / n,
        })
    }
}

/// One detection as returned by the sentiment service.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentDetection {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
}

/// Final classification of a comment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentResult {
    pub label: SentimentLabel,
    pub scores: SentimentScores,
    /// Number of chunks that contributed to the scores.
    pub chunks: usize,
}

/// A managed sentiment-analysis service.
#[async_trait]
pub trait SentimentService: Send + Sync {
    /// Detect the sentiment of a single document.
    async fn detect_sentiment(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<SentimentDetection, ServiceError>;

    /// Detect sentiment for several documents in one request.
    ///
    /// Returns one result per input, in input order.
    async fn batch_detect_sentiment(
        &self,
        texts: &[String],
        language_code: &str,
    ) -> Result<Vec<Result<SentimentDetection, ServiceError>>, ServiceError>;
}
