//! Sentiment classifier: direct or chunked detection with score averaging.
//!
//! Texts up to `chunk_bytes` go to the service in one call. Longer texts are
//! cut into windows of at most `chunk_bytes`, sent through the batch API,
//! and the per-window scores are averaged. Service failures never escape:
//! they are logged and the text is treated as having no sentiment.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::{SentimentResult, SentimentScores, SentimentService};

/// Classifier configuration.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Size threshold and window size, in UTF-8 bytes.
    pub chunk_bytes: usize,
    /// Language code passed to the service.
    pub language_code: String,
    /// Maximum documents per batch request.
    pub batch_size: usize,
    /// Texts with this many characters or fewer are not classified.
    pub min_chars: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            chunk_bytes: 4000,
            language_code: "en".to_string(),
            batch_size: 25,
            min_chars: 2,
        }
    }
}

/// Classifies comment text through a [`SentimentService`].
pub struct SentimentClassifier {
    service: Arc<dyn SentimentService>,
    config: ClassifierConfig,
}

impl SentimentClassifier {
    pub fn new(service: Arc<dyn SentimentService>, config: ClassifierConfig) -> Self {
        Self { service, config }
    }

    /// Classify `text`. `None` means no usable signal.
    pub async fn classify(&self, text: &str) -> Option<SentimentResult> {
        if text.trim().chars().count() <= self.config.min_chars {
            debug!(len = text.len(), "Text too short to classify");
            return None;
        }

        if text.len() <= self.config.chunk_bytes {
            self.classify_direct(text).await
        } else {
            self.classify_chunked(text).await
        }
    }

    async fn classify_direct(&self, text: &str) -> Option<SentimentResult> {
        match self
            .service
            .detect_sentiment(text, &self.config.language_code)
            .await
        {
            Ok(detection) => Some(SentimentResult {
                label: detection.label,
                scores: detection.scores,
                chunks: 1,
            }),
            Err(e) => {
                warn!(service = e.service(), error = %e, "Sentiment detection failed");
                None
            }
        }
    }

    async fn classify_chunked(&self, text: &str) -> Option<SentimentResult> {
        let chunks: Vec<String> = split_into_chunks(text, self.config.chunk_bytes)
            .into_iter()
            .map(str::to_string)
            .collect();
        debug!(chunks = chunks.len(), bytes = text.len(), "Classifying in chunks");

        let batch_size = self.config.batch_size.max(1);
        let language = self.config.language_code.as_str();
        let responses = join_all(
            chunks
                .chunks(batch_size)
                .map(|batch| self.service.batch_detect_sentiment(batch, language)),
        )
        .await;

        let mut scores = Vec::with_capacity(chunks.len());
        for response in responses {
            let items = match response {
                Ok(items) => items,
                Err(e) => {
                    warn!(service = e.service(), error = %e, "Batch sentiment detection failed");
                    return None;
                }
            };
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Ok(detection) => scores.push(detection.scores),
                    Err(e) => warn!(index, error = %e, "Chunk dropped from sentiment average"),
                }
            }
        }

        let averaged = SentimentScores::average(&scores)?;
        Some(SentimentResult {
            label: averaged.dominant_label(),
            scores: averaged,
            chunks: scores.len(),
        })
    }
}

/// Split `text` into consecutive windows of at most `max_bytes` bytes.
///
/// Windows end on character boundaries, so a window may be shorter than
/// `max_bytes`; a single character wider than `max_bytes` gets a window of
/// its own. Concatenating the windows yields `text`.
pub fn split_into_chunks(text: &str, max_bytes: usize) -> Vec<&str> {
    let max_bytes = max_bytes.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if rest.len() <= max_bytes {
            chunks.push(rest);
            break;
        }
        let mut cut = max_bytes;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }

    chunks
}
