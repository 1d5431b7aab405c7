//! Field structuring: `RawText` → labeled [`Field`]s via a language model.
//!
//! # Pipeline
//!
//! ```text
//! text → overlapping chunks → one request per chunk (concurrent, ordered)
//!      → strict response parsing → ordered merge (first occurrence wins)
//! ```
//!
//! Chunk `i` starts at character `i * (size - overlap)`. A failed or
//! unparsable chunk contributes zero fields; if every chunk fails the result
//! is simply empty.

pub mod llm;
pub mod merge;
pub mod prompt;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::StructureConfig;
use crate::error::LlmError;
use crate::layout::Field;

pub use llm::{ChatCompletionsClient, LanguageModel, LlmRequest};
pub use merge::{group_rows, merge_chunks, FieldAccumulator, FieldLabel};

/// A bounded slice of the document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    /// Character offset of the chunk start in the full text.
    pub start: usize,
    pub text: String,
}

/// Split `text` into chunks of `size` characters overlapping by `overlap`.
///
/// Offsets count `char`s. The last chunk is truncated to the text length.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = text.chars().collect();
    let size = size.max(1);
    let stride = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            text: chars[start..end].iter().collect(),
        });
        if end == chars.len() {
            break;
        }
        start += stride;
    }

    chunks
}

/// What became of one chunk request.
#[derive(Debug)]
pub enum ChunkOutcome {
    Parsed(Vec<Field>),
    /// The model replied, but not with the expected schema.
    Unparsable(String),
    Failed(LlmError),
}

impl ChunkOutcome {
    pub fn into_fields(self) -> Vec<Field> {
        match self {
            Self::Parsed(fields) => fields,
            Self::Unparsable(_) | Self::Failed(_) => Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }
}

/// Strict response schema: `{"fields": [{label, value, snippet?}]}`.
#[derive(Deserialize)]
struct ModelResponse {
    fields: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct ModelField {
    #[serde(alias = "name")]
    label: String,
    value: String,
    #[serde(default)]
    snippet: Option<String>,
}

impl ModelField {
    fn validate(self) -> Option<Field> {
        if self.label.trim().is_empty() || self.value.trim().is_empty() {
            return None;
        }
        if FieldLabel::is_malformed_group(self.label.trim()) {
            debug!("Label {:?} has malformed grouping, passing through as-is", self.label);
        }
        Some(Field {
            label: self.label,
            value: self.value,
            snippet: self.snippet.filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Parse a model reply into fields.
///
/// Accepts a bare JSON object or one wrapped in prose/markdown fences (the
/// outermost `{...}` span). Entries that violate the schema are dropped
/// individually; a reply without a `fields` array is an error.
pub fn parse_response(content: &str) -> Result<Vec<Field>, String> {
    let response = match serde_json::from_str::<ModelResponse>(content.trim()) {
        Ok(response) => response,
        Err(direct) => {
            let embedded = content
                .find('{')
                .zip(content.rfind('}'))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &content[start..=end])
                .ok_or_else(|| format!("no JSON object in reply: {direct}"))?;
            serde_json::from_str::<ModelResponse>(embedded).map_err(|e| e.to_string())?
        }
    };

    let total = response.fields.len();
    let fields: Vec<Field> = response
        .fields
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ModelField>(value).ok())
        .filter_map(ModelField::validate)
        .collect();

    if fields.len() < total {
        debug!("Dropped {} schema-invalid fields", total - fields.len());
    }
    Ok(fields)
}

/// Result of [`FieldStructurer::structure`].
#[derive(Debug, Clone, Default)]
pub struct Structured {
    pub fields: Vec<Field>,
    pub chunks: usize,
    pub failed_chunks: usize,
}

/// Chunked, concurrent LLM field extraction.
pub struct FieldStructurer {
    model: Option<Arc<dyn LanguageModel>>,
    config: StructureConfig,
    temperature: f32,
}

impl FieldStructurer {
    pub fn new(model: Arc<dyn LanguageModel>, config: StructureConfig) -> Self {
        Self {
            model: Some(model),
            config,
            temperature: 0.0,
        }
    }

    /// A structurer with no backend; always yields zero fields.
    pub fn disabled(config: StructureConfig) -> Self {
        Self {
            model: None,
            config,
            temperature: 0.0,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Extract and merge fields from the full document text.
    ///
    /// Never fails: chunk failures degrade to zero fields for that chunk.
    pub async fn structure(&self, text: &str) -> Structured {
        let Some(model) = &self.model else {
            warn!("No language model configured; returning empty field set");
            return Structured::default();
        };

        let chunks = chunk_text(text, self.config.chunk_size, self.config.chunk_overlap);
        if chunks.is_empty() {
            return Structured::default();
        }
        info!(
            "Structuring {} chunks with {} (concurrency {})",
            chunks.len(),
            model.name(),
            self.config.concurrency
        );

        // `buffered` yields in chunk order, which the merge relies on.
        let outcomes: Vec<ChunkOutcome> = stream::iter(chunks.iter())
            .map(|chunk| self.run_chunk(model.as_ref(), chunk))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let failed_chunks = outcomes.iter().filter(|o| !o.is_success()).count();
        let mut acc = FieldAccumulator::new();
        for outcome in outcomes {
            acc.extend(outcome.into_fields());
        }
        let duplicates = acc.duplicates();
        let fields = acc.finish();

        if failed_chunks == chunks.len() {
            warn!("All {failed_chunks} chunks failed; zero fields extracted");
        } else {
            info!(
                "Extracted {} fields ({duplicates} duplicates merged, {failed_chunks}/{} chunks failed)",
                fields.len(),
                chunks.len()
            );
        }

        Structured {
            fields,
            chunks: chunks.len(),
            failed_chunks,
        }
    }

    async fn run_chunk(&self, model: &dyn LanguageModel, chunk: &Chunk) -> ChunkOutcome {
        let request = LlmRequest {
            system: prompt::SYSTEM_PROMPT.to_string(),
            user: prompt::user_prompt(&chunk.text),
            temperature: self.temperature,
        };

        let timeout = self.config.request_timeout();
        let reply = match tokio::time::timeout(timeout, model.complete(&request)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Chunk {} failed: {e}", chunk.index);
                return ChunkOutcome::Failed(e);
            }
            Err(_) => {
                warn!("Chunk {} timed out after {timeout:?}", chunk.index);
                return ChunkOutcome::Failed(LlmError::Timeout(timeout));
            }
        };

        match parse_response(&reply) {
            Ok(fields) => {
                debug!("Chunk {}: {} fields", chunk.index, fields.len());
                ChunkOutcome::Parsed(fields)
            }
            Err(reason) => {
                warn!("Chunk {}: unparsable reply: {reason}", chunk.index);
                ChunkOutcome::Unparsable(reason)
            }
        }
    }
}
