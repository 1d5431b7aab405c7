//! Request-scoped document localization pipeline.
//!
//! Runs the three stages strictly in sequence, because each needs the
//! complete output of the previous one:
//!
//! 1. [`LayoutExtractor`]: document bytes → `RawText` + [`Layout`]
//! 2. [`FieldStructurer`]: `RawText` → deduplicated [`Field`](crate::Field)s
//! 3. [`CoordinateMapper`]: fields → [`MappedField`]s with page rectangles
//!
//! Only an unreadable source document fails the request. Page, chunk and
//! match failures degrade to empty results inside their stage.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{Config, ExtractConfig};
use crate::error::{DocumentError, Result};
use crate::extract::{LayoutExtractor, OcrEngine, PageReport, ReaderRouter, TesseractEngine};
use crate::layout::{Layout, MappedField};
use crate::mapper::CoordinateMapper;
use crate::structure::{ChatCompletionsClient, FieldStructurer};

/// Everything one document run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub raw_text: String,
    pub layout: Layout,
    pub pages: Vec<PageReport>,
    pub fields: Vec<MappedField>,
    /// Chunks sent to the language model.
    pub chunks: usize,
    pub failed_chunks: usize,
}

impl PipelineOutput {
    pub fn located_fields(&self) -> usize {
        self.fields.iter().filter(|f| f.is_located()).count()
    }
}

pub struct Pipeline {
    router: ReaderRouter,
    ocr: Option<Arc<dyn OcrEngine>>,
    extract: ExtractConfig,
    structurer: FieldStructurer,
    mapper: CoordinateMapper,
}

impl Pipeline {
    pub fn new(extract: ExtractConfig, structurer: FieldStructurer, mapper: CoordinateMapper) -> Self {
        Self {
            router: ReaderRouter::new(),
            ocr: None,
            extract,
            structurer,
            mapper,
        }
    }

    /// Wire every stage from configuration.
    ///
    /// OCR uses the configured Tesseract command. Without an API key the
    /// structurer is disabled and the pipeline still yields text and layout.
    pub fn from_config(config: &Config) -> Self {
        let structurer =
            match ChatCompletionsClient::from_config(&config.llm, config.structure.request_timeout()) {
                Ok(client) => FieldStructurer::new(Arc::new(client), config.structure.clone())
                    .with_temperature(config.llm.temperature),
                Err(e) => {
                    warn!("Field structuring disabled: {e}");
                    FieldStructurer::disabled(config.structure.clone())
                }
            };

        Self::new(
            config.extract.clone(),
            structurer,
            CoordinateMapper::new(config.mapper.clone()),
        )
        .with_ocr(Arc::new(TesseractEngine::new(
            config.extract.ocr_command.clone(),
            config.extract.ocr_language.clone(),
        )))
    }

    #[must_use]
    pub fn with_ocr(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(engine);
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: ReaderRouter) -> Self {
        self.router = router;
        self
    }

    /// Process one document held in memory.
    pub async fn run(&self, bytes: Vec<u8>) -> Result<PipelineOutput> {
        let started = Instant::now();

        let reader = self.router.select(&bytes)?;
        let mut extractor = LayoutExtractor::new(reader, self.extract.clone());
        if let Some(engine) = &self.ocr {
            extractor = extractor.with_ocr(Arc::clone(engine));
        }
        let extraction = extractor.extract(bytes).await?;

        let structured = self.structurer.structure(&extraction.raw_text).await;

        let fields = self
            .mapper
            .map(&structured.fields, &extraction.raw_text, &extraction.layout);

        let output = PipelineOutput {
            raw_text: extraction.raw_text,
            layout: extraction.layout,
            pages: extraction.pages,
            fields,
            chunks: structured.chunks,
            failed_chunks: structured.failed_chunks,
        };

        info!(
            "Pipeline finished in {:.2}s: {} pages, {} fields ({} located)",
            started.elapsed().as_secs_f64(),
            output.layout.pages.len(),
            output.fields.len(),
            output.located_fields()
        );
        Ok(output)
    }

    /// Read a file and process it.
    pub async fn run_file(&self, path: impl AsRef<Path>) -> Result<PipelineOutput> {
        let path = path.as_ref();
        info!("Processing {}", path.display());
        let bytes = tokio::fs::read(path).await.map_err(DocumentError::from)?;
        self.run(bytes).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::config::{MapperConfig, StructureConfig};
    use crate::error::{LlmError, PipelineError};
    use crate::structure::{LanguageModel, LlmRequest};

    struct CannedModel(&'static str);

    #[async_trait]
    impl LanguageModel for CannedModel {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, _request: &LlmRequest) -> std::result::Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    fn pipeline(model: Option<&'static str>) -> Pipeline {
        let structurer = match model {
            Some(reply) => FieldStructurer::new(Arc::new(CannedModel(reply)), StructureConfig::default()),
            None => FieldStructurer::disabled(StructureConfig::default()),
        };
        Pipeline::new(
            ExtractConfig::default(),
            structurer,
            CoordinateMapper::new(MapperConfig::default()),
        )
    }

    #[tokio::test]
    async fn runs_all_stages_on_plain_text() {
        let p = pipeline(Some(
            r#"{"fields":[{"label":"Total","value":"$500","snippet":"Total: $500"}]}"#,
        ));
        let output = p.run(b"Invoice 7\nTotal: $500\n".to_vec()).await.unwrap();

        assert_eq!(output.raw_text, "Invoice 7\nTotal: $500");
        assert_eq!(output.layout.characters.len(), output.raw_text.chars().count());
        assert_eq!(output.chunks, 1);
        assert_eq!(output.fields.len(), 1);
        assert_eq!(output.fields[0].rects.len(), 1);
        assert_eq!(output.located_fields(), 1);
    }

    #[tokio::test]
    async fn structuring_failure_still_returns_text() {
        let output = pipeline(Some("sorry")).run(b"hello".to_vec()).await.unwrap();
        assert_eq!(output.raw_text, "hello");
        assert!(output.fields.is_empty());
        assert_eq!(output.failed_chunks, 1);
    }

    #[tokio::test]
    async fn disabled_structurer_returns_text_only() {
        let output = pipeline(None).run(b"hello".to_vec()).await.unwrap();
        assert_eq!(output.raw_text, "hello");
        assert!(output.fields.is_empty());
    }

    #[tokio::test]
    async fn unreadable_document_is_the_only_fatal_error() {
        let err = pipeline(None).run(vec![0xff, 0x00, 0x13]).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Document(DocumentError::UnsupportedFormat(_))
        ));

        let err = pipeline(None).run(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Document(DocumentError::Empty)));
    }

    #[tokio::test]
    async fn missing_file_is_a_document_error() {
        let err = pipeline(None)
            .run_file("/nonexistent/fieldlens/input.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Document(DocumentError::Io(_))));
    }
}
