//! `fieldlens` - locate LLM-extracted document fields on the page
//!
//! # Stages
//!
//! - **Layout extraction**: per-character text and page coordinates, from the
//!   text layer or OCR for pages that have none
//! - **Field structuring**: chunked, concurrent language-model extraction of
//!   labeled fields with verbatim snippets, merged in chunk order
//! - **Coordinate mapping**: a fixed cascade of exact, case-insensitive,
//!   whitespace-normalized and fuzzy matches turns each field back into
//!   per-line page rectangles
//!
//! # Example
//!
//! ```rust,no_run
//! use fieldlens::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let output = Pipeline::from_config(&config).run_file("claim.pdf").await?;
//!     for field in &output.fields {
//!         println!("{} = {} ({} rects)", field.field.label, field.field.value, field.rects.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod layout;
pub mod mapper;
pub mod pipeline;
pub mod structure;

pub use config::Config;
pub use error::{DocumentError, LlmError, OcrError, PipelineError};
pub use extract::{DocumentReader, Extraction, LayoutExtractor, OcrEngine, ReaderRouter};
pub use layout::{Character, Field, Layout, MappedField, PageGeometry, Rect};
pub use mapper::CoordinateMapper;
pub use pipeline::{Pipeline, PipelineOutput};
pub use structure::{FieldStructurer, LanguageModel};

/// Version of fieldlens
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
