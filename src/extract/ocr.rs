//! OCR for pages without a text layer.
//!
//! [`OcrEngine`] is the seam; [`TesseractEngine`] drives the `tesseract` CLI
//! and parses its word-level TSV output. Boxes come back in raster pixels
//! and are divided by the raster scale to land in page coordinates.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use crate::error::OcrError;

/// A rendered page image, RGBA8, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRaster {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
    /// Raster pixels per page unit.
    pub scale: f32,
}

/// A recognized token with its box in page coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub text: String,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl OcrToken {
    /// Build a token from a pixel-space box.
    pub fn from_pixels(text: impl Into<String>, px: [f32; 4], scale: f32) -> Self {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        Self {
            text: text.into(),
            x0: px[0] / scale,
            y0: px[1] / scale,
            x1: px[2] / scale,
            y1: px[3] / scale,
        }
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).abs()
    }
}

/// Recognizes tokens on a rasterized page.
///
/// Implementations return tokens in reading order. Callers bound each call
/// with a timeout; long-running engines should be cancel-safe.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short lowercase engine name.
    fn name(&self) -> &'static str;

    async fn recognize(&self, raster: &PageRaster) -> Result<Vec<OcrToken>, OcrError>;
}

/// Runs `tesseract <image> stdout -l <lang> tsv`.
pub struct TesseractEngine {
    command: String,
    language: String,
    temp_dir: Option<PathBuf>,
}

impl TesseractEngine {
    pub fn new(command: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            language: language.into(),
            temp_dir: None,
        }
    }

    /// Directory for the intermediate page images. Defaults to the system temp dir.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Encode the raster to a PNG that is removed when the handle drops.
    async fn write_png(&self, raster: &PageRaster) -> Result<NamedTempFile, OcrError> {
        let (width, height) = (raster.width, raster.height);
        let rgba = raster.rgba.clone();
        let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);

        tokio::task::spawn_blocking(move || -> Result<NamedTempFile, OcrError> {
            let image = image::RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
                OcrError::Engine(format!("raster buffer does not match {width}x{height}"))
            })?;
            let file = tempfile::Builder::new()
                .prefix("fieldlens_ocr_")
                .suffix(".png")
                .tempfile_in(dir)?;
            image.save_with_format(file.path(), image::ImageFormat::Png)?;
            Ok(file)
        })
        .await
        .map_err(|e| OcrError::Engine(format!("PNG encode task failed: {e}")))?
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract", "eng")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    async fn recognize(&self, raster: &PageRaster) -> Result<Vec<OcrToken>, OcrError> {
        let image = self.write_png(raster).await?;

        let output = Command::new(&self.command)
            .arg(image.path())
            .args(["stdout", "-l", &self.language, "tsv"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;
        drop(image);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let tokens = parse_tsv(&tsv, raster.scale)?;
        debug!("tesseract recognized {} words", tokens.len());
        Ok(tokens)
    }
}

/// Parse tesseract TSV output into word tokens.
///
/// Columns: `level page_num block_num par_num line_num word_num left top
/// width height conf text`. Only level-5 (word) rows with text are kept.
pub fn parse_tsv(tsv: &str, scale: f32) -> Result<Vec<OcrToken>, OcrError> {
    let mut tokens = Vec::new();

    for (line_no, line) in tsv.lines().enumerate() {
        if line_no == 0 && line.starts_with("level") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 11 {
            return Err(OcrError::Parse(format!(
                "line {}: expected 12 columns, got {}",
                line_no + 1,
                cols.len()
            )));
        }

        if cols[0] != "5" {
            continue;
        }
        let text = cols.get(11).map_or("", |t| t.trim());
        if text.is_empty() {
            continue;
        }

        let num = |idx: usize| -> Result<f32, OcrError> {
            cols[idx].trim().parse::<f32>().map_err(|e| {
                OcrError::Parse(format!("line {}: column {idx}: {e}", line_no + 1))
            })
        };
        let (left, top, width, height) = (num(6)?, num(7)?, num(8)?, num(9)?);

        tokens.push(OcrToken::from_pixels(
            text,
            [left, top, left + width, top + height],
            scale,
        ));
    }

    Ok(tokens)
}
