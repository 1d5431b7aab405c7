use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use fieldlens::extract::TesseractEngine;
use fieldlens::{Config, CoordinateMapper, FieldStructurer, Pipeline};

use super::output::{persist_artifacts, print_summary};
use crate::OutputFormat;

pub async fn cmd_extract(
    config: &Config,
    file: &Path,
    output_dir: Option<&Path>,
    format: OutputFormat,
    no_llm: bool,
) -> Result<()> {
    let pipeline = if no_llm {
        Pipeline::new(
            config.extract.clone(),
            FieldStructurer::disabled(config.structure.clone()),
            CoordinateMapper::new(config.mapper.clone()),
        )
        .with_ocr(Arc::new(TesseractEngine::new(
            config.extract.ocr_command.clone(),
            config.extract.ocr_language.clone(),
        )))
    } else {
        Pipeline::from_config(config)
    };

    let output = pipeline.run_file(file).await?;

    if let Some(dir) = output_dir {
        let artifacts = persist_artifacts(file, dir, &output)?;
        for path in &artifacts.paths() {
            eprintln!("💾 Saved {}", path.display());
        }
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputFormat::Summary => print_summary(file, &output),
    }

    Ok(())
}
