use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use fieldlens::{Config, CoordinateMapper, Field, Layout};

/// Fields may come from an `_extracted.json` artifact; existing rects are ignored.
pub fn cmd_map(config: &Config, text: &Path, layout: &Path, fields: &Path) -> Result<()> {
    let raw_text =
        fs::read_to_string(text).with_context(|| format!("reading {}", text.display()))?;
    let layout: Layout = serde_json::from_str(
        &fs::read_to_string(layout).with_context(|| format!("reading {}", layout.display()))?,
    )
    .context("parsing layout JSON")?;
    let fields: Vec<Field> = serde_json::from_str(
        &fs::read_to_string(fields).with_context(|| format!("reading {}", fields.display()))?,
    )
    .context("parsing fields JSON")?;

    let mapper = CoordinateMapper::new(config.mapper.clone());
    let mapped = mapper.map(&fields, &raw_text, &layout);

    println!("{}", serde_json::to_string_pretty(&mapped)?);
    Ok(())
}
