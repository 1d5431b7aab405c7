use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fieldlens::structure::group_rows;
use fieldlens::PipelineOutput;

/// Files written by [`persist_artifacts`].
#[derive(Debug)]
pub struct Artifacts {
    pub raw_text: PathBuf,
    pub layout: PathBuf,
    pub extracted: PathBuf,
}

impl Artifacts {
    pub fn paths(&self) -> [&Path; 3] {
        [
            self.raw_text.as_path(),
            self.layout.as_path(),
            self.extracted.as_path(),
        ]
    }
}

/// Write `<stem>_<unix_ts>_{raw_text.txt,layout.json,extracted.json}` into `dir`.
pub fn persist_artifacts(input: &Path, dir: &Path, output: &PipelineOutput) -> Result<Artifacts> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let stem = input
        .file_stem()
        .map_or_else(|| "document".to_string(), |s| s.to_string_lossy().into_owned());
    let prefix = format!("{stem}_{}", chrono::Utc::now().timestamp());

    let artifacts = Artifacts {
        raw_text: dir.join(format!("{prefix}_raw_text.txt")),
        layout: dir.join(format!("{prefix}_layout.json")),
        extracted: dir.join(format!("{prefix}_extracted.json")),
    };

    fs::write(&artifacts.raw_text, &output.raw_text)?;
    fs::write(&artifacts.layout, serde_json::to_string(&output.layout)?)?;
    fs::write(
        &artifacts.extracted,
        serde_json::to_string_pretty(&output.fields)?,
    )?;

    Ok(artifacts)
}

pub fn print_summary(input: &Path, output: &PipelineOutput) {
    println!("📄 {}", input.display());
    println!(
        "   {} pages, {} characters",
        output.layout.pages.len(),
        output.layout.characters.len()
    );
    for page in &output.pages {
        println!(
            "   page {:>3}: {:>6} chars ({:?})",
            page.page + 1,
            page.characters,
            page.source
        );
    }

    if output.chunks > 0 {
        println!(
            "\n🧩 {} chunks ({} failed)",
            output.chunks, output.failed_chunks
        );
    }

    println!(
        "\n🔎 {} fields, {} located",
        output.fields.len(),
        output.located_fields()
    );
    for mapped in &output.fields {
        let location = match mapped.rects.first() {
            Some(rect) if mapped.rects.len() > 1 => {
                format!("page {} (+{} rects)", rect.page + 1, mapped.rects.len() - 1)
            }
            Some(rect) => format!("page {} @ ({:.0}, {:.0})", rect.page + 1, rect.x0, rect.y0),
            None => "not located".to_string(),
        };
        println!(
            "   {}: {}  [{location}]",
            mapped.field.label,
            truncate_text(&mapped.field.value, 60)
        );
    }

    let groups = group_rows(&output.fields);
    for (group, rows) in &groups {
        println!("\n📊 {group}: {} rows", rows.len());
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
