//! Configuration loaded from `~/.config/fieldlens/config.toml`.
//!
//! Every key is optional; a missing file yields [`Config::default`].
//!
//! ```toml
//! [extract]
//! raster_scale = 2.0
//! ocr_timeout_secs = 60
//!
//! [structure]
//! chunk_size = 25000
//! chunk_overlap = 500
//!
//! [llm]
//! endpoint = "https://api.groq.com/openai/v1/chat/completions"
//! model = "llama-3.1-8b-instant"
//! api_key_env = "GROQ_API_KEY"
//!
//! [mapper]
//! line_epsilon = 5.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Layout Extractor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Raster pixels per page unit when a page needs OCR.
    pub raster_scale: f32,
    pub ocr_timeout_secs: u64,
    /// A vertical jump larger than this fraction of the glyph height starts a new line.
    pub line_break_tolerance: f32,
    pub ocr_command: String,
    pub ocr_language: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            raster_scale: 2.0,
            ocr_timeout_secs: 60,
            line_break_tolerance: 0.5,
            ocr_command: "tesseract".to_string(),
            ocr_language: "eng".to_string(),
        }
    }
}

impl ExtractConfig {
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}

/// Field Structurer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Characters per chunk.
    pub chunk_size: usize,
    /// Characters shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Maximum in-flight chunk requests.
    pub concurrency: usize,
    pub request_timeout_secs: u64,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            chunk_size: 25_000,
            chunk_overlap: 500,
            concurrency: 4,
            request_timeout_secs: 90,
        }
    }
}

impl StructureConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Language-model backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            temperature: 0.0,
            api_key_env: "GROQ_API_KEY".to_string(),
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Coordinate Mapper settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Maximum `y0` drift (page units) for two characters to share a visual line.
    pub line_epsilon: f32,
    /// Minimum fraction of the needle a fuzzy match must cover.
    pub min_fuzzy_ratio: f32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            line_epsilon: 5.0,
            min_fuzzy_ratio: 0.6,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub extract: ExtractConfig,
    pub structure: StructureConfig,
    pub llm: LlmConfig,
    pub mapper: MapperConfig,
}

impl Config {
    /// Load from the default location, then apply environment overrides.
    ///
    /// Returns defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&config_path())?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("FIELDLENS_LLM_ENDPOINT") {
            self.llm.endpoint = endpoint;
        }
        if let Ok(model) = std::env::var("FIELDLENS_LLM_MODEL") {
            self.llm.model = model;
        }
    }

    /// Reject settings that would make chunking or matching ill-defined.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.structure.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be positive".into()));
        }
        if self.structure.chunk_overlap >= self.structure.chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.structure.chunk_overlap, self.structure.chunk_size
            )));
        }
        if !(0.0..=1.0).contains(&self.mapper.min_fuzzy_ratio) {
            return Err(ConfigError::Invalid(
                "min_fuzzy_ratio must be within 0.0..=1.0".into(),
            ));
        }
        if self.extract.raster_scale <= 0.0 {
            return Err(ConfigError::Invalid("raster_scale must be positive".into()));
        }
        Ok(())
    }
}

/// Return the path to the config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fieldlens")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.structure.chunk_size, 25_000);
        assert_eq!(config.structure.chunk_overlap, 500);
        assert_eq!(config.mapper.min_fuzzy_ratio, 0.6);
    }

    #[test]
    fn parse_partial_sections() {
        let toml_str = r#"
[structure]
chunk_size = 1000

[mapper]
line_epsilon = 2.5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.structure.chunk_size, 1000);
        assert_eq!(config.structure.chunk_overlap, 500);
        assert_eq!(config.mapper.line_epsilon, 2.5);
        assert_eq!(config.llm.model, "llama-3.1-8b-instant");
    }

    #[test]
    fn rejects_overlap_not_smaller_than_chunk() {
        let mut config = Config::default();
        config.structure.chunk_size = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_fuzzy_ratio() {
        let mut config = Config::default();
        config.mapper.min_fuzzy_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("fieldlens-{}.toml", uuid::Uuid::new_v4()));
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let path = std::env::temp_dir().join(format!("fieldlens-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[structure\nchunk_size = ").unwrap();
        let result = Config::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
