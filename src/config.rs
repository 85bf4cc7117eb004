use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_url")]
    pub url: String,
    #[serde(default = "default_collection")]
    pub collection: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            url: default_index_url(),
            collection: default_collection(),
        }
    }
}

fn default_index_url() -> String {
    "http://127.0.0.1:6333".to_string()
}
fn default_collection() -> String {
    "carrel_documents".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Must match the collection's vector size; a mismatch silently corrupts
    /// similarity search.
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dims: default_dims(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}
fn default_dims() -> usize {
    3072
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            temperature: default_temperature(),
            top_k: default_top_k(),
        }
    }
}

fn default_llm_model() -> String {
    "gpt-4o".to_string()
}
fn default_temperature() -> f64 {
    0.1
}
fn default_top_k() -> usize {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_overlap_chars")]
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            overlap_chars: default_overlap_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    4000
}
fn default_overlap_chars() -> usize {
    800
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Below this many chars of native PDF text, the pages are rasterized and OCRed.
    #[serde(default = "default_ocr_threshold")]
    pub pdf_ocr_threshold: usize,
    /// Minimum chars of readable text a web page must yield.
    #[serde(default = "default_min_web_chars")]
    pub min_web_chars: usize,
    /// Minimum chars the composed video blob (and any single caption track) must reach.
    #[serde(default = "default_min_video_chars")]
    pub min_video_chars: usize,
    /// Caption languages tried in order; the first usable track wins.
    #[serde(default = "default_caption_languages")]
    pub caption_languages: Vec<String>,
    /// Timeout for metadata and rasterization commands.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Timeout for the audio download.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            pdf_ocr_threshold: default_ocr_threshold(),
            min_web_chars: default_min_web_chars(),
            min_video_chars: default_min_video_chars(),
            caption_languages: default_caption_languages(),
            command_timeout_secs: default_command_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_ocr_threshold() -> usize {
    500
}
fn default_min_web_chars() -> usize {
    100
}
fn default_min_video_chars() -> usize {
    200
}
fn default_caption_languages() -> Vec<String> {
    ["en", "hi", "es", "fr", "de", "ja", "ko", "pt", "ru", "ar"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_command_timeout_secs() -> u64 {
    30
}
fn default_download_timeout_secs() -> u64 {
    300
}

impl Config {
    /// Load configuration from a TOML file. A missing file yields the
    /// defaults, so `carrel` runs without any config at all.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_configuration() {
        let config = Config::default();
        assert_eq!(config.embedding.dims, 3072);
        assert_eq!(config.chunking.max_chars, 4000);
        assert_eq!(config.chunking.overlap_chars, 800);
        assert_eq!(config.extract.pdf_ocr_threshold, 500);
        assert_eq!(config.llm.top_k, 15);
        assert_eq!(config.extract.caption_languages[0], "en");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [index]
            url = "http://qdrant.internal:6333"

            [chunking]
            max_chars = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.index.url, "http://qdrant.internal:6333");
        assert_eq!(config.index.collection, "carrel_documents");
        assert_eq!(config.chunking.max_chars, 1000);
        assert_eq!(config.chunking.overlap_chars, 800);
    }
}
